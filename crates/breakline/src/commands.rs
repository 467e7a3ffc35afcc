//! Command implementations.
//!
//! Every command writes its primary output to `out` and diagnostics to
//! `err`, so the binary and the tests drive them the same way.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use breakline_core::Document;
use breakline_engine::{EngineContext, RuleEngine, RunOutcome, RunReport, RunSource};
use breakline_settings::loader::parse_bool;
use breakline_settings::{
    BreaklineSettings, ClassifierStrategy, JsonFilePolicyStore, PolicyField, PolicySet,
    PolicyStore, load_or_default, load_settings, load_settings_from_path, policy_file_path,
    settings_path,
};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::cli::{ApplyArgs, Cli, Command, PolicyCommand};

/// Run the parsed command line.
pub fn execute(cli: &Cli, out: &mut dyn Write, err: &mut dyn Write) -> Result<()> {
    let settings = load_config(cli)?;
    match &cli.command {
        Command::Apply(args) => apply(&settings, args, out, err),
        Command::Policy(command) => policy(&settings, command, out),
    }
}

/// Engine configuration with the command-line overrides applied.
pub fn load_config(cli: &Cli) -> Result<BreaklineSettings> {
    let mut settings = match &cli.settings {
        Some(path) => load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => load_settings().with_context(|| {
            format!("Failed to load settings from {}", settings_path().display())
        })?,
    };
    if let Some(file) = &cli.policy_file {
        settings.storage.policy_file = Some(file.display().to_string());
    }
    Ok(settings)
}

/// Store for the policy kept in the host settings file.
pub fn policy_store(settings: &BreaklineSettings) -> JsonFilePolicyStore {
    JsonFilePolicyStore::new(policy_file_path(settings), settings.storage.policy_key.clone())
}

/// Apply the policy to `html` once, returning the serialized result.
pub fn apply_to_html(
    html: &str,
    settings: BreaklineSettings,
    policy: PolicySet,
) -> Result<(String, RunReport)> {
    let document = Arc::new(Mutex::new(Document::from_html(html)));
    let ctx = EngineContext::new(Arc::clone(&document), settings, policy)
        .context("Invalid engine configuration")?;
    let engine = RuleEngine::new(Arc::new(ctx));

    let report = match engine.run(RunSource::Cli, None) {
        RunOutcome::Completed(report) => report,
        RunOutcome::Skipped => bail!("application run was skipped"),
    };
    let doc = document.lock();
    Ok((doc.inner_html(doc.root()), report))
}

fn apply(
    settings: &BreaklineSettings,
    args: &ApplyArgs,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<()> {
    let html = read_input(&args.input)?;

    let mut policy = if args.no_stored {
        PolicySet::default()
    } else {
        load_or_default(&policy_store(settings))
    };
    args.switches.apply_to(&mut policy);
    debug!(?policy, "effective policy");

    let (result, report) = apply_to_html(&html, settings.clone(), policy)?;
    info!(
        hidden = report.markers_hidden,
        kept = report.markers_kept,
        scopes = report.scopes_processed,
        "applied"
    );

    match &args.output {
        Some(path) => std::fs::write(path, &result)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => out.write_all(result.as_bytes())?,
    }
    if args.report {
        writeln!(err, "{}", serde_json::to_string_pretty(&report)?)?;
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut html = String::new();
        let _ = std::io::stdin()
            .read_to_string(&mut html)
            .context("Failed to read stdin")?;
        return Ok(html);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn policy(settings: &BreaklineSettings, command: &PolicyCommand, out: &mut dyn Write) -> Result<()> {
    let store = policy_store(settings);
    let policy = match command {
        PolicyCommand::Show => load(&store)?,
        PolicyCommand::Set { key, value } => {
            let mut policy = load(&store)?;
            set_value(&mut policy, key, value)?;
            save(&store, &policy)?;
            info!(key = %key, value = %value, "policy updated");
            policy
        }
        PolicyCommand::Reset => {
            let policy = PolicySet::default();
            save(&store, &policy)?;
            info!("policy reset");
            policy
        }
    };
    writeln!(out, "{}", serde_json::to_string_pretty(&policy)?)?;
    Ok(())
}

/// Parse `key`/`value` into a change of `policy`.
pub fn set_value(policy: &mut PolicySet, key: &str, value: &str) -> Result<()> {
    if key == "strategy" {
        policy.strategy = value
            .parse::<ClassifierStrategy>()
            .with_context(|| format!("Unknown strategy '{value}'"))?;
        return Ok(());
    }
    let field: PolicyField = key
        .parse()
        .with_context(|| format!("Unknown policy key '{key}'"))?;
    let Some(enabled) = parse_bool(value) else {
        bail!("Expected a boolean for '{key}', got '{value}'");
    };
    policy.set(field, enabled);
    Ok(())
}

fn load(store: &JsonFilePolicyStore) -> Result<PolicySet> {
    store
        .load()
        .with_context(|| format!("Failed to read policy from {}", store.path().display()))
}

fn save(store: &JsonFilePolicyStore, policy: &PolicySet) -> Result<()> {
    store
        .save(policy)
        .with_context(|| format!("Failed to write policy to {}", store.path().display()))
}
