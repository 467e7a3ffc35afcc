//! Argument definitions.

use std::path::PathBuf;

use breakline_core::logging::LogFormat;
use breakline_settings::{ClassifierStrategy, PolicySet};
use clap::{ArgAction, Args, Parser, Subcommand};

/// Hide redundant line breaks in chat message HTML.
#[derive(Parser, Debug)]
#[command(name = "breakline", version, about = "Hide redundant line breaks in chat message HTML")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format on stderr (`compact` or `json`).
    #[arg(long, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,

    /// Engine configuration file (defaults to `~/.breakline/settings.json`).
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Host settings file holding the stored policy (overrides configuration).
    #[arg(long, global = true)]
    pub policy_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply the policy to an HTML fragment and print the result.
    Apply(ApplyArgs),

    /// Inspect or edit the stored policy.
    #[command(subcommand)]
    Policy(PolicyCommand),
}

/// Arguments of `breakline apply`.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// HTML file to process; `-` reads stdin.
    pub input: PathBuf,

    /// Write the result here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Ignore the stored policy and start from defaults.
    #[arg(long)]
    pub no_stored: bool,

    #[command(flatten)]
    pub switches: PolicySwitches,

    /// Print the run report as JSON on stderr.
    #[arg(long)]
    pub report: bool,
}

/// Switches layered over the starting policy. A flag can only turn a
/// switch on; use `policy set` to turn a stored switch off.
#[derive(Args, Debug, Default)]
pub struct PolicySwitches {
    /// Hide every marker in the document.
    #[arg(long)]
    pub hide_all_global: bool,

    /// Hide every marker inside message scopes.
    #[arg(long)]
    pub hide_all_in_scope: bool,

    /// Hide markers before the first text of a scope.
    #[arg(long)]
    pub hide_leading: bool,

    /// Collapse runs of markers into one.
    #[arg(long)]
    pub merge_consecutive: bool,

    /// Hide markers not wrapped by a block element.
    #[arg(long)]
    pub smart_external: bool,

    /// Classifier strategy (`layered` or `textNeighbors`).
    #[arg(long)]
    pub strategy: Option<ClassifierStrategy>,
}

impl PolicySwitches {
    /// Layer these flags over `policy`.
    pub fn apply_to(&self, policy: &mut PolicySet) {
        policy.hide_all_global |= self.hide_all_global;
        policy.hide_all_in_scope |= self.hide_all_in_scope;
        policy.hide_leading |= self.hide_leading;
        policy.merge_consecutive |= self.merge_consecutive;
        policy.smart_external |= self.smart_external;
        if let Some(strategy) = self.strategy {
            policy.strategy = strategy;
        }
    }
}

/// `breakline policy` subcommands.
#[derive(Subcommand, Debug)]
pub enum PolicyCommand {
    /// Print the stored policy as JSON.
    Show,

    /// Change one stored switch, or the strategy.
    Set {
        /// Switch key (`hideLeading`, `hide-leading`, ...) or `strategy`.
        key: String,
        /// `true`/`false` (also `on`/`off`, `yes`/`no`, `1`/`0`), or a strategy name.
        value: String,
    },

    /// Restore the default policy.
    Reset,
}
