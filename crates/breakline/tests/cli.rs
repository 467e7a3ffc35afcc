#![allow(missing_docs, unused_results)]
//! Command round-trips against a temporary host settings file.

use std::path::{Path, PathBuf};

use breakline::{Cli, execute};
use clap::Parser;
use serde_json::{Value, json};
use tempfile::TempDir;

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn host_file(&self) -> PathBuf {
        self.path("extension_settings.json")
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Run a command with the sandbox's settings and policy file.
    fn run(&self, args: &[&str]) -> anyhow::Result<(String, String)> {
        let settings = self.path("settings.json");
        let host = self.host_file();
        let mut argv = vec![
            "breakline".to_string(),
            "--settings".to_string(),
            settings.display().to_string(),
            "--policy-file".to_string(),
            host.display().to_string(),
        ];
        argv.extend(args.iter().map(ToString::to_string));
        let cli = Cli::try_parse_from(argv)?;

        let mut out = Vec::new();
        let mut err = Vec::new();
        execute(&cli, &mut out, &mut err)?;
        Ok((String::from_utf8(out)?, String::from_utf8(err)?))
    }

    fn host_json(&self) -> Value {
        read_json(&self.host_file())
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

const MESSAGE: &str = r#"<div class="mes_text"><br>Hello<br><br><br>world</div>"#;

#[test]
fn apply_with_flags_hides_markers() {
    let sandbox = Sandbox::new();
    let input = sandbox.write("in.html", MESSAGE);

    let (out, err) = sandbox
        .run(&[
            "apply",
            input.to_str().unwrap(),
            "--hide-leading",
            "--merge-consecutive",
        ])
        .unwrap();

    assert_eq!(out.matches("display: none").count(), 3);
    assert!(out.contains(r#"data-br-rule="leading""#));
    assert!(out.contains(r#"data-br-rule="kept""#));
    assert!(err.is_empty());
    assert!(!sandbox.host_file().exists(), "apply must not persist");
}

#[test]
fn apply_uses_stored_policy_unless_told_not_to() {
    let sandbox = Sandbox::new();
    let input = sandbox.write("in.html", MESSAGE);
    sandbox.write(
        "extension_settings.json",
        r#"{"breakline": {"hideAllInScope": true}}"#,
    );

    let (out, _) = sandbox.run(&["apply", input.to_str().unwrap()]).unwrap();
    assert_eq!(out.matches("display: none").count(), 4);

    let (out, _) = sandbox
        .run(&["apply", input.to_str().unwrap(), "--no-stored"])
        .unwrap();
    assert!(!out.contains("display: none"));
}

#[test]
fn apply_writes_output_file_and_report() {
    let sandbox = Sandbox::new();
    let input = sandbox.write("in.html", MESSAGE);
    let output = sandbox.path("out.html");

    let (out, err) = sandbox
        .run(&[
            "apply",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--strategy",
            "textNeighbors",
            "--report",
        ])
        .unwrap();

    assert!(out.is_empty());
    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(written.matches("display: none").count(), 3);

    let report: Value = serde_json::from_str(&err).unwrap();
    assert_eq!(report["source"], "cli");
    assert_eq!(report["markersHidden"], 3);
    assert_eq!(report["scopesProcessed"], 1);
}

#[test]
fn apply_reports_missing_input() {
    let sandbox = Sandbox::new();
    let missing = sandbox.path("missing.html");
    let error = sandbox
        .run(&["apply", missing.to_str().unwrap()])
        .unwrap_err();
    assert!(format!("{error:#}").contains("missing.html"));
}

#[test]
fn policy_set_show_and_reset() {
    let sandbox = Sandbox::new();
    sandbox.write(
        "extension_settings.json",
        r#"{"theme": "dark", "breakline": {"hideChatBr": true}}"#,
    );

    let (out, _) = sandbox.run(&["policy", "show"]).unwrap();
    let shown: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(shown["hideAllInScope"], true);

    sandbox
        .run(&["policy", "set", "merge-consecutive", "on"])
        .unwrap();
    sandbox
        .run(&["policy", "set", "strategy", "text-neighbors"])
        .unwrap();

    let host = sandbox.host_json();
    assert_eq!(host["theme"], "dark");
    assert_eq!(host["breakline"]["mergeConsecutive"], true);
    assert_eq!(host["breakline"]["hideAllInScope"], true);
    assert_eq!(host["breakline"]["strategy"], "textNeighbors");
    assert!(host["breakline"].get("hideChatBr").is_none());

    let (out, _) = sandbox.run(&["policy", "reset"]).unwrap();
    let reset: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(reset["mergeConsecutive"], false);
    assert_eq!(sandbox.host_json()["theme"], json!("dark"));
}

#[test]
fn policy_set_rejects_unknown_key_without_writing() {
    let sandbox = Sandbox::new();
    let error = sandbox
        .run(&["policy", "set", "hideEverything", "true"])
        .unwrap_err();
    assert!(error.to_string().contains("hideEverything"));
    assert!(!sandbox.host_file().exists());
}

#[test]
fn corrupt_host_file_is_an_error_for_policy_commands() {
    let sandbox = Sandbox::new();
    sandbox.write("extension_settings.json", "[1, 2, 3]");
    let error = sandbox.run(&["policy", "show"]).unwrap_err();
    assert!(format!("{error:#}").contains("not a JSON object"));
}

#[test]
fn settings_file_can_change_scope_selectors() {
    let sandbox = Sandbox::new();
    sandbox.write(
        "settings.json",
        r#"{"document": {"scopeSelectors": ["article"]}}"#,
    );
    let input = sandbox.write(
        "in.html",
        r#"<article><br>A</article><div class="mes_text"><br>B</div>"#,
    );

    let (out, _) = sandbox
        .run(&["apply", input.to_str().unwrap(), "--hide-leading"])
        .unwrap();
    assert_eq!(out.matches("display: none").count(), 1);
    assert!(out.starts_with(r#"<article><br data-br-original-display"#));
}
