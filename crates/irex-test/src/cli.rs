//! CLI regression tests for the `irex` binary.
//!
//! These tests invoke the binary as a subprocess to catch regressions in
//! flag names, exit codes and output formats.
//!
//! Run with: `cargo test -p irex-test`
//! Requires the `irex` binary to be built first (`cargo build -p irex`).

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Returns an assert_cmd Command wrapping the `irex` binary.
fn irex() -> Command {
    // cargo_bin is deprecated for custom build-dir setups; fine for standard workspace use.
    #[allow(deprecated)]
    Command::cargo_bin("irex").expect("irex binary not found, run `cargo build -p irex` first")
}

/// Absolute path to the shared test fixtures directory.
fn fixtures() -> PathBuf {
    // CARGO_MANIFEST_DIR = .../crates/irex-test
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("crates/")
        .parent()
        .expect("workspace root")
        .join("tests/fixtures")
}

fn config(fixture: &str) -> PathBuf {
    fixtures().join(fixture).join("irex.yaml")
}

// ---------------------------------------------------------------------------
// irex validate
// ---------------------------------------------------------------------------

#[test]
fn validate_valid_project_exits_zero() {
    irex()
        .arg("validate")
        .arg(config("valid"))
        .assert()
        .success()
        .stderr(contains("is valid"));
}

#[test]
fn validate_missing_config_exits_one() {
    irex()
        .args(["validate", "this-file-does-not-exist.yaml"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("We couldn't find the file at"));
}

#[test]
fn validate_unknown_model_reports_source_and_message() {
    irex()
        .arg("validate")
        .arg(config("missing-model"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("[error]"))
        .stderr(contains("main.yaml"))
        .stderr(contains("Post"));
}

#[test]
fn validate_zero_field_model_halts_before_semantics() {
    irex()
        .arg("validate")
        .arg(config("zero-field-model"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("Model 'User' must have at least one field."))
        .stderr(contains("Post").not());
}

#[test]
fn validate_syntax_error_exits_one() {
    irex()
        .arg("validate")
        .arg(config("syntax-error"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("[error]"));
}

#[test]
fn validate_json_format() {
    let output = irex()
        .arg("validate")
        .arg(config("missing-model"))
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["valid"], false);
    let codes: Vec<&str> = report["diagnostics"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|d| d["code"].as_str())
        .collect();
    assert!(codes.contains(&"service.model.not_found"));
    assert!(codes.contains(&"service.apply.rate_limit.not_found"));
    assert!(report["summary"]["errors"].as_u64().unwrap() >= 2);
}

#[test]
fn validate_rejects_unknown_format() {
    irex()
        .arg("validate")
        .arg(config("valid"))
        .args(["--format", "xml"])
        .assert()
        .failure()
        .code(2);
}

// ---------------------------------------------------------------------------
// irex build
// ---------------------------------------------------------------------------

#[test]
fn build_prints_ir_to_stdout() {
    let output = irex().arg("build").arg(config("valid")).output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let ir: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(ir["http"]["basePath"], "/api");
    let routes = ir["routes"].as_object().unwrap();
    assert!(routes.contains_key(":GET:health"));
    assert!(routes.contains_key("accounts:GET:accounts.read"));
    assert!(routes.contains_key("orders:DELETE:orders.delete"));
    assert!(!routes.contains_key("accounts:DELETE:accounts.delete"));
}

#[test]
fn build_writes_output_file() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("ir.json");

    irex()
        .arg("build")
        .arg(config("valid"))
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stderr(contains("compiled"));

    let ir: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(ir["config"]["project"]["name"], "shop");
    assert!(ir["models"].as_object().unwrap().contains_key("Order"));
}

#[test]
fn build_with_errors_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("ir.json");

    irex()
        .arg("build")
        .arg(config("missing-model"))
        .arg("-o")
        .arg(&out)
        .assert()
        .failure()
        .code(1)
        .stderr(contains("build failed"));

    assert!(!out.exists());
}

// ---------------------------------------------------------------------------
// irex inspect
// ---------------------------------------------------------------------------

#[test]
fn inspect_infers_kind_from_directory() {
    let output = irex()
        .arg("inspect")
        .arg(fixtures().join("valid/spec/schema/account.yaml"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let inspection: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(inspection["kind"], "schema");
    assert_eq!(inspection["tree"]["models"][0]["name"], "Account");
    assert_eq!(inspection["diagnostics"].as_array().unwrap().len(), 0);
}

#[test]
fn inspect_unknown_kind_needs_flag() {
    irex()
        .arg("inspect")
        .arg(fixtures().join("misc/notes.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("--kind"));
}

#[test]
fn inspect_with_explicit_kind_reports_unknown_keys() {
    irex()
        .arg("inspect")
        .arg(fixtures().join("misc/notes.yaml"))
        .args(["--kind", "schema"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("[error]"));
}

#[test]
fn inspect_missing_file_exits_one() {
    irex()
        .args(["inspect", "no-such-dir/schema/missing.yaml"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("failed to read"));
}

// ---------------------------------------------------------------------------
// Global flags
// ---------------------------------------------------------------------------

#[test]
fn json_logs_do_not_pollute_stdout() {
    let output = irex()
        .args(["--log-level", "debug", "--log-format", "json", "build"])
        .arg(config("valid"))
        .output()
        .unwrap();
    assert!(output.status.success());
    let ir: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(ir["routes"].is_object());
}

#[test]
fn version_flag() {
    irex().arg("--version").assert().success().stdout(contains("irex"));
}
