//! Basic CLI E2E tests.
//!
//! Tests run the built binary with an isolated config directory and verify
//! outputs. Nothing here needs a running PAYG daemon.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(config_home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_payg-cli"))
        .args(args)
        .env("XDG_CONFIG_HOME", config_home)
        .env("HOME", config_home)
        .env_remove("PAYG_SHELL_ENV")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn write_config(config_home: &Path, content: &str) {
    let dir = config_home.join("payg-shell");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), content).unwrap();
}

#[test]
fn test_format() {
    let home = TempDir::new().unwrap();
    let cases = [
        ("0", "0 seconds"),
        ("59", "59 seconds"),
        ("60", "1 minute"),
        ("7199", "119 minutes"),
        ("8640", "2 hours 24 minutes"),
        ("86400", "1 day"),
        ("115200", "1 day 8 hours"),
    ];
    for (seconds, expected) in cases {
        let (stdout, _, code) = run_cli(home.path(), &["format", seconds]);
        assert_eq!(code, 0, "format {seconds} failed");
        assert_eq!(stdout.trim(), expected);
    }
}

#[test]
fn test_format_rejects_negative() {
    let home = TempDir::new().unwrap();
    let (_, _, code) = run_cli(home.path(), &["format", "-5"]);
    assert_ne!(code, 0);
}

#[test]
fn test_config_path() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "path"]);
    assert_eq!(code, 0);
    assert!(stdout.trim().ends_with("payg-shell/config.toml"));
    assert!(stdout.trim().starts_with(&*home.path().to_string_lossy()));
}

#[test]
fn test_config_defaults() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "unlock.code_length"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "8");

    let (stdout, _, code) = run_cli(home.path(), &["config", "show"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["reminders"]["thresholds_secs"][0], 172_800);
    assert_eq!(parsed["clock"]["poll_interval_secs"], 60);
}

#[test]
fn test_config_file_is_read() {
    let home = TempDir::new().unwrap();
    write_config(
        home.path(),
        "[reminders]\nthresholds_secs = [3600, 60]\n",
    );
    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "reminders.thresholds_secs"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "[3600,60]");
}

#[test]
fn test_config_unknown_key() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["config", "get", "unlock.nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_invalid_config_is_an_error() {
    let home = TempDir::new().unwrap();
    write_config(home.path(), "[reminders]\nthresholds_secs = [60, 3600]\n");
    let (_, stderr, code) = run_cli(home.path(), &["config", "show"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
    assert!(stderr.contains("reminders.thresholds_secs"));
}

#[test]
fn test_status_json_without_daemon() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["status", "--json"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(parsed.get("enabled").is_some());
    assert!(parsed.get("timeRemainingSecs").is_some());
}
