//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary HOME, so the
//! config file it creates never touches the real one.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(home: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_inkboard"))
        .args(args)
        .env("HOME", home)
        .env_remove("INKBOARD_ENV")
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

#[test]
fn test_config_path_is_under_home() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "path"]);
    assert_eq!(code, 0);
    assert!(stdout.trim().ends_with(".config/inkboard/config.toml"));
}

#[test]
fn test_config_get_default() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "get", "intervals.refresh_secs"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "300");
}

#[test]
fn test_config_set_then_get() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "set", "google.calendar_id", "family"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let (_, stdout, _) = run_cli(home.path(), &["config", "get", "google.calendar_id"]);
    assert_eq!(stdout.trim(), "family");
}

#[test]
fn test_config_set_rejects_zero_interval() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["config", "set", "intervals.notify_lead_secs", "0"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));

    let (_, stdout, _) = run_cli(home.path(), &["config", "get", "intervals.notify_lead_secs"]);
    assert_eq!(stdout.trim(), "600");
}

#[test]
fn test_config_get_unknown_key_fails() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["config", "get", "no.such.key"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_config_list_and_reset() {
    let home = tempfile::tempdir().unwrap();
    run_cli(home.path(), &["config", "set", "mock", "true"]);

    let (code, stdout, _) = run_cli(home.path(), &["config", "list"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["mock"], true);

    let (code, _, _) = run_cli(home.path(), &["config", "reset"]);
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(home.path(), &["config", "get", "mock"]);
    assert_eq!(stdout.trim(), "false");
}

#[test]
fn test_preview_mock_prints_all_screens() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, stderr) = run_cli(home.path(), &["preview", "--mock"]);
    assert_eq!(code, 0, "preview failed: {stderr}");
    for title in ["TODAY'S EVENTS", "TOMORROW'S EVENTS", "TASKS", "ENVIRONMENT"] {
        assert!(stdout.contains(title), "missing {title} in {stdout}");
    }
    assert!(stdout.contains("Morning standup"));
    assert!(stdout.contains("°C"));
}

#[test]
fn test_preview_mock_json() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["preview", "--mock", "--json"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let screens: Vec<&str> = parsed
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["screen"].as_str().unwrap())
        .collect();
    assert_eq!(
        screens,
        vec!["events_today", "events_tomorrow", "tasks", "sensor_reading"]
    );
    assert_eq!(parsed[3]["body"]["kind"], "sensor");
    assert_eq!(parsed[3]["body"]["sample"]["state"], "reading");
}

#[test]
fn test_preview_without_mock_requires_hardware_config() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["preview"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("hardware."));
}
