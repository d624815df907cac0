//! CLI integration tests
//!
//! Only paths that stop before any store connection are exercised here:
//! argument parsing, configuration validation and exit codes.

use std::process::{Command, Output};

const CONFIG_VARS: [&str; 9] = [
    "POSTGRES_HOST",
    "POSTGRES_PORT",
    "MONGODB_URI",
    "FOODSYNC_PRODUCERS",
    "FOODSYNC_FALLBACK_CHUNK",
    "FOODSYNC_SEASONAL_FAILURE",
    "FOODSYNC_MONGO_TIMEOUT_MS",
    "FOODSYNC_LOG_LEVEL",
    "FOODSYNC_LOG_JSON",
];

fn foodsync(args: &[&str], env: &[(&str, &str)]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_foodsync"));
    for key in CONFIG_VARS {
        command.env_remove(key);
    }
    command
        .args(args)
        .envs(env.iter().copied())
        .output()
        .expect("Failed to execute foodsync")
}

#[test]
fn test_cli_help() {
    let output = foodsync(&["--help"], &[]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("foodsync"));
    assert!(stdout.contains("run"));
    assert!(stdout.contains("plan"));
    assert!(stdout.contains("reindex"));
}

#[test]
fn test_cli_version() {
    let output = foodsync(&["--version"], &[]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_run_help_lists_flags() {
    let output = foodsync(&["run", "--help"], &[]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--format"));
    assert!(stdout.contains("--producers"));
    assert!(stdout.contains("--seasonal-failure"));
}

#[test]
fn test_unknown_subcommand_is_rejected() {
    let output = foodsync(&["migrate"], &[]);

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_invalid_format_is_rejected() {
    let output = foodsync(&["plan", "--format", "xml"], &[]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("xml"));
}

#[test]
fn test_run_rejects_zero_fallback_chunk() {
    let output = foodsync(&["run"], &[("FOODSYNC_FALLBACK_CHUNK", "0")]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_plan_rejects_invalid_mongo_uri() {
    let output = foodsync(&["plan"], &[("MONGODB_URI", "localhost:27017")]);

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_reindex_rejects_unparseable_port() {
    let output = foodsync(&["reindex"], &[("POSTGRES_PORT", "five-four-three-two")]);

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_run_rejects_unknown_seasonal_policy() {
    let output = foodsync(&["run", "--seasonal-failure", "bogus"], &[]);

    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("bogus"));
    assert!(stderr.contains("abort"));
}

#[test]
fn test_run_rejects_unknown_seasonal_policy_from_env() {
    let output = foodsync(&["run"], &[("FOODSYNC_SEASONAL_FAILURE", "retry")]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}
