//! CLI integration tests

use std::process::{Command, Output};

fn mctl(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "mctl", "--"])
        .args(args)
        .env_remove("MCTL_API_URL")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = mctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Marionette control panel"),
        "Should show app name"
    );
    for command in ["services", "show", "set", "reset", "discover", "metrics", "watch"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = mctl(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("mctl"), "Should show binary name");
}

/// Test services subcommand help
#[test]
fn test_services_help() {
    let output = mctl(&["services", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Services help should succeed");
    assert!(stdout.contains("--refresh"), "Should show refresh option");
}

/// Test set subcommand help
#[test]
fn test_set_help() {
    let output = mctl(&["set", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Set help should succeed");
    for argument in ["<SERVICE>", "<CLASS>", "<METHOD>", "<BEHAVIOR>"] {
        assert!(stdout.contains(argument), "Should show {} argument", argument);
    }
}

/// Test discover subcommand help
#[test]
fn test_discover_help() {
    let output = mctl(&["discover", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Discover help should succeed");
    assert!(stdout.contains("--full"), "Should show full option");
}

/// Test metrics subcommand help
#[test]
fn test_metrics_help() {
    let output = mctl(&["metrics", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Metrics help should succeed");
    assert!(stdout.contains("--minutes"), "Should show minutes option");
    assert!(stdout.contains("--method"), "Should show method option");
}

/// Test watch subcommand help
#[test]
fn test_watch_help() {
    let output = mctl(&["watch", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Watch help should succeed");
    assert!(stdout.contains("--minutes"), "Should show minutes option");
}

/// Test global options
#[test]
fn test_global_options() {
    let output = mctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("table"), "Should show table format");
    assert!(stdout.contains("json"), "Should show json format");
    assert!(stdout.contains("--api-url"), "Should show api-url option");
    assert!(stdout.contains("MCTL_API_URL"), "Should show env var");
    assert!(stdout.contains("--origin"), "Should show origin option");
    assert!(stdout.contains("--log-json"), "Should show log-json option");
}

/// Test invalid command error handling
#[test]
fn test_invalid_command() {
    let output = mctl(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error") || stderr.contains("invalid"),
        "Should show error message"
    );
}

/// Test missing required argument error handling
#[test]
fn test_missing_argument() {
    let output = mctl(&["set", "orders"]);
    assert!(!output.status.success(), "Missing argument should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("required") || stderr.contains("error"),
        "Should show error about missing argument"
    );
}

/// Test that a malformed endpoint is rejected before any request
#[test]
fn test_invalid_api_url() {
    let output = mctl(&["--api-url", "not a url", "services"]);
    assert!(!output.status.success(), "Invalid endpoint should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Failed to resolve backend endpoint"),
        "Should name the failing step"
    );
}

/// Test that a zero minute window is refused locally
#[test]
fn test_zero_minutes_rejected() {
    let output = mctl(&["--api-url", "http://127.0.0.1:9/api", "metrics", "orders", "--minutes", "0"]);
    assert!(!output.status.success(), "Zero minutes should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("minutes must be a positive integer"),
        "Should explain the invalid window"
    );
}
