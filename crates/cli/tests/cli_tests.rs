//! CLI integration tests

use std::process::{Command, Output};

fn advisor(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_advisor"))
        .args(args)
        .env_remove("ADVISOR_API_URL")
        .env_remove("ADVISOR_DATA_PATH")
        .env_remove("ADVISOR_MODELS_DIR")
        .output()
        .expect("Failed to execute command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = advisor(&["--help"]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Property Investment Advisor"),
        "Should show app name"
    );
    for command in ["train", "evaluate", "insights", "models", "health"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = advisor(&["--version"]);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(
        stdout(&output).contains("advisor"),
        "Should show binary name"
    );
}

#[test]
fn test_train_help() {
    let output = advisor(&["train", "--help"]);
    let stdout = stdout(&output);

    assert!(output.status.success());
    assert!(stdout.contains("classifier"));
    assert!(stdout.contains("regressor"));
    assert!(stdout.contains("all"));
}

#[test]
fn test_train_classifier_help() {
    let output = advisor(&["train", "classifier", "--help"]);
    let stdout = stdout(&output);

    assert!(output.status.success());
    for flag in [
        "--data",
        "--models-dir",
        "--tracking-dir",
        "--seed",
        "--test-size",
        "--n-estimators",
    ] {
        assert!(stdout.contains(flag), "Should show {} option", flag);
    }
    assert!(stdout.contains("ADVISOR_DATA_PATH"), "Should show env var");
}

#[test]
fn test_evaluate_help() {
    let output = advisor(&["evaluate", "--help"]);
    let stdout = stdout(&output);

    assert!(output.status.success());
    for flag in ["--city", "--property-type", "--size-sqft", "--price", "--local"] {
        assert!(stdout.contains(flag), "Should show {} option", flag);
    }
}

#[test]
fn test_insights_show_help() {
    let output = advisor(&["insights", "show", "--help"]);
    let stdout = stdout(&output);

    assert!(output.status.success());
    for flag in ["--city", "--bhk", "--min-price", "--max-age", "--good-only"] {
        assert!(stdout.contains(flag), "Should show {} option", flag);
    }
}

/// Test format option
#[test]
fn test_format_option() {
    let stdout = stdout(&advisor(&["--help"]));

    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("table"), "Should show table format");
    assert!(stdout.contains("json"), "Should show json format");
}

/// Test api-url option
#[test]
fn test_api_url_option() {
    let stdout = stdout(&advisor(&["--help"]));

    assert!(stdout.contains("--api-url"), "Should show api-url option");
    assert!(stdout.contains("ADVISOR_API_URL"), "Should show env var");
}

#[test]
fn test_unknown_property_type_is_rejected() {
    let output = advisor(&["evaluate", "--property-type", "castle"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("unknown property type"));
}

#[test]
fn test_local_evaluate_without_models_names_training_command() {
    let dir = tempfile::tempdir().unwrap();
    let models_dir = dir.path().to_string_lossy().into_owned();
    let output = advisor(&["evaluate", "--local", "--models-dir", &models_dir]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("advisor train classifier"));
}

#[test]
fn test_train_without_dataset_fails() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("missing.csv");
    let data = data.to_string_lossy().into_owned();
    let output = advisor(&["--format", "json", "train", "all", "--data", &data]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("processed dataset not found"));
}

#[test]
fn test_local_commands_ignore_malformed_api_url() {
    let dir = tempfile::tempdir().unwrap();
    let models_dir = dir.path().to_string_lossy().into_owned();
    let output = advisor(&[
        "--api-url",
        "not a url",
        "evaluate",
        "--local",
        "--models-dir",
        &models_dir,
    ]);

    let stderr = stderr(&output);
    assert!(!output.status.success());
    assert!(!stderr.contains("Invalid API URL"));
    assert!(stderr.contains("advisor train classifier"));

    let data = dir.path().join("missing.csv");
    let data = data.to_string_lossy().into_owned();
    let output = advisor(&["--api-url", "not a url", "train", "all", "--data", &data]);

    let stderr = self::stderr(&output);
    assert!(!stderr.contains("Invalid API URL"));
    assert!(stderr.contains("processed dataset not found"));
}

#[test]
fn test_remote_commands_reject_malformed_api_url() {
    let output = advisor(&["--api-url", "not a url", "models"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Invalid API URL"));
}

/// Test invalid command error handling
#[test]
fn test_invalid_command() {
    let output = advisor(&["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");
    let stderr = stderr(&output);
    assert!(
        stderr.contains("error") || stderr.contains("invalid"),
        "Should show error message"
    );
}
