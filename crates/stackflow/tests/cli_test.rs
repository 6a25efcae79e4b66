#![allow(deprecated)] // TODO: switch Command::cargo_bin to cargo_bin_cmd!

mod common;

use assert_cmd::Command;
use common::{SAMPLE_SERVICE, TestProject};
use predicates::prelude::*;

fn stackflow(project: &TestProject) -> Command {
    let mut cmd = Command::cargo_bin("stackflow").unwrap();
    cmd.current_dir(project.path())
        .env_remove("STACKFLOW_STAGE")
        .env_remove("STACKFLOW_CONFIG_PATH");
    cmd
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("stackflow").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("package"))
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("remove"))
        .stdout(predicate::str::contains("info"))
        .stdout(predicate::str::contains("print"));
}

#[test]
fn test_print_help_lists_formats() {
    let mut cmd = Command::cargo_bin("stackflow").unwrap();
    cmd.args(["print", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--format"))
        .stdout(predicate::str::contains("--stage"));
}

#[test]
fn test_print_compiles_template() {
    let project = TestProject::with_service(SAMPLE_SERVICE);
    stackflow(&project)
        .arg("print")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"AWSTemplateFormatVersion\": \"2010-09-09\""))
        .stdout(predicate::str::contains("HelloLambdaFunction"))
        .stdout(predicate::str::contains("HelloEventsRuleSchedule1"))
        .stdout(predicate::str::contains(
            "ReportLogsSubscriptionFilterCloudWatchLog1",
        ))
        .stdout(predicate::str::contains("demo-dev-hello"));
}

#[test]
fn test_print_is_stable() {
    let project = TestProject::with_service(SAMPLE_SERVICE);
    let first = stackflow(&project).arg("print").output().unwrap();
    let second = stackflow(&project).arg("print").output().unwrap();
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn test_print_yaml() {
    let project = TestProject::with_service(SAMPLE_SERVICE);
    stackflow(&project)
        .args(["print", "--format", "yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("AWSTemplateFormatVersion: "))
        .stdout(predicate::str::contains("HelloLambdaFunction:"));
}

#[test]
fn test_stage_option_and_env() {
    let project = TestProject::with_service(SAMPLE_SERVICE);
    stackflow(&project)
        .args(["print", "--stage", "prod"])
        .assert()
        .success()
        .stdout(predicate::str::contains("demo-prod-hello"));

    stackflow(&project)
        .arg("print")
        .env("STACKFLOW_STAGE", "qa")
        .assert()
        .success()
        .stdout(predicate::str::contains("demo-qa-hello"));
}

#[test]
fn test_package_writes_artifacts() {
    let project = TestProject::with_service(SAMPLE_SERVICE);
    stackflow(&project)
        .arg("package")
        .assert()
        .success()
        .stdout(predicate::str::contains("Packaged"));

    let dir = project.path().join(".stackflow");
    assert!(dir.join("cloudformation-template-create-stack.json").exists());
    assert!(dir.join("cloudformation-template-update-stack.json").exists());
    assert!(dir.join("stackflow-state.json").exists());
}

#[test]
fn test_config_flag() {
    let project = TestProject::with_service(SAMPLE_SERVICE);
    let elsewhere = TestProject::new();
    stackflow(&elsewhere)
        .arg("print")
        .arg("--config")
        .arg(project.service_file())
        .assert()
        .success()
        .stdout(predicate::str::contains("HelloLambdaFunction"));
}

#[test]
fn test_invalid_schedule_fails() {
    let project = TestProject::with_service(
        r#"
service: demo
functions:
  hello:
    handler: handler.hello
    events:
      - schedule: every now and then
"#,
    );
    stackflow(&project)
        .arg("print")
        .assert()
        .failure()
        .stderr(predicate::str::contains("AwsCompileScheduledEvents"))
        .stderr(predicate::str::contains("not a valid rate or cron expression"));
}

#[test]
fn test_missing_service_file_fails() {
    let project = TestProject::new();
    stackflow(&project)
        .arg("print")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}
