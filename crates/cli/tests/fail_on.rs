use assert_cmd::prelude::*;
use predicates::str::contains;
use std::process::Command;

mod common;

#[test]
fn fail_on_threshold_controls_exit_code() -> Result<(), Box<dyn std::error::Error>> {
    let project = common::medium_project();

    Command::cargo_bin("webguard")?
        .arg("scan")
        .arg(project.path())
        .args(["--fail-on", "medium"])
        .assert()
        .code(1)
        .stderr(contains("failing at or above MEDIUM"));

    Command::cargo_bin("webguard")?
        .arg("scan")
        .arg(project.path())
        .args(["--fail-on", "high"])
        .assert()
        .success();

    Command::cargo_bin("webguard")?
        .arg("scan")
        .arg(project.path())
        .assert()
        .success();
    Ok(())
}

#[test]
fn unknown_severity_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let project = common::medium_project();
    Command::cargo_bin("webguard")?
        .arg("scan")
        .arg(project.path())
        .args(["--fail-on", "bogus"])
        .assert()
        .failure()
        .stderr(contains("unknown severity 'bogus'"));
    Ok(())
}

#[test]
fn fail_on_from_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let project = common::medium_project();
    common::write(project.path(), "webguard.toml", "fail_on = \"low\"\n");
    Command::cargo_bin("webguard")?
        .arg("scan")
        .arg(project.path())
        .assert()
        .code(1);

    common::write(project.path(), "webguard.toml", "fail_on = \"severe\"\n");
    Command::cargo_bin("webguard")?
        .arg("scan")
        .arg(project.path())
        .assert()
        .failure()
        .stderr(contains("unknown severity 'severe'"));
    Ok(())
}
