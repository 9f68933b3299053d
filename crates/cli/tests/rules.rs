use assert_cmd::prelude::*;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::Value;
use std::process::Command;

#[test]
fn rules_list_shows_catalog() -> Result<(), Box<dyn std::error::Error>> {
    Command::cargo_bin("webguard")?
        .args(["rules", "list"])
        .assert()
        .success()
        .stdout(
            contains("sql-injection")
                .and(contains("unescaped-output"))
                .and(contains("11 rules")),
        );
    Ok(())
}

#[test]
fn rules_list_json() -> Result<(), Box<dyn std::error::Error>> {
    let output = Command::cargo_bin("webguard")?
        .args(["rules", "list", "--json"])
        .output()?;
    assert!(output.status.success());
    let v: Value = serde_json::from_slice(&output.stdout)?;
    let rules = v.as_array().unwrap();
    assert_eq!(rules.len(), 11);
    assert_eq!(rules[0]["id"], "sql-injection");
    assert_eq!(rules[0]["category"], "security");
    Ok(())
}

#[test]
fn rules_show_describes_one_rule() -> Result<(), Box<dyn std::error::Error>> {
    Command::cargo_bin("webguard")?
        .args(["rule", "show", "session-security"])
        .assert()
        .success()
        .stdout(contains("Default severity").and(contains("session-security.md")));

    Command::cargo_bin("webguard")?
        .args(["rules", "show", "nope"])
        .assert()
        .failure()
        .stderr(contains("unknown rule 'nope'"));
    Ok(())
}
