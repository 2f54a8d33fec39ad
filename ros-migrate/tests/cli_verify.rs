use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

fn ros_migrate() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ros-migrate"));
    cmd.env("NO_COLOR", "1");
    cmd
}

fn without_line(dir: &Path, needle: &str) -> PathBuf {
    let source = fs::read_to_string(fixture("fixtures/ros6-ccr1036.rsc")).expect("read fixture");
    let trimmed: String = source
        .lines()
        .filter(|line| !line.contains(needle))
        .map(|line| format!("{line}\n"))
        .collect();
    let path = dir.join("candidate.rsc");
    fs::write(&path, trimmed).expect("write candidate");
    path
}

#[test]
fn verify_identical_configs_is_ok() {
    let source = fixture("fixtures/ros6-ccr1036.rsc");
    ros_migrate()
        .arg("verify")
        .arg(&source)
        .arg(&source)
        .assert()
        .success()
        .stdout(predicate::str::contains("validation severity=ok"))
        .stdout(predicate::str::contains("- none"));
}

#[test]
fn verify_fails_when_a_user_is_dropped() {
    let dir = tempdir().expect("tempdir");
    let candidate = without_line(dir.path(), "name=netops");

    ros_migrate()
        .arg("verify")
        .arg(fixture("fixtures/ros6-ccr1036.rsc"))
        .arg(&candidate)
        .assert()
        .failure()
        .stdout(predicate::str::contains("validation severity=critical"))
        .stdout(predicate::str::contains("missing_users"))
        .stderr(predicate::str::contains("verify failed"));
}

#[test]
fn verify_strict_rejects_warnings() {
    let dir = tempdir().expect("tempdir");
    let candidate = without_line(dir.path(), "address=172.16.200.1/24");

    ros_migrate()
        .arg("verify")
        .arg(fixture("fixtures/ros6-ccr1036.rsc"))
        .arg(&candidate)
        .assert()
        .success()
        .stdout(predicate::str::contains("validation severity=warning"));

    ros_migrate()
        .arg("verify")
        .arg(fixture("fixtures/ros6-ccr1036.rsc"))
        .arg(&candidate)
        .arg("--strict")
        .assert()
        .failure()
        .stderr(predicate::str::contains("strict mode"));
}

#[test]
fn verify_json_lists_missing_addresses() {
    let dir = tempdir().expect("tempdir");
    let candidate = without_line(dir.path(), "address=172.16.200.1/24");

    let assert = ros_migrate()
        .arg("verify")
        .arg(fixture("fixtures/ros6-ccr1036.rsc"))
        .arg(&candidate)
        .arg("--format")
        .arg("json")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("json");
    assert_eq!(json["severity"], "warning");
    assert_eq!(json["missing_ips"][0], "172.16.200.1");
    assert_eq!(json["issues"][0]["code"], "missing_ips");
}
