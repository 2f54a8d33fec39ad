use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

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

#[test]
fn inspect_reports_detection_and_sections() {
    ros_migrate()
        .arg("inspect")
        .arg(fixture("fixtures/ros6-ccr1036.rsc"))
        .assert()
        .success()
        .stdout(predicate::str::contains("version=6.49.2"))
        .stdout(predicate::str::contains("model=CCR1036-8G-2S+"))
        .stdout(predicate::str::contains("- ip-address: 7"))
        .stdout(predicate::str::contains("interface_mapping").not());
}

#[test]
fn inspect_with_target_shows_mapping() {
    ros_migrate()
        .arg("inspect")
        .arg(fixture("fixtures/ros6-ccr1036.rsc"))
        .arg("--target-device")
        .arg("CCR2216-1G-12XS-2XQ")
        .assert()
        .success()
        .stdout(predicate::str::contains("interface_mapping"))
        .stdout(predicate::str::contains("- ether1 -> ether1"))
        .stdout(predicate::str::contains("- sfp-sfpplus1 -> sfp28-1 (Ordinal)"));
}

#[test]
fn inspect_rejects_unknown_target() {
    ros_migrate()
        .arg("inspect")
        .arg(fixture("fixtures/ros6-ccr1036.rsc"))
        .arg("--target-device")
        .arg("hAP-ax3")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown target device: hAP-ax3"));
}

#[test]
fn devices_lists_embedded_catalog() {
    ros_migrate()
        .arg("devices")
        .assert()
        .success()
        .stdout(predicate::str::contains("devices source="))
        .stdout(predicate::str::contains("- CCR2216-1G-12XS-2XQ"));
}

#[test]
fn devices_json_is_an_array() {
    let assert = ros_migrate()
        .arg("devices")
        .arg("--format")
        .arg("json")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("json");
    let devices = json.as_array().expect("array");
    assert!(devices.iter().any(|d| d["model"] == "RB5009UG+S+"));
}
