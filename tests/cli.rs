use assert_cmd::prelude::*;
use serde_json::Value;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn menuprobe(workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("menuprobe").expect("binary built");
    cmd.current_dir(workdir.path())
        .env_remove("MENUPROBE_TARGET_URL")
        .env_remove("MENUPROBE_CONCURRENCY")
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn help_lists_commands() {
    let workdir = TempDir::new().unwrap();
    let assert = menuprobe(&workdir).arg("--help").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    for command in ["run", "summary", "store", "config"] {
        assert!(stdout.contains(command), "help should mention {command}");
    }
}

#[test]
fn config_show_reads_explicit_file_as_json() {
    let workdir = TempDir::new().unwrap();
    let path = workdir.path().join("probe.yaml");
    fs::write(&path, "target_url: https://food.test\nconcurrency: 4\n").unwrap();

    let assert = menuprobe(&workdir)
        .args(["--format", "json", "--config"])
        .arg(&path)
        .args(["config", "show"])
        .assert()
        .success();

    let payload: Value = serde_json::from_slice(&assert.get_output().stdout).expect("json output");
    assert_eq!(payload["target_url"], "https://food.test");
    assert_eq!(payload["concurrency"], 4);
    assert_eq!(payload["agent"]["step_ceiling"], 60);
}

#[test]
fn config_validate_rejects_zero_concurrency() {
    let workdir = TempDir::new().unwrap();
    let good = workdir.path().join("good.yaml");
    let bad = workdir.path().join("bad.yaml");
    fs::write(&good, "concurrency: 3\n").unwrap();
    fs::write(&bad, "concurrency: 0\n").unwrap();

    menuprobe(&workdir)
        .args(["config", "validate"])
        .arg(&good)
        .assert()
        .success();
    menuprobe(&workdir)
        .args(["config", "validate"])
        .arg(&bad)
        .assert()
        .failure();
}

#[test]
fn missing_explicit_config_fails() {
    let workdir = TempDir::new().unwrap();
    menuprobe(&workdir)
        .args(["--config", "nope.yaml", "config", "show"])
        .assert()
        .failure();
}

#[test]
fn store_stats_on_fresh_directory() {
    let workdir = TempDir::new().unwrap();
    let store = workdir.path().join("state");

    let assert = menuprobe(&workdir)
        .args(["-f", "json", "store", "--dir"])
        .arg(&store)
        .args(["stats", "--top", "3"])
        .assert()
        .success();

    let payload: Value = serde_json::from_slice(&assert.get_output().stdout).expect("json output");
    assert_eq!(payload["bodies"], 0);
    assert_eq!(payload["commits"], 0);
}

#[test]
fn summary_of_empty_directory_is_empty() {
    let workdir = TempDir::new().unwrap();
    let runs = workdir.path().join("runs");
    fs::create_dir_all(&runs).unwrap();

    let assert = menuprobe(&workdir)
        .args(["--format", "json", "summary", "--input"])
        .arg(&runs)
        .assert()
        .success();

    let payload: Value = serde_json::from_slice(&assert.get_output().stdout).expect("json output");
    assert_eq!(payload, Value::Array(Vec::new()));
}
