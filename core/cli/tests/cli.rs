use std::fs;

use assert_cmd::Command;
use tempfile::tempdir;

fn light_indexer() -> Command {
    Command::cargo_bin("light-indexer").unwrap()
}

#[test]
fn test_print_default_config() {
    let output = light_indexer()
        .args(["print-config", "--default"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("[verification]"));
    assert!(stdout.contains("bitcoinRPC = \"http://127.0.0.1:8332\""));
    assert!(stdout.contains("interval = \"10s\""));
}

#[test]
fn test_print_json_config_as_toml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        r#"{
            "verification": {
                "bitcoinRPC": "http://127.0.0.1:8332",
                "metaProtocol": "brc-20",
                "minimalCheckpoint": 840000
            },
            "committeeIndexers": {
                "s3": [
                    {"region": "us-west-2", "bucket": "ord-a", "name": "a"},
                    {"region": "us-west-2", "bucket": "ord-b", "name": "b"}
                ]
            }
        }"#,
    )
    .unwrap();

    let output = light_indexer()
        .args(["print-config", "--config"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("minimalCheckpoint = 840000"));
    assert!(stdout.contains("bucket = \"ord-b\""));
}

#[test]
fn test_run_fails_without_config() {
    let dir = tempdir().unwrap();
    light_indexer()
        .args(["run", "-c"])
        .arg(dir.path().join("missing.toml"))
        .assert()
        .failure();
}

#[test]
fn test_run_rejects_invalid_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "[verification]\nbitcoinRPC = \"http://127.0.0.1:8332\"\nmetaProtocol = \"brc-20\"\nminimalCheckpoint = 0\n\n[committeeIndexers]\n",
    )
    .unwrap();

    light_indexer()
        .args(["run", "-c"])
        .arg(&path)
        .assert()
        .failure();
}
