use assert_cmd::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn repo_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("expected crates/<name> layout")
        .to_path_buf()
}

fn fixture() -> PathBuf {
    let path = repo_root().join("fixtures").join("graph").join("basic.json");
    assert!(path.exists(), "fixture missing: {}", path.display());
    path
}

#[test]
fn cli_layout_prints_fully_revealed_frame() {
    let exe = assert_cmd::cargo_bin!("narwhal-cli");
    let output = Command::new(exe)
        .args(["layout", fixture().to_string_lossy().as_ref()])
        .output()
        .expect("run narwhal-cli");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: Value = serde_json::from_slice(&output.stdout).expect("layout JSON");
    let nodes = json["frame"]["nodes"].as_array().expect("nodes");
    assert_eq!(nodes.len(), 8);
    assert!(nodes.iter().all(|n| n["opacity"] == 1.0));
    let hoax = nodes.iter().find(|n| n["id"] == "hoax").expect("hoax node");
    assert_eq!(hoax["isHidden"], true);

    let links = json["frame"]["links"].as_array().expect("links");
    assert!(links.iter().all(|l| l["id"] != "stale"));
    assert!(links.iter().all(|l| l["path"].as_str().is_some_and(|p| p.starts_with('M'))));
}

#[test]
fn cli_timeline_writes_events_to_out_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("timeline.json");
    let config = tmp.path().join("config.json");
    fs::write(&config, r#"{"batchSize": 2, "batchDelay": 100}"#).expect("write config");

    let exe = assert_cmd::cargo_bin!("narwhal-cli");
    Command::new(exe)
        .args([
            "timeline",
            "--render-mode",
            "batch",
            "--config",
            config.to_string_lossy().as_ref(),
            "--out",
            out.to_string_lossy().as_ref(),
            fixture().to_string_lossy().as_ref(),
        ])
        .assert()
        .success();

    let json: Value = serde_json::from_str(&fs::read_to_string(&out).expect("read out")).unwrap();
    let names: Vec<&str> = json["events"]
        .as_array()
        .expect("events")
        .iter()
        .filter_map(|e| e["event"].as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "renderReady",
            "renderComplete",
            "settlementReached",
            "revealComplete"
        ]
    );
    let complete_at = json["events"][1]["at"].as_f64().unwrap();
    // Seven content nodes in batches of two: three delayed admissions.
    assert_eq!(complete_at, 300.0);
}

#[test]
fn cli_reads_stdin_and_rejects_bad_input() {
    let exe = assert_cmd::cargo_bin!("narwhal-cli");
    assert_cmd::Command::new(exe)
        .arg("-")
        .write_stdin(r#"{"nodes": []}"#)
        .assert()
        .success();

    let exe = assert_cmd::cargo_bin!("narwhal-cli");
    assert_cmd::Command::new(exe)
        .write_stdin("not a graph")
        .assert()
        .code(1);
}

#[test]
fn cli_usage_errors_exit_with_code_two() {
    let exe = assert_cmd::cargo_bin!("narwhal-cli");
    Command::new(exe)
        .args(["--render-mode", "sideways"])
        .assert()
        .code(2);
}
