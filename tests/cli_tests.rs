use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Binary run in an empty directory with no SPLITX_* overrides
fn splitter(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("splitter").unwrap();
    cmd.current_dir(dir.path());
    for (key, _) in std::env::vars() {
        if key.starts_with("SPLITX_") {
            cmd.env_remove(key);
        }
    }
    cmd.env("RUST_LOG", "warn");
    cmd
}

#[test]
fn test_plan_json_from_duration() {
    let dir = tempfile::tempdir().unwrap();
    let output = splitter(&dir)
        .args(["plan", "--duration", "320", "--seconds", "140", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let segments = report["segments"].as_array().unwrap();
    assert_eq!(segments.len(), 3);
    assert_eq!(segments[0]["start_seconds"], 0.0);
    assert_eq!(segments[1]["start_seconds"], 140.0);
    assert_eq!(segments[2]["length_seconds"], 40.0);
    assert_eq!(segments[2]["output_file"], "video_part_003.mp4");
}

#[test]
fn test_plan_exact_multiple_has_no_empty_tail() {
    let dir = tempfile::tempdir().unwrap();
    splitter(&dir)
        .args(["plan", "--duration", "140", "--minutes", "2", "--seconds", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 segment(s)"));
}

#[test]
fn test_plan_rejects_empty_source() {
    let dir = tempfile::tempdir().unwrap();
    splitter(&dir)
        .args(["plan", "--duration", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("greater than zero"));
}

#[test]
fn test_plan_rejects_runaway_segment_count() {
    let dir = tempfile::tempdir().unwrap();
    splitter(&dir)
        .args(["plan", "--duration", "1000000000", "--seconds", "0.001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("more than 100000 segments"));
}

#[test]
fn test_plan_requires_input_or_duration() {
    let dir = tempfile::tempdir().unwrap();
    splitter(&dir).arg("plan").assert().failure();
}

#[test]
fn test_split_missing_input_fails_before_encoding() {
    let dir = tempfile::tempdir().unwrap();
    splitter(&dir)
        .args(["split", "--input", "missing.mp4"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("missing.mp4"));
    assert!(!dir.path().join("video_segments").exists());
}

#[test]
fn test_config_prints_defaults() {
    let dir = tempfile::tempdir().unwrap();
    splitter(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[splitx]"))
        .stdout(predicate::str::contains("segment_minutes = 2"))
        .stdout(predicate::str::contains("quality = \"medium\""));
}

#[test]
fn test_config_layers_file_then_environment() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("custom.toml"),
        "[splitx]\nsegment_minutes = 5\nquality = \"high\"\n",
    )
    .unwrap();

    splitter(&dir)
        .args(["--config", "custom.toml", "config"])
        .env("SPLITX_QUALITY", "low")
        .assert()
        .success()
        .stdout(predicate::str::contains("segment_minutes = 5"))
        .stdout(predicate::str::contains("quality = \"low\""));
}

#[test]
fn test_missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    splitter(&dir)
        .args(["--config", "nope.toml", "config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.toml"));
}
