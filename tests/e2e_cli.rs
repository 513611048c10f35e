//! CLI end-to-end tests
//!
//! Tests for the boxcutter command-line interface.

mod common;

use assert_cmd::prelude::*;
use common::{write_video_mp4, STREAM};
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the boxcutter binary
#[allow(deprecated)]
fn boxcutter_cmd() -> Command {
    Command::cargo_bin("boxcutter").unwrap()
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = boxcutter_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = boxcutter_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("boxcutter"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = boxcutter_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_extract_help() {
    let mut cmd = boxcutter_cmd();
    cmd.args(["extract", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Annex-B"));
}

#[test]
fn test_cli_extract_default_output() {
    let temp = tempdir().unwrap();
    let input = write_video_mp4(temp.path(), false);

    let mut cmd = boxcutter_cmd();
    cmd.arg("extract")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 samples"));

    let written = fs::read(temp.path().join("video.h264")).unwrap();
    assert_eq!(written, STREAM);
}

#[test]
fn test_cli_extract_explicit_output() {
    let temp = tempdir().unwrap();
    let input = write_video_mp4(temp.path(), false);
    let output = temp.path().join("out.264");

    let mut cmd = boxcutter_cmd();
    cmd.arg("extract")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    assert_eq!(fs::read(&output).unwrap(), STREAM);
    assert!(!temp.path().join("video.h264").exists());
}

#[test]
fn test_cli_extract_short_sample_aborts() {
    let temp = tempdir().unwrap();
    let input = write_video_mp4(temp.path(), true);

    let mut cmd = boxcutter_cmd();
    cmd.arg("extract")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("sample 1"));

    assert!(!temp.path().join("broken.h264").exists());
}

#[test]
fn test_cli_extract_best_effort_flag() {
    let temp = tempdir().unwrap();
    let input = write_video_mp4(temp.path(), true);

    let mut cmd = boxcutter_cmd();
    cmd.arg("extract")
        .arg(&input)
        .arg("--best-effort")
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped 1 samples"));

    let written = fs::read(temp.path().join("broken.h264")).unwrap();
    assert_eq!(written, &STREAM[..11]);
}

#[test]
fn test_cli_extract_policy_from_config() {
    let temp = tempdir().unwrap();
    let input = write_video_mp4(temp.path(), true);
    let config_file = temp.path().join("config.toml");
    fs::write(
        &config_file,
        r#"
[extract]
policy = "best-effort"
"#,
    )
    .unwrap();

    let mut cmd = boxcutter_cmd();
    cmd.arg("--config")
        .arg(&config_file)
        .arg("extract")
        .arg(&input)
        .assert()
        .success();
}

#[test]
fn test_cli_extract_nonexistent_file() {
    let mut cmd = boxcutter_cmd();
    cmd.args(["extract", "/nonexistent/path/movie.mp4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exist"));
}

#[test]
fn test_cli_extract_not_an_mp4() {
    let temp = tempdir().unwrap();
    let input = temp.path().join("notes.mp4");
    fs::write(&input, b"just some text").unwrap();

    let mut cmd = boxcutter_cmd();
    cmd.arg("extract")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse"));
}

#[test]
fn test_cli_info_text() {
    let temp = tempdir().unwrap();
    let input = write_video_mp4(temp.path(), false);

    let mut cmd = boxcutter_cmd();
    cmd.arg("info")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Major brand: isom"))
        .stdout(predicate::str::contains("Compatible brands: isom, avc1"))
        .stdout(predicate::str::contains("320x240"))
        .stdout(predicate::str::contains("[selected]"));
}

#[test]
fn test_cli_info_json() {
    let temp = tempdir().unwrap();
    let input = write_video_mp4(temp.path(), false);

    let output = boxcutter_cmd()
        .arg("info")
        .arg(&input)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["ftyp"]["major_brand"], "isom");
    assert_eq!(json["mvhd"]["timescale"], 1000);
    assert_eq!(json["faststart"], false);
    assert_eq!(json["video_track"], 0);
    assert_eq!(json["tracks"][0]["handler"], "vide");
    assert_eq!(json["tracks"][0]["sample_count"], 2);
    assert_eq!(json["tracks"][0]["language"], "eng");
}

#[test]
fn test_cli_tree() {
    let temp = tempdir().unwrap();
    let input = write_video_mp4(temp.path(), false);

    let mut cmd = boxcutter_cmd();
    cmd.arg("tree")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("ftyp offset=0 size=24"))
        .stdout(predicate::str::contains("mdat offset=24"))
        .stdout(predicate::str::contains("          stsz offset="));
}

#[test]
fn test_cli_validate_config() {
    let temp = tempdir().unwrap();
    let config_file = temp.path().join("config.toml");
    fs::write(
        &config_file,
        r#"
[limits]
max_depth = 8
"#,
    )
    .unwrap();

    let mut cmd = boxcutter_cmd();
    cmd.arg("validate")
        .arg(&config_file)
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"))
        .stdout(predicate::str::contains("Max depth: 8"));
}

#[test]
fn test_cli_invalid_config() {
    let temp = tempdir().unwrap();
    let config_file = temp.path().join("config.toml");
    fs::write(&config_file, "[limits]\nmax_boxes = 0\n").unwrap();

    let mut cmd = boxcutter_cmd();
    cmd.arg("validate")
        .arg(&config_file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_boxes"));
}
