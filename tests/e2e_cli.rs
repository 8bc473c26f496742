//! CLI end-to-end tests
//!
//! Tests for the multimodal command-line interface.

use assert_cmd::prelude::*;
use image::{DynamicImage, ImageFormat, RgbImage};
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the multimodal binary
#[allow(deprecated)]
fn multimodal_cmd() -> Command {
    Command::cargo_bin("multimodal").unwrap()
}

fn write_png(dir: &Path, width: u32, height: u32) -> PathBuf {
    let path = dir.join("picture.png");
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .save_with_format(&path, ImageFormat::Png)
        .unwrap();
    path
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = multimodal_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = multimodal_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("multimodal"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = multimodal_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_check_tools_command() {
    let mut cmd = multimodal_cmd();
    cmd.arg("check-tools").assert().success().stdout(
        predicate::str::contains("ffmpeg").and(predicate::str::contains("ffprobe")),
    );
}

#[test]
fn test_cli_inspect_image() {
    let temp = tempdir().unwrap();
    let png = write_png(temp.path(), 12, 7);

    let mut cmd = multimodal_cmd();
    cmd.args(["inspect", "--json", png.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"type\": \"image\""))
        .stdout(predicate::str::contains("\"width\": 12"))
        .stdout(predicate::str::contains("\"height\": 7"));
}

#[test]
fn test_cli_inspect_nonexistent_file() {
    let mut cmd = multimodal_cmd();
    cmd.args(["inspect", "/nonexistent/path/photo.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exist"));
}

#[test]
fn test_cli_encode_then_decode_binary() {
    let temp = tempdir().unwrap();
    let input = temp.path().join("notes.txt");
    fs::write(&input, "remember the milk\n").unwrap();

    let output = multimodal_cmd()
        .args(["encode", input.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());
    let saved = String::from_utf8(output.stdout).unwrap();
    assert!(saved.contains("\"compression\": \"gzip\""));
    assert!(saved.contains("\"type\": \"binary\""));

    let saved_path = temp.path().join("notes.json");
    fs::write(&saved_path, saved).unwrap();
    let restored = temp.path().join("restored.txt");

    let mut cmd = multimodal_cmd();
    cmd.args([
        "decode",
        saved_path.to_str().unwrap(),
        "--output",
        restored.to_str().unwrap(),
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("text/plain"));

    assert_eq!(fs::read_to_string(restored).unwrap(), "remember the milk\n");
}

#[test]
fn test_cli_decode_legacy_shape_with_kind() {
    let temp = tempdir().unwrap();
    let saved = temp.path().join("legacy.json");
    fs::write(&saved, r#"{"mime": "text/plain", "data": "aGk="}"#).unwrap();

    let mut cmd = multimodal_cmd();
    cmd.args(["decode", "--kind", "binary", saved.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("size: 2"));
}

#[test]
fn test_cli_validate_config() {
    let temp = tempdir().unwrap();
    let config_file = temp.path().join("config.toml");
    fs::write(&config_file, "[fetch]\ntimeout_secs = 12\n").unwrap();

    let mut cmd = multimodal_cmd();
    cmd.args(["validate", config_file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("12s"));
}

#[test]
fn test_cli_query_keeps_plain_text() {
    let mut cmd = multimodal_cmd();
    cmd.args(["query", "hello there"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello there"));
}
