//! Command line behavior of the extractor binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_large_and_small_are_exclusive() {
    Command::cargo_bin("vmap-extractor")
        .unwrap()
        .args(["-l", "-s"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_unknown_flag_is_a_usage_error() {
    Command::cargo_bin("vmap-extractor")
        .unwrap()
        .arg("--frobnicate")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_mpq_client_is_refused() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("Data");
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join("patch.MPQ"), b"").unwrap();

    Command::cargo_bin("vmap-extractor")
        .unwrap()
        .arg("-d")
        .arg(dir.path())
        .arg("-o")
        .arg(dir.path().join("Buildings"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("MPQ"));

    assert!(!dir.path().join("Buildings").exists());
}

#[test]
fn test_polluted_output_is_refused() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("Buildings");
    fs::create_dir_all(output.join("dir_bin")).unwrap();

    Command::cargo_bin("vmap-extractor")
        .unwrap()
        .arg("-d")
        .arg(dir.path())
        .arg("-o")
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("polluted"));
}

#[test]
fn test_data_dir_from_environment() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("Data");
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join("base.mpq"), b"").unwrap();

    Command::cargo_bin("vmap-extractor")
        .unwrap()
        .env("VMAP_DATA_DIR", dir.path())
        .arg("-o")
        .arg(dir.path().join("Buildings"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("MPQ"));
}
