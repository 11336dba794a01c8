#![cfg(feature = "build-binary")]

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn prints_version() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("minato")?;
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("minato"));
    Ok(())
}

#[test]
fn cache_missing_local_file_fails() -> Result<(), Box<dyn std::error::Error>> {
    let root = tempdir()?;
    let mut cmd = Command::cargo_bin("minato")?;
    cmd.args(["cache", "test/file/doesnt/exist"])
        .args(["--root", root.path().to_str().unwrap()]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
    Ok(())
}

#[test]
fn cache_local_file_prints_its_path() -> Result<(), Box<dyn std::error::Error>> {
    let root = tempdir()?;
    let dir = tempdir()?;
    let file = dir.path().join("data.txt");
    fs::write(&file, "local content")?;

    let mut cmd = Command::cargo_bin("minato")?;
    cmd.args(["cache", file.to_str().unwrap()])
        .args(["--root", root.path().to_str().unwrap()]);
    let assert = cmd.assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
    assert_eq!(stdout.trim(), file.to_str().unwrap());
    Ok(())
}

#[test]
fn unknown_scheme_lists_available_schemes() -> Result<(), Box<dyn std::error::Error>> {
    let root = tempdir()?;
    let mut cmd = Command::cargo_bin("minato")?;
    cmd.args(["cache", "ftp://example.com/file.txt"])
        .args(["--root", root.path().to_str().unwrap()]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown scheme"));
    Ok(())
}

#[test]
fn list_shows_table_header() -> Result<(), Box<dyn std::error::Error>> {
    let root = tempdir()?;
    let mut cmd = Command::cargo_bin("minato")?;
    cmd.arg("list").args(["--root", root.path().to_str().unwrap()]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("uid"))
        .stdout(predicate::str::contains("url"));
    Ok(())
}

#[test]
fn remove_with_no_matches_reports_nothing_to_delete() -> Result<(), Box<dyn std::error::Error>> {
    let root = tempdir()?;
    let mut cmd = Command::cargo_bin("minato")?;
    cmd.args(["remove", "no-such-query", "--force"])
        .args(["--root", root.path().to_str().unwrap()]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No caches to delete."));
    Ok(())
}

#[test]
fn download_refuses_to_overwrite() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let target = dir.path().join("existing.txt");
    fs::write(&target, "already here")?;

    let mut cmd = Command::cargo_bin("minato")?;
    cmd.args(["download", "https://example.com/file.txt"])
        .arg(target.to_str().unwrap());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--overwrite"));
    Ok(())
}
