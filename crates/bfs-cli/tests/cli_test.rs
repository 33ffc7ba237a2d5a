//! Command-line behaviour tests

use assert_cmd::Command;
use bfs_testing::assertions::{assert_dirs_equal, assert_dirs_equal_except, collect_files};
use bfs_testing::fixtures::{create_hello_world, create_ignored_structure, create_test_files};
use bfs_testing::TestDir;
use predicates::prelude::*;

fn bfs(work: &TestDir) -> Command {
    let mut cmd = Command::cargo_bin("bfs").unwrap();
    cmd.arg("--config").arg(work.join("no-config.toml"));
    cmd
}

fn compress(work: &TestDir, input: &TestDir, extra: &[&str]) {
    bfs(work)
        .arg("compress")
        .arg("--input")
        .arg(input.path())
        .arg("--output")
        .arg(work.join("a.bfs"))
        .args(extra)
        .assert()
        .success();
}

fn extract(work: &TestDir, extra: &[&str]) {
    bfs(work)
        .arg("extract")
        .arg("--input")
        .arg(work.join("a.bfs"))
        .arg("--output")
        .arg(work.join("out"))
        .args(extra)
        .assert()
        .success();
}

#[test]
fn test_round_trip() {
    let source = TestDir::new().unwrap();
    create_test_files(&source).unwrap();
    let work = TestDir::new().unwrap();

    compress(&work, &source, &[]);
    extract(&work, &[]);
    assert_dirs_equal(source.path(), &work.join("out")).unwrap();
}

#[test]
fn test_round_trip_with_codec_flag() {
    let source = TestDir::new().unwrap();
    create_test_files(&source).unwrap();
    let work = TestDir::new().unwrap();

    compress(&work, &source, &["--codec", "brotli", "--level", "5"]);
    extract(&work, &["--codec", "brotli"]);
    assert_dirs_equal(source.path(), &work.join("out")).unwrap();
}

#[test]
fn test_codec_from_config_file() {
    let source = TestDir::new().unwrap();
    create_hello_world(&source).unwrap();
    let work = TestDir::new().unwrap();
    let config = work
        .create_file("bfs.toml", b"[codec]\nalgorithm = \"store\"\n")
        .unwrap();

    Command::cargo_bin("bfs")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .arg("compress")
        .arg("-i")
        .arg(source.path())
        .arg("-o")
        .arg(work.join("a.bfs"))
        .assert()
        .success();

    let bytes = std::fs::read(work.join("a.bfs")).unwrap();
    assert!(bytes.windows(5).any(|w| w == b"hello"));

    extract(&work, &["--codec", "store"]);
    assert_dirs_equal(source.path(), &work.join("out")).unwrap();
}

#[test]
fn test_ignore_file_is_honoured_by_default() {
    let source = TestDir::new().unwrap();
    create_ignored_structure(&source, "BFS_IGNORE").unwrap();
    let work = TestDir::new().unwrap();

    compress(&work, &source, &[]);
    extract(&work, &[]);
    assert_dirs_equal_except(
        source.path(),
        &work.join("out"),
        &["BFS_IGNORE", "secret.txt", "build/output.bin"],
    )
    .unwrap();
}

#[test]
fn test_use_ignore_file_false_packs_everything() {
    let source = TestDir::new().unwrap();
    create_ignored_structure(&source, "BFS_IGNORE").unwrap();
    let work = TestDir::new().unwrap();

    compress(&work, &source, &["-I", "false"]);
    extract(&work, &[]);
    assert_dirs_equal(source.path(), &work.join("out")).unwrap();
}

#[test]
fn test_list_json() {
    let source = TestDir::new().unwrap();
    create_hello_world(&source).unwrap();
    let work = TestDir::new().unwrap();
    compress(&work, &source, &["--codec", "store"]);

    let output = bfs(&work)
        .arg("list")
        .arg("-i")
        .arg(work.join("a.bfs"))
        .arg("--codec")
        .arg("store")
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    let mut paths: Vec<_> = entries
        .iter()
        .map(|e| e["path"].as_str().unwrap().to_string())
        .collect();
    paths.sort();
    assert_eq!(paths, ["a.txt", "sub/b.txt"]);
    assert!(entries.iter().all(|e| e["size"] == 5));
}

#[test]
fn test_list_table() {
    let source = TestDir::new().unwrap();
    create_hello_world(&source).unwrap();
    let work = TestDir::new().unwrap();
    compress(&work, &source, &[]);

    bfs(&work)
        .arg("list")
        .arg("-i")
        .arg(work.join("a.bfs"))
        .assert()
        .success()
        .stdout(predicate::str::contains("sub/b.txt"))
        .stdout(predicate::str::contains("2 files, 10 bytes"));
}

#[test]
fn test_errors_are_reported_on_stderr() {
    let work = TestDir::new().unwrap();
    std::fs::write(work.join("a.bfs"), b"XYZ").unwrap();

    bfs(&work)
        .arg("extract")
        .arg("-i")
        .arg(work.join("a.bfs"))
        .arg("-o")
        .arg(work.join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("format error"))
        .stderr(predicate::str::contains("signature"));
}

#[test]
fn test_quiet_suppresses_logging() {
    let source = TestDir::new().unwrap();
    create_hello_world(&source).unwrap();
    let work = TestDir::new().unwrap();

    bfs(&work)
        .arg("-q")
        .arg("compress")
        .arg("-i")
        .arg(source.path())
        .arg("-o")
        .arg(work.join("a.bfs"))
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_quiet_still_reports_errors() {
    let work = TestDir::new().unwrap();

    bfs(&work)
        .arg("-q")
        .arg("extract")
        .arg("-i")
        .arg(work.join("nope.bfs"))
        .arg("-o")
        .arg(work.join("out"))
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("IO error"));
}

#[test]
fn test_config_show_prints_effective_settings() {
    let work = TestDir::new().unwrap();

    bfs(&work)
        .arg("config")
        .arg("--show")
        .assert()
        .success()
        .stdout(predicate::str::contains("algorithm = \"zstd\""))
        .stdout(predicate::str::contains("ignore_file_name = \"BFS_IGNORE\""));

    bfs(&work)
        .arg("config")
        .arg("--path")
        .assert()
        .success()
        .stdout(predicate::str::contains("no-config.toml"));
}

#[test]
fn test_archive_written_inside_input_is_skipped() {
    let source = TestDir::new().unwrap();
    create_hello_world(&source).unwrap();
    let work = TestDir::new().unwrap();
    let archive = source.join("self.bfs");

    for _ in 0..2 {
        bfs(&work)
            .arg("compress")
            .arg("-i")
            .arg(source.path())
            .arg("-o")
            .arg(&archive)
            .assert()
            .success();
    }

    bfs(&work)
        .arg("extract")
        .arg("-i")
        .arg(&archive)
        .arg("-o")
        .arg(work.join("out"))
        .assert()
        .success();
    let files = collect_files(&work.join("out")).unwrap();
    assert_eq!(files.len(), 2);
    assert!(!files.contains_key("self.bfs"));
}
