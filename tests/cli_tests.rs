//! End-to-end CLI tests
//!
//! These use a custom `sh` language defined in a config file: "compiling" copies the script to
//! the artifact path and running it executes `sh <artifact>`. No real compiler is needed.
#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn unique_temp_dir() -> PathBuf {
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let pid = std::process::id();
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    std::env::temp_dir().join(format!("polytest_cli_test_{}_{pid}_{id}", ts))
}

const CONFIG: &str = r#"{
  "languages": {
    "sh": {
      "compile": ["cp", "{source}", "{output}"],
      "run": ["sh", "{output}"],
      "description": "POSIX shell scripts"
    },
    "broken": {
      "compile": ["sh", "-c", "echo 'boom: cannot compile' >&2; exit 2"],
      "run": ["{output}"]
    },
    "ghost": {
      "compile": ["sh", "-c", "echo 'compiled nothing'"],
      "run": ["{output}"]
    }
  }
}"#;

/// Project dir with `polytest.json` and `tests/<language>/<name>` scripts.
fn project(language: &str, scripts: &[(&str, &str)]) -> PathBuf {
    let root = unique_temp_dir();
    let dir = root.join("tests").join(language);
    fs::create_dir_all(&dir).unwrap();
    fs::write(root.join("polytest.json"), CONFIG).unwrap();
    for (name, body) in scripts {
        fs::write(dir.join(name), body).unwrap();
    }
    root
}

fn polytest(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("polytest").unwrap();
    cmd.current_dir(root).env_remove("RUST_LOG");
    cmd
}

#[test]
fn run_passes_with_blacklisted_failure() {
    let root = project("sh", &[("pass.sh", "echo hello from pass\n"), ("fail.sh", "exit 3\n")]);

    polytest(&root)
        .args(["run", "--config", "polytest.json", "-l", "sh", "--skip", "fail.sh"])
        .assert()
        .success()
        .stdout(contains("Running test: pass.sh"))
        .stdout(contains("hello from pass"))
        .stdout(contains("pass.sh PASSED"))
        .stdout(contains("fail.sh SKIPPED"))
        .stdout(contains("1 passed, 1 skipped"))
        .stdout(contains("Running test: fail.sh").not());

    assert!(root.join("bin").join("sh").join("pass").is_file());
    assert!(!root.join("bin").join("sh").join("fail").exists());

    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn run_failure_stops_at_first_failing_test() {
    // fail.sh sorts before pass.sh
    let root = project(
        "sh",
        &[("fail.sh", "echo 'expected 4, got 5' >&2\nexit 3\n"), ("pass.sh", "echo ok\n")],
    );

    polytest(&root)
        .args(["run", "--config", "polytest.json", "-l", "sh"])
        .assert()
        .code(1)
        .stdout(contains("expected 4, got 5"))
        .stdout(contains("test binary exited with code 3"))
        .stdout(contains("fail.sh FAILED (run)"))
        .stdout(contains("1 failed, 1 not run"))
        .stdout(contains("Running test: pass.sh").not());

    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn no_fail_fast_runs_everything() {
    let root = project("sh", &[("fail.sh", "exit 1\n"), ("pass.sh", "echo ok\n")]);

    polytest(&root)
        .args(["run", "--config", "polytest.json", "-l", "sh", "--no-fail-fast"])
        .assert()
        .code(1)
        .stdout(contains("pass.sh PASSED"))
        .stdout(contains("1 passed, 1 failed"));

    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn compile_failure_reports_compiler_stderr() {
    let root = project("broken", &[("a.broken", "")]);

    polytest(&root)
        .args(["run", "--config", "polytest.json", "-l", "broken"])
        .assert()
        .code(1)
        .stdout(contains("boom: cannot compile"))
        .stdout(contains("compiler exited with code 2"))
        .stdout(contains("a.broken FAILED (compile)"));

    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn missing_artifact_reports_launch_failure() {
    let root = project("ghost", &[("a.ghost", ""), ("b.ghost", "")]);

    polytest(&root)
        .args(["run", "--config", "polytest.json", "-l", "ghost"])
        .assert()
        .code(1)
        .stdout(contains("compiled nothing"))
        .stdout(contains("failed to launch 'bin/ghost/a'"))
        .stdout(contains("test binary exited with code 127"))
        .stdout(contains("a.ghost FAILED (run)"))
        .stdout(contains("1 failed, 1 not run"));

    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn unsupported_language_exits_with_failure() {
    let root = project("cobol", &[("a.cobol", "")]);

    polytest(&root)
        .args(["run", "-l", "cobol"])
        .assert()
        .code(1)
        .stderr(contains("unsupported language: 'cobol'"));

    assert!(!root.join("bin").exists());
    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn missing_test_directory_exits_with_failure() {
    let root = project("sh", &[]);

    polytest(&root)
        .args(["run", "--config", "polytest.json", "-l", "sh", "--tests-dir", "nowhere"])
        .assert()
        .code(1)
        .stderr(contains("failed to read test directory"));

    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn list_marks_skipped_tests() {
    let root = project("sh", &[("a.sh", ""), ("b.sh", ""), ("notes.txt", "")]);

    polytest(&root)
        .args(["list", "--config", "polytest.json", "-l", "sh", "-s", "b.sh"])
        .assert()
        .success()
        .stdout(contains("a.sh -> bin/sh/a"))
        .stdout(contains("b.sh (skipped)"))
        .stdout(contains("notes.txt").not());

    assert!(!root.join("bin").exists());
    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn languages_lists_builtin_and_custom() {
    let root = project("sh", &[]);

    polytest(&root)
        .args(["languages", "--config", "polytest.json"])
        .assert()
        .success()
        .stdout(contains("cpp: C++17 with GoogleTest (g++)"))
        .stdout(contains("sh: POSIX shell scripts"))
        .stdout(contains("compile: cp {source} {output}"));

    fs::remove_dir_all(&root).unwrap();
}
