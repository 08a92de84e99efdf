//! End-to-end CLI behavior.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn stepcheck() -> Command {
    Command::cargo_bin("stepcheck").unwrap()
}

#[test]
fn help_lists_subcommands() {
    stepcheck()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("succ"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("cmp"));
}

#[test]
fn version_is_reported() {
    stepcheck()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("stepcheck"));
}

#[test]
fn check_rejects_missing_executable() {
    stepcheck()
        .args(["check", "main\\..*", "/nonexistent/prog"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No such file").or(predicate::str::contains("I/O error")));
}

#[test]
fn check_rejects_non_executable_input() {
    let dir = TempDir::new().unwrap();
    let bogus = dir.path().join("not_a_binary");
    fs::write(&bogus, "just some text\n").unwrap();

    stepcheck()
        .args(["check", ".*", bogus.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized executable container"));
}

#[test]
fn check_rejects_invalid_pattern() {
    let dir = TempDir::new().unwrap();
    let bogus = dir.path().join("prog");
    fs::write(&bogus, "whatever").unwrap();

    stepcheck()
        .args(["check", "main\\.(", bogus.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid function pattern"));
}

#[test]
fn cmp_reports_improvements_and_regressions() {
    let dir = TempDir::new().unwrap();
    let old = dir.path().join("base.simple.txt");
    let new = dir.path().join("next.simple.txt");
    fs::write(
        &old,
        "a.go:10:0x40: continues to a.go:20 (+10)\na.go:30:0x80: continues to ret (+10)\n",
    )
    .unwrap();
    fs::write(
        &new,
        "a.go:30:0x80: continues to ret (+10)\nb.go:5:0x100: continues to b.go:9 (+1)\n",
    )
    .unwrap();

    stepcheck()
        .args(["cmp", old.to_str().unwrap(), new.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Improved:"))
        .stdout(predicate::str::contains("a.go:10 (0x40)"))
        .stdout(predicate::str::contains("Regressed:"))
        .stdout(predicate::str::contains("b.go:5 (0x100)"));
}

#[test]
fn cmp_of_identical_runs_lists_nothing() {
    let dir = TempDir::new().unwrap();
    let old = dir.path().join("base.simple.txt");
    let new = dir.path().join("next.simple.txt");
    let content = "a.go:10:0x40: continues to a.go:20 (+10)\n";
    fs::write(&old, content).unwrap();
    fs::write(&new, content).unwrap();

    stepcheck()
        .args(["cmp", old.to_str().unwrap(), new.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("a.go:10").not());
}

#[test]
fn cmp_writes_to_output_file() {
    let dir = TempDir::new().unwrap();
    let old = dir.path().join("base.simple.txt");
    let new = dir.path().join("next.simple.txt");
    let out = dir.path().join("report.txt");
    fs::write(&old, "a.go:10:0x40: d\n").unwrap();
    fs::write(&new, "").unwrap();

    stepcheck()
        .args([
            "cmp",
            old.to_str().unwrap(),
            new.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
        ])
        .assert()
        .success();

    let report = fs::read_to_string(&out).unwrap();
    assert!(report.contains("Improved:"));
    assert!(report.contains("a.go:10 (0x40)"));
}
