//! Run comparison.
//!
//! Compares two check runs by their simple report files, keyed by
//! `file:line`. Mismatches present only in the old run have improved,
//! mismatches present only in the new run are regressions. Useful for
//! sweeping compiler or toolchain changes for line-table quality drift.

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use std::fs;
use std::path::Path;

/// One recorded mismatch from a simple report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunError {
    pub pc: String,
    pub descr: String,
}

/// A parsed check run: mismatches keyed by `file:line`.
#[derive(Debug, Default)]
pub struct Run {
    pub name: String,
    pub errors: FxHashMap<String, RunError>,
}

/// Parse a simple report. Lines that do not match the
/// `file:line:pc:descr` shape (including the trailing penalty summary)
/// are ignored.
pub fn read_run(path: &Path) -> Result<Run> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading run report {}", path.display()))?;

    let mut errors = FxHashMap::default();
    for line in content.lines() {
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.splitn(4, ':').collect();
        if fields.len() != 4 {
            continue;
        }
        errors.insert(
            format!("{}:{}", fields[0], fields[1]),
            RunError {
                pc: fields[2].to_string(),
                descr: fields[3].to_string(),
            },
        );
    }

    Ok(Run {
        name: path.display().to_string(),
        errors,
    })
}

/// The outcome of comparing two runs.
#[derive(Debug, Default)]
pub struct Comparison {
    pub improved: Vec<String>,
    pub regressed: Vec<String>,
}

/// Set difference in both directions, rendered as sorted report lines.
pub fn compare_runs(old: &Run, new: &Run) -> Comparison {
    let mut improved: Vec<String> = old
        .errors
        .iter()
        .filter(|(key, _)| !new.errors.contains_key(*key))
        .map(|(key, err)| format!("{} ({}){}", key, err.pc, err.descr))
        .collect();
    let mut regressed: Vec<String> = new
        .errors
        .iter()
        .filter(|(key, _)| !old.errors.contains_key(*key))
        .map(|(key, err)| format!("{} ({}){}", key, err.pc, err.descr))
        .collect();

    improved.sort();
    regressed.sort();
    Comparison {
        improved,
        regressed,
    }
}

pub fn print_comparison(
    out: &mut dyn std::io::Write,
    old: &Run,
    new: &Run,
    cmp: &Comparison,
) -> Result<()> {
    writeln!(out, "Comparing: {}\n       To: {}\n", old.name, new.name)?;
    writeln!(out, "Improved:")?;
    for line in &cmp.improved {
        writeln!(out, "{}", line)?;
    }
    writeln!(out, "\n\nRegressed:")?;
    for line in &cmp.regressed {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_of(lines: &[(&str, &str, &str)]) -> Run {
        let mut errors = FxHashMap::default();
        for (key, pc, descr) in lines {
            errors.insert(
                key.to_string(),
                RunError {
                    pc: pc.to_string(),
                    descr: descr.to_string(),
                },
            );
        }
        Run {
            name: "test".to_string(),
            errors,
        }
    }

    #[test]
    fn reports_improvements_and_regressions() {
        let old = run_of(&[
            ("a.go:10", "0x40", " continues to a.go:20 (+10)"),
            ("a.go:30", "0x80", " continues to ret (+10)"),
        ]);
        let new = run_of(&[
            ("a.go:30", "0x80", " continues to ret (+10)"),
            ("b.go:5", "0x100", " continues to b.go:9 (+1)"),
        ]);

        let cmp = compare_runs(&old, &new);
        assert_eq!(
            cmp.improved,
            vec!["a.go:10 (0x40) continues to a.go:20 (+10)"]
        );
        assert_eq!(
            cmp.regressed,
            vec!["b.go:5 (0x100) continues to b.go:9 (+1)"]
        );
    }

    #[test]
    fn identical_runs_compare_clean() {
        let run = run_of(&[("a.go:10", "0x40", " d")]);
        let same = run_of(&[("a.go:10", "0x40", " d")]);
        let cmp = compare_runs(&run, &same);
        assert!(cmp.improved.is_empty());
        assert!(cmp.regressed.is_empty());
    }

    #[test]
    fn read_run_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("base.simple.txt");
        std::fs::write(
            &path,
            "a.go:10:0x40: continues to a.go:20 (+10)\n\nAverage penalty per line: 10/3 = 3.33\n",
        )
        .unwrap();

        let run = read_run(&path).unwrap();
        assert_eq!(run.errors.len(), 1);
        let err = &run.errors["a.go:10"];
        assert_eq!(err.pc, "0x40");
        assert_eq!(err.descr, " continues to a.go:20 (+10)");
    }
}
