//! Output formatting and reporting.
//!
//! Three consumers are served:
//! - the `succ` listing: annotated source with group tags and compressed
//!   successor sets,
//! - mismatch reports: colored terminal rendering and a JSON form,
//! - tagged run files (`<tag>.simple.txt`, `<tag>.full.txt`), the simple
//!   form being the input of run comparison.

use crate::check::{CheckReport, Mismatch};
use crate::exe::Function;
use crate::successors::{group_fn_id, group_number, Pos, PosSet, Successors};
use anyhow::{Context, Result};
use colored::Colorize;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};

const SOURCE_COL: usize = 50;
const ELLIPSIS: char = '…';
const TAB: &str = "    ";

/// Compressed display of a successor set: sorted line numbers with runs of
/// more than two consecutive lines as `a-b`, the exit sentinel as `ret`,
/// and `any` for the absorbing set.
pub fn pos_set_display(set: &PosSet) -> String {
    if set.is_any() {
        return "any".to_string();
    }
    if set.is_empty() {
        return String::new();
    }

    let mut lines: Vec<i64> = set.iter().map(|pos| pos.line).collect();
    lines.sort_unstable();

    let mut buf = String::new();
    let flush = |buf: &mut String, start: i64, end: i64| {
        if end - start > 2 {
            let _ = write!(buf, "{}-{} ", start, end);
        } else {
            for line in start..=end {
                if line == -1 {
                    buf.push_str("ret ");
                } else {
                    let _ = write!(buf, "{} ", line);
                }
            }
        }
    };

    let mut start = lines[0];
    for i in 1..lines.len() {
        if lines[i] != lines[i - 1] + 1 {
            flush(&mut buf, start, lines[i - 1]);
            start = lines[i];
        }
    }
    flush(&mut buf, start, lines[lines.len() - 1]);

    buf.trim_end().to_string()
}

fn digits(mut n: u64) -> usize {
    let mut count = 1;
    n /= 10;
    while n > 0 {
        count += 1;
        n /= 10;
    }
    count
}

/// Print a function's source annotated with group tags and successor sets.
/// The group tag is only shown on the line where it changes.
pub fn print_successors(out: &mut dyn Write, succs: &Successors, func: &Function) -> Result<()> {
    let Some(decl) = &func.decl else {
        return Ok(());
    };
    let (start, end) = (&decl.start, &decl.end);

    writeln!(out, "{}:{}:", start.file, start.line)?;

    let file = match File::open(&start.file) {
        Ok(file) => file,
        // Source moved since compilation; the listing is best-effort.
        Err(_) => return Ok(()),
    };

    let mut prev_group = u64::MAX;
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", start.file))?;
        let i = i as i64 + 1;
        if i < start.line {
            continue;
        }
        if i > end.line {
            break;
        }

        let mut line = line.replace('\t', TAB);
        if line.chars().count() > SOURCE_COL {
            line = line.chars().take(SOURCE_COL - 1).collect();
            line.push(ELLIPSIS);
        }

        let pos = Pos::new(start.file.clone(), i);
        let set = succs.s.get(&pos);
        let group = succs.groups.get(&pos).copied();
        let next = set.map(pos_set_display).unwrap_or_default();

        match group {
            None if next.is_empty() => writeln!(out, "{:5} {:<col$}", i, line, col = SOURCE_COL)?,
            _ => {
                let group = group.unwrap_or(0);
                let tag = if group == prev_group {
                    format!(
                        " {:f$} {:g$} ",
                        "",
                        "",
                        f = digits(group_fn_id(group)),
                        g = digits(group_number(group))
                    )
                } else {
                    format!("[{}.{}]", group_fn_id(group), group_number(group))
                };
                writeln!(
                    out,
                    "{:5} {:<col$} // {} {}",
                    i,
                    line,
                    tag,
                    next,
                    col = SOURCE_COL
                )?;
                prev_group = group;
            }
        }
    }
    writeln!(out)?;
    Ok(())
}

fn mismatch_descr(m: &Mismatch) -> String {
    format!(" continues to {} (+{})", m.to, m.penalty)
}

/// Colored, human-readable mismatch report.
pub fn print_mismatches(out: &mut dyn Write, report: &CheckReport) -> Result<()> {
    for m in &report.mismatches {
        writeln!(
            out,
            "{}: ({:#x}) continues to {}, expected:",
            format!("{}:{}", m.from.file, m.from.line).yellow(),
            m.pc,
            m.to.to_string().red()
        )?;
        for pos in &m.expected {
            writeln!(out, "\t{}", pos)?;
        }
        writeln!(out, "\tpenalty: {}", format!("+{}", m.penalty).bold())?;
    }
    write_penalty_total(out, report)
}

/// One line per mismatch, `file:line:pc:descr`, the format run comparison
/// consumes.
pub fn write_simple_report(out: &mut dyn Write, report: &CheckReport) -> Result<()> {
    for m in &report.mismatches {
        writeln!(
            out,
            "{}:{}:{:#x}:{}",
            m.from.file,
            m.from.line,
            m.pc,
            mismatch_descr(m)
        )?;
    }
    write_penalty_total(out, report)
}

/// The simple report plus the expected successors of every mismatch.
pub fn write_full_report(out: &mut dyn Write, report: &CheckReport) -> Result<()> {
    for m in &report.mismatches {
        writeln!(
            out,
            "{}:{}: ({:#x}) continues to {}, expected:",
            m.from.file, m.from.line, m.pc, m.to
        )?;
        for pos in &m.expected {
            writeln!(out, "\t{}", pos)?;
        }
        writeln!(out, "\tpenalty: +{}", m.penalty)?;
    }
    write_penalty_total(out, report)
}

fn write_penalty_total(out: &mut dyn Write, report: &CheckReport) -> Result<()> {
    if report.penalty > 0 {
        writeln!(
            out,
            "Average penalty per line: {}/{} = {}",
            report.penalty,
            report.line_count,
            report.average_penalty()
        )?;
    }
    Ok(())
}

pub fn write_json(out: &mut dyn Write, report: &CheckReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, report).context("serializing report")?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    fn set_of(lines: &[i64]) -> PosSet {
        PosSet::Finite(
            lines
                .iter()
                .map(|&l| Pos::new("main.go", l))
                .collect::<FxHashSet<_>>(),
        )
    }

    #[test]
    fn displays_single_lines_and_runs() {
        assert_eq!(pos_set_display(&set_of(&[4])), "4");
        assert_eq!(pos_set_display(&set_of(&[4, 5])), "4 5");
        assert_eq!(pos_set_display(&set_of(&[4, 5, 6])), "4 5 6");
        assert_eq!(pos_set_display(&set_of(&[4, 5, 6, 7])), "4-7");
        assert_eq!(pos_set_display(&set_of(&[2, 4, 5, 6, 7, 10])), "2 4-7 10");
    }

    #[test]
    fn displays_ret_and_any() {
        assert_eq!(pos_set_display(&set_of(&[-1])), "ret");
        assert_eq!(pos_set_display(&set_of(&[-1, 3])), "ret 3");
        assert_eq!(pos_set_display(&PosSet::Any), "any");
        assert_eq!(pos_set_display(&PosSet::default()), "");
    }

    #[test]
    fn digits_counts_decimal_width() {
        assert_eq!(digits(0), 1);
        assert_eq!(digits(9), 1);
        assert_eq!(digits(10), 2);
        assert_eq!(digits(12345), 5);
    }
}
