//! stepcheck - debug line-table quality checking for Go binaries.
//!
//! Given a compiled Go executable, this library verifies that for every
//! machine instruction the source line attributed by the DWARF line table
//! is a plausible successor of the line attributed to the previous
//! instruction: the kind of non-monotone line mapping that confuses a
//! single-step debugger shows up as a penalized mismatch.
//!
//! The core is a syntactic successor inference over the Go source of the
//! analyzed functions ([`successors`]); the driver pairs it with DWARF
//! line attributions and decoded instructions ([`exe`], [`check`]).
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use stepcheck::{analyze_executable, check};
//!
//! let analysis = analyze_executable(Path::new("./prog"), "main\\..*").unwrap();
//! let report = check::check_functions(&analysis.functions, &analysis.successors);
//! for m in &report.mismatches {
//!     println!("{}:{} -> {} (+{})", m.from.file, m.from.line, m.to, m.penalty);
//! }
//! ```

pub mod check;
pub mod cli;
pub mod diff;
pub mod error;
pub mod exe;
pub mod output;
pub mod successors;

pub use check::{CheckReport, Mismatch};
pub use error::StepcheckError;
pub use exe::{AsmInstruction, Executable, Function};
pub use successors::{accepted_file, pos_set_contains, Pos, PosSet, Successors};

use anyhow::Result;
use regex::Regex;
use std::path::Path;

/// An analyzed executable: the matched functions with their decoded,
/// line-attributed instructions, and the successor tables inferred from
/// their source files.
pub struct Analysis {
    pub successors: Successors,
    pub functions: Vec<Function>,
}

/// Open `exe_path`, collect the functions whose symbol name matches
/// `pattern`, and infer successor tables from every source file their
/// instructions reference.
///
/// Source files that are missing, synthesized (`<autogenerated>`) or not
/// Go are skipped; the analysis is best-effort and the tables may be
/// partial.
pub fn analyze_executable(exe_path: &Path, pattern: &str) -> Result<Analysis> {
    let pattern = Regex::new(pattern).map_err(StepcheckError::from)?;
    let exe = Executable::open(exe_path)?;
    let mut functions = exe.functions_matching(&pattern)?;

    let mut successors = Successors::new();
    for file in exe::all_files(&functions) {
        successors.analyze_file(&file, &mut functions);
    }

    Ok(Analysis {
        successors,
        functions,
    })
}
