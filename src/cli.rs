//! Command-line interface definitions and parsing.
//!
//! Subcommands:
//! - `succ` - list the acceptable successors of every line of the matched
//!   functions
//! - `check` - verify the executable's line table against the inferred
//!   successors
//! - `cmp` - compare two tagged check runs

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "stepcheck")]
#[command(about = "Debug line-table quality checker for Go binaries")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Output as JSON (machine-readable)
    #[arg(long, global = true)]
    pub json: bool,

    /// Write output to file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// For each function matching the pattern, list all acceptable
    /// successors of each line
    #[command(alias = "successors")]
    Succ {
        /// Regular expression matched against function symbol names
        pattern: String,
        /// Executable with DWARF debug information (x86-64)
        executable: String,
    },

    /// Check all functions matching the pattern, reporting every line
    /// transition the successor tables do not allow
    Check {
        /// Regular expression matched against function symbol names
        pattern: String,
        /// Executable with DWARF debug information (x86-64)
        executable: String,
        /// Also write <TAG>.simple.txt and <TAG>.full.txt for later
        /// comparison with `cmp`
        #[arg(long)]
        tag: Option<String>,
    },

    /// Compare two simple reports produced by `check --tag`
    #[command(alias = "diff")]
    Cmp {
        /// Simple report of the baseline run
        old: String,
        /// Simple report of the new run
        new: String,
    },
}
