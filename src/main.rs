use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use stepcheck::cli::{Args, Command};
use stepcheck::{analyze_executable, check, diff, output};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Where report output goes: a `-o` file or stdout.
fn open_output(path: Option<&str>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("creating output file {}", path))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(std::io::stdout())),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Use RUST_LOG if set, otherwise fall back to the verbose flag.
    // Examples: RUST_LOG=debug, RUST_LOG=stepcheck::successors=trace
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if args.verbose {
        EnvFilter::new("stepcheck=debug")
    } else {
        EnvFilter::new("stepcheck=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    debug!("logging initialized (verbose={})", args.verbose);

    // Status info never goes to stdout.
    eprintln!("stepcheck v{}\n", env!("CARGO_PKG_VERSION"));

    let mut out = open_output(args.output.as_deref())?;

    match args.command {
        Command::Succ {
            pattern,
            executable,
        } => {
            let analysis = analyze_executable(Path::new(&executable), &pattern)?;
            for func in &analysis.functions {
                output::print_successors(&mut out, &analysis.successors, func)?;
            }
        }

        Command::Check {
            pattern,
            executable,
            tag,
        } => {
            let analysis = analyze_executable(Path::new(&executable), &pattern)?;
            let report = check::check_functions(&analysis.functions, &analysis.successors);

            if args.json {
                output::write_json(&mut out, &report)?;
            } else {
                output::print_mismatches(&mut out, &report)?;
            }

            if let Some(tag) = tag {
                let simple_path = format!("{}.simple.txt", tag);
                let full_path = format!("{}.full.txt", tag);
                let mut simple = File::create(&simple_path)
                    .with_context(|| format!("creating {}", simple_path))?;
                let mut full =
                    File::create(&full_path).with_context(|| format!("creating {}", full_path))?;
                output::write_simple_report(&mut simple, &report)?;
                output::write_full_report(&mut full, &report)?;
                eprintln!("wrote {} and {}", simple_path, full_path);
            }

            if report.penalty > 0 {
                drop(out);
                std::process::exit(1);
            }
        }

        Command::Cmp { old, new } => {
            let old = diff::read_run(Path::new(&old))?;
            let new = diff::read_run(Path::new(&new))?;
            let cmp = diff::compare_runs(&old, &new);
            diff::print_comparison(&mut out, &old, &new, &cmp)?;
        }
    }

    Ok(())
}
