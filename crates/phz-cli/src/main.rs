//! phz entry point.
//!
//! Parses arguments, discovers input files, drives the analyzer and prints
//! diagnostics in encounter order. Exit code 1 when any diagnostic was
//! emitted, 0 otherwise.

mod args;
mod fs;
mod stats;

use anyhow::{Context, Result};
use clap::Parser;

use phz_checker::Analyzer;
use phz_common::CheckerOptions;

use crate::args::CliArgs;

const EXIT_CLEAN: i32 = 0;
const EXIT_DIAGNOSTICS: i32 = 1;

fn main() -> Result<()> {
    // RUST_LOG=phz=debug lights up the walker; default is warnings only.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let files = fs::discover_php_files(&args.paths)?;
    if files.is_empty() {
        anyhow::bail!("no PHP files found in the given paths");
    }

    let options = CheckerOptions {
        self_check: args.self_check,
        ..CheckerOptions::default()
    };
    let mut analyzer = Analyzer::new(options);

    if let Some(preload) = &args.preload {
        analyzer
            .preload(preload)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("failed to preload `{}`", preload.display()))?;
    }

    let result = analyzer
        .analyze(&files, &args.ignore_file_prefix)
        .map_err(anyhow::Error::msg)?;

    for diagnostic in &result.diagnostics {
        println!("{diagnostic}");
    }

    if args.statistics {
        stats::print(&result, args.json)?;
    }

    if result.has_errors() {
        std::process::exit(EXIT_DIAGNOSTICS);
    }
    std::process::exit(EXIT_CLEAN);
}
