//! CLI arguments for the phz binary.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "phz", version, about = "A static analyzer for PHP")]
pub struct CliArgs {
    /// Exclude loaded files whose canonical path starts with this prefix
    /// from validation (their definitions are still collected).
    #[arg(long = "ignore-file-prefix", value_name = "PREFIX")]
    pub ignore_file_prefix: Vec<String>,

    /// Load a bootstrap file for its definitions only, before analysis.
    #[arg(long, value_name = "FILE")]
    pub preload: Option<PathBuf>,

    /// Print line count and the lists of checked and ignored files.
    #[arg(long)]
    pub statistics: bool,

    /// Render --statistics as JSON.
    #[arg(long, requires = "statistics")]
    pub json: bool,

    /// Suppress redeclaration diagnostics (the analyzer is analyzing its
    /// own source tree).
    #[arg(long = "self-check")]
    pub self_check: bool,

    /// Source files or directories to analyze (directories are searched
    /// for `*.php`).
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,
}
