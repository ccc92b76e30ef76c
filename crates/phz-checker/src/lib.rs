//! The phz analysis engine.
//!
//! Ties the passes together: the loader discovers and registers symbols
//! across all input files (following static includes), the class resolver
//! flattens every user-defined class, function signatures are built, and
//! the validator walks each file consulting the expression typer. All
//! defects land in one ordered diagnostic list; analysis never aborts on
//! them.

pub mod args;
pub mod classes;
pub mod context;
pub mod exprs;
pub mod loader;
pub mod prescan;
pub mod signature;
pub mod stmts;

pub use context::{Checker, Scope};

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use phz_common::{CheckerOptions, Diagnostic};
use phz_reflect::FileId;

/// Outcome of one analysis run.
#[derive(Debug)]
pub struct AnalysisResult {
    pub diagnostics: Vec<Diagnostic>,
    /// Display paths of the files that were validated.
    pub files_checked: Vec<String>,
    /// Display paths of files loaded but excluded from validation.
    pub files_ignored: Vec<String>,
    /// Total source lines across validated files.
    pub total_lines: u64,
}

impl AnalysisResult {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Front door: load, resolve, validate.
pub struct Analyzer {
    checker: Checker,
}

impl Analyzer {
    pub fn new(options: CheckerOptions) -> Self {
        Analyzer {
            checker: Checker::new(options),
        }
    }

    /// Load a bootstrap file for its definitions only: diagnostics are
    /// discarded and nothing loaded here is validated.
    pub fn preload(&mut self, path: &Path) -> Result<(), String> {
        let parked = std::mem::take(&mut self.checker.sink);
        let before = self.checker.registry.file_count();
        let outcome = self.checker.load_file(path);
        let after = self.checker.registry.file_count();
        for index in before..after {
            self.checker.skip_validation.insert(FileId(index as u32));
        }
        self.checker.sink = parked;
        outcome.map(|_| ())
    }

    /// Analyze a set of files. `ignore_prefixes` excludes loaded files whose
    /// canonical path starts with a given prefix from validation (their
    /// definitions still count).
    pub fn analyze(
        &mut self,
        paths: &[PathBuf],
        ignore_prefixes: &[String],
    ) -> Result<AnalysisResult, String> {
        for path in paths {
            self.checker.load_file(path)?;
        }
        self.checker.init_all_classes();
        self.checker.init_all_functions();

        let prefixes: Vec<String> = ignore_prefixes.iter().map(|p| collapse_prefix(p)).collect();
        let mut files_checked = Vec::new();
        let mut files_ignored = Vec::new();
        let mut total_lines: u64 = 0;
        let file_meta: Vec<(FileId, String, String, u32)> = self
            .checker
            .registry
            .files()
            .map(|(id, file)| {
                (
                    id,
                    file.path.display().to_string(),
                    file.pretty.clone(),
                    file.line_count,
                )
            })
            .collect();
        for (id, canonical, pretty, line_count) in file_meta {
            if self.checker.skip_validation.contains(&id) {
                files_ignored.push(pretty);
                continue;
            }
            if prefixes.iter().any(|prefix| canonical.starts_with(prefix)) {
                self.checker.skip_validation.insert(id);
                files_ignored.push(pretty);
                continue;
            }
            files_checked.push(pretty);
            total_lines += u64::from(line_count);
        }

        debug!(
            checked = files_checked.len(),
            ignored = files_ignored.len(),
            "validating"
        );
        self.checker.validate_all();

        Ok(AnalysisResult {
            diagnostics: self.checker.sink.iter().cloned().collect(),
            files_checked,
            files_ignored,
            total_lines,
        })
    }
}

/// Lexically collapse `.` and `..` segments of an ignore prefix; relative
/// prefixes are anchored at the working directory.
fn collapse_prefix(prefix: &str) -> String {
    let path = Path::new(prefix);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };
    let mut collapsed = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                collapsed.pop();
            }
            other => collapsed.push(other),
        }
    }
    collapsed.display().to_string()
}
