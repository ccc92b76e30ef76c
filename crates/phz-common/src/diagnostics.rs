//! Diagnostics - defect reports and the sink they funnel through.
//!
//! Every defect the analyzer finds becomes a `Diagnostic` appended to a
//! `DiagnosticSink` in encounter order. Diagnostics are never raised as
//! errors; analysis always continues after reporting one.

use serde::Serialize;
use std::fmt;

/// A single defect report, addressed by file path and 1-based line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Display path: `./…` when inside the working directory, absolute otherwise.
    pub path: String,
    /// 1-based line number from the AST.
    pub line: u32,
    /// Human-readable message.
    pub message: String,
}

impl Diagnostic {
    pub fn new(path: impl Into<String>, line: u32, message: impl Into<String>) -> Self {
        Diagnostic {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` line {}:\n{}", self.path, self.line, self.message)
    }
}

/// Ordered collection of diagnostics.
///
/// There is exactly one sink per analysis run; nested scopes share it, so the
/// "any error seen" bit propagates upward for free. Tests read the buffer
/// back directly instead of intercepting a stream.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a diagnostic. The single construction site for reports.
    pub fn error(&mut self, path: impl Into<String>, line: u32, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::new(path, line, message));
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_two_line_block() {
        let diag = Diagnostic::new("./src/app.php", 12, "Undefined variable `$x`");
        assert_eq!(
            diag.to_string(),
            "`./src/app.php` line 12:\nUndefined variable `$x`"
        );
    }

    #[test]
    fn sink_preserves_encounter_order() {
        let mut sink = DiagnosticSink::new();
        assert!(!sink.has_errors());
        sink.error("a.php", 1, "first");
        sink.error("b.php", 9, "second");
        let messages: Vec<_> = sink.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, ["first", "second"]);
        assert!(sink.has_errors());
    }
}
