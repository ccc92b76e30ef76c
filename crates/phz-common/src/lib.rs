//! Shared plumbing for the phz analyzer.
//!
//! This crate provides the pieces every other crate agrees on:
//! - `Diagnostic` - a single line-addressed defect report
//! - `DiagnosticSink` - the ordered collection diagnostics funnel through
//! - `CheckerOptions` - analyzer-wide behavior switches

pub mod diagnostics;
pub mod options;

pub use diagnostics::{Diagnostic, DiagnosticSink};
pub use options::CheckerOptions;
