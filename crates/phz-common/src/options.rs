//! Analyzer options.
//!
//! This module lives in phz-common so that the loader, resolver and
//! validator can all reference `CheckerOptions` without a circular
//! dependency.

use serde::{Deserialize, Serialize};

/// Analyzer-wide behavior switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerOptions {
    /// Self-check mode: the analyzer is analyzing its own source tree and
    /// redeclaration diagnostics are suppressed.
    pub self_check: bool,
    /// Keep validating the remaining members of a union type node after the
    /// first member has already been reported.
    pub validate_union_after_error: bool,
}

impl Default for CheckerOptions {
    fn default() -> Self {
        CheckerOptions {
            self_check: false,
            validate_union_after_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = CheckerOptions::default();
        assert!(!opts.self_check);
        assert!(opts.validate_union_after_error);
    }

    #[test]
    fn serde_round_trip() {
        let opts = CheckerOptions {
            self_check: true,
            validate_union_after_error: false,
        };
        let json = serde_json::to_string(&opts).unwrap();
        let back: CheckerOptions = serde_json::from_str(&json).unwrap();
        assert!(back.self_check);
        assert!(!back.validate_union_after_error);
    }
}
