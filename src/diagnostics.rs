//! Lint findings.
//!
//! Every check in the crate reports through [`Diagnostic`] so the CLI can
//! render table, JSON and summary output from one shape.

use std::{fmt, path::PathBuf};

use serde::Serialize;

/// How bad a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Suspicious but syntactically valid.
    Warning,
    /// Broken syntax or an unresolvable reference.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A single lint finding.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// Finding severity.
    pub severity: Severity,
    /// File the finding refers to.
    pub path: PathBuf,
    /// One-based line number, when the finding is tied to a line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Stable check identifier, e.g. `manifest/syntax` or `toc/missing`.
    pub code: &'static str,
    /// Human-readable description.
    pub message: String,
}

impl Diagnostic {
    /// Creates an error-severity finding.
    #[must_use]
    pub fn error(path: PathBuf, code: &'static str, message: String) -> Self {
        Self {
            severity: Severity::Error,
            path,
            line: None,
            code,
            message,
        }
    }

    /// Creates a warning-severity finding.
    #[must_use]
    pub fn warning(path: PathBuf, code: &'static str, message: String) -> Self {
        Self {
            severity: Severity::Warning,
            path,
            line: None,
            code,
            message,
        }
    }

    /// Attaches a one-based line number.
    #[must_use]
    pub const fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.path.display())?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }
        write!(f, ": {} [{}]: {}", self.severity, self.code, self.message)
    }
}

/// Counts findings of error severity.
#[must_use]
pub fn error_count(diagnostics: &[Diagnostic]) -> usize {
    diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count()
}

/// Counts findings of warning severity.
#[must_use]
pub fn warning_count(diagnostics: &[Diagnostic]) -> usize {
    diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .count()
}
