//! Accumulated diagnostics.
//!
//! Reconciliation reports problems the way the host framework expects them:
//! as a list of error and warning entries rather than a single error value.
//! Fatal problems end the operation; per-item problems are collected while
//! the operation carries on.

use serde::Serialize;

use crate::error::ReconcileError;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// A single reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Stable classification code, e.g. `PARTIAL_APPLY`.
    pub code: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Diagnostic {
    pub fn error(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code: code.into(),
            summary: summary.into(),
            detail: None,
        }
    }

    pub fn warning(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code: code.into(),
            summary: summary.into(),
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl From<&ReconcileError> for Diagnostic {
    fn from(error: &ReconcileError) -> Self {
        let detail = match error {
            ReconcileError::Sequence { source, .. } | ReconcileError::Remote { source, .. } => {
                Some(if source.is_transient() {
                    "transient failure; re-running reconciliation may succeed".to_string()
                } else {
                    "permanent failure".to_string()
                })
            }
            _ => None,
        };
        Self {
            severity: Severity::Error,
            code: error.error_code().to_string(),
            summary: error.to_string(),
            detail,
        }
    }
}

/// An ordered list of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    /// Record an error without aborting the caller.
    pub fn push_error(&mut self, error: &ReconcileError) {
        self.0.push(Diagnostic::from(error));
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    /// Check whether any diagnostic carries `code`.
    pub fn contains_code(&self, code: &str) -> bool {
        self.0.iter().any(|d| d.code == code)
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl From<ReconcileError> for Diagnostics {
    fn from(error: ReconcileError) -> Self {
        Self(vec![Diagnostic::from(&error)])
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
