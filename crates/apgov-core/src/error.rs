//! Error Types
//!
//! Domain errors shared by every apgov crate. Transport failures live in
//! `apgov-connector`; this enum only describes problems with declared or
//! observed state.
//!
//! # Example
//!
//! ```
//! use apgov_core::{ApgovError, Result};
//!
//! fn require_name(name: &str) -> Result<&str> {
//!     if name.is_empty() {
//!         return Err(ApgovError::validation("name", "must not be empty"));
//!     }
//!     Ok(name)
//! }
//!
//! assert!(require_name("").is_err());
//! ```

use serde::Serialize;
use thiserror::Error;

/// Standardized domain error type for apgov.
///
/// # Variants
///
/// - `NotFound` - The remote entity does not exist (treated as absence by callers)
/// - `ValidationError` - Declared state is malformed; no remote call may follow
/// - `ConsistencyViolation` - Remote state breaks an invariant the engine relies on
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApgovError {
    /// Requested remote entity was not found.
    #[error("{resource} not found{}", id.as_ref().map(|i| format!(": {i}")).unwrap_or_default())]
    NotFound {
        /// The kind of entity that was looked up (e.g., "AccessProvider")
        resource: String,
        /// Optional identifier of the entity
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// Declared input failed validation.
    #[error("Validation error on field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Description of the validation failure
        message: String,
    },

    /// Remote state violates an invariant (e.g. a unique lookup matched twice).
    ///
    /// Indicates corrupted remote state rather than bad input.
    #[error("Consistency violation: {message}")]
    ConsistencyViolation {
        /// Description of the broken invariant
        message: String,
    },
}

impl ApgovError {
    /// Create a validation error for a field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    /// Create a consistency violation.
    pub fn consistency(message: impl Into<String>) -> Self {
        Self::ConsistencyViolation {
            message: message.into(),
        }
    }

    /// Stable code for classification in diagnostics.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::ValidationError { .. } => "VALIDATION_ERROR",
            Self::ConsistencyViolation { .. } => "CONSISTENCY_VIOLATION",
        }
    }
}

/// Type alias for Results using `ApgovError`.
pub type Result<T> = std::result::Result<T, ApgovError>;
