//! Reconciliation error types.

use apgov_connector::ConnectorError;
use apgov_core::ApgovError;
use thiserror::Error;

/// Errors raised while reconciling declared state against the remote service.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Malformed declared state, a remote consistency violation, or absence.
    #[error(transparent)]
    Domain(#[from] ApgovError),

    /// A listing failed mid-stream. No partial result is trusted.
    #[error("listing {listing} failed: {source}")]
    Sequence {
        listing: &'static str,
        #[source]
        source: ConnectorError,
    },

    /// A remote call failed.
    #[error("{operation} failed: {source}")]
    Remote {
        operation: &'static str,
        #[source]
        source: ConnectorError,
    },

    /// Some what items could not be resolved; the rest were still applied.
    #[error("{failed} of {attempted} what items could not be resolved")]
    PartialApply { failed: usize, attempted: usize },

    /// Engine configuration could not be loaded.
    #[error("invalid configuration: {message}")]
    Configuration { message: String },
}

impl ReconcileError {
    /// Create a validation error for a declared field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Domain(ApgovError::validation(field, message))
    }

    /// Create a consistency violation.
    pub fn consistency(message: impl Into<String>) -> Self {
        Self::Domain(ApgovError::consistency(message))
    }

    /// Wrap a listing failure.
    pub fn sequence(listing: &'static str, source: ConnectorError) -> Self {
        Self::Sequence { listing, source }
    }

    /// Wrap a failed remote call.
    pub fn remote(operation: &'static str, source: ConnectorError) -> Self {
        Self::Remote { operation, source }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Domain(ApgovError::ValidationError { .. }))
    }

    pub fn is_consistency_violation(&self) -> bool {
        matches!(self, Self::Domain(ApgovError::ConsistencyViolation { .. }))
    }

    /// Check whether the underlying remote failure reports a missing entity.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Domain(ApgovError::NotFound { .. }) => true,
            Self::Sequence { source, .. } | Self::Remote { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Domain(inner) => inner.error_code(),
            Self::Sequence { .. } => "SEQUENCE_ERROR",
            Self::Remote { source, .. } => source.error_code(),
            Self::PartialApply { .. } => "PARTIAL_APPLY",
            Self::Configuration { .. } => "INVALID_CONFIG",
        }
    }
}

/// Result type for reconciliation steps.
pub type ReconcileResult<T> = Result<T, ReconcileError>;
