//! Connector error types
//!
//! Failures raised by the remote collaborator, with transient/permanent
//! classification. The engine never retries; the classification is surfaced
//! in diagnostics so callers can decide whether re-running makes sense.

use thiserror::Error;

/// Error that can occur while talking to the governance service.
#[derive(Debug, Error)]
pub enum ConnectorError {
    // Transport errors (usually transient)
    /// Failed to reach the governance service.
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    /// The service is temporarily unavailable.
    #[error("governance service unavailable: {message}")]
    ServiceUnavailable { message: String },

    // Listing errors
    /// A listing was cancelled by its consumer.
    #[error("listing cancelled")]
    Cancelled,

    /// A listing did not finish before its deadline.
    #[error("listing deadline of {deadline_ms}ms exceeded")]
    DeadlineExceeded { deadline_ms: u64 },

    // Remote state errors (permanent)
    /// The requested entity does not exist.
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// The service refused the request because of its own constraints.
    #[error("request rejected: {message}")]
    Rejected { message: String },

    /// The service answered with something the connector cannot interpret.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    // Configuration errors (permanent)
    /// Client settings are invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl ConnectorError {
    /// Check if this error is transient and re-running reconciliation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConnectorError::ConnectionFailed { .. }
                | ConnectorError::ServiceUnavailable { .. }
                | ConnectorError::DeadlineExceeded { .. }
        )
    }

    /// Check if this error reports a missing remote entity.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConnectorError::NotFound { .. })
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectorError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            ConnectorError::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
            ConnectorError::Cancelled => "CANCELLED",
            ConnectorError::DeadlineExceeded { .. } => "DEADLINE_EXCEEDED",
            ConnectorError::NotFound { .. } => "NOT_FOUND",
            ConnectorError::Rejected { .. } => "REJECTED",
            ConnectorError::InvalidResponse { .. } => "INVALID_RESPONSE",
            ConnectorError::InvalidConfiguration { .. } => "INVALID_CONFIG",
        }
    }

    // Convenience constructors

    /// Create a not-found error.
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        ConnectorError::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        ConnectorError::ConnectionFailed {
            message: message.into(),
        }
    }

    /// Create a rejected error.
    pub fn rejected(message: impl Into<String>) -> Self {
        ConnectorError::Rejected {
            message: message.into(),
        }
    }

    /// Create an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        ConnectorError::InvalidResponse {
            message: message.into(),
        }
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;
