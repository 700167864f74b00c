//! Error types for queue operations.

use std::time::Duration;
use thiserror::Error;

/// Error returned by every public [`QueueClient`](crate::QueueClient) operation.
///
/// Each operation either completes with its declared result or fails with
/// exactly one of these variants. Transport-specific error types never cross
/// this boundary; they are folded into [`QueueError::TransportFailure`].
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Invalid argument '{field}': {message}")]
    InvalidArgument { field: String, message: String },

    #[error("Transport failure ({provider}): {code} - {message}")]
    TransportFailure {
        provider: String,
        code: String,
        message: String,
        transient: bool,
    },

    #[error("Operation '{operation}' was cancelled")]
    Cancelled { operation: String },

    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("Operation '{operation}' attempted on a closed client")]
    Closed { operation: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

/// Flat classification of [`QueueError`] for callers that only need the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    TransportFailure,
    Cancelled,
    Timeout,
    Closed,
    Configuration,
}

impl QueueError {
    /// Get the stable kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::TransportFailure { .. } => ErrorKind::TransportFailure,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Closed { .. } => ErrorKind::Closed,
            Self::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// Check if the caller may reasonably retry the operation.
    ///
    /// The client itself never retries; this is advisory only.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::InvalidArgument { .. } => false,
            Self::TransportFailure { transient, .. } => *transient,
            Self::Cancelled { .. } => false,
            Self::Timeout { .. } => true,
            Self::Closed { .. } => false,
            Self::Configuration(_) => false,
        }
    }

    pub(crate) fn invalid_argument(error: ValidationError) -> Self {
        match error {
            ValidationError::Required { field } => Self::InvalidArgument {
                field,
                message: "must not be empty".to_string(),
            },
            ValidationError::InvalidFormat { field, message }
            | ValidationError::OutOfRange { field, message } => {
                Self::InvalidArgument { field, message }
            }
        }
    }
}

impl From<ValidationError> for QueueError {
    fn from(error: ValidationError) -> Self {
        Self::invalid_argument(error)
    }
}

impl From<TransportError> for QueueError {
    fn from(error: TransportError) -> Self {
        Self::TransportFailure {
            provider: error.provider,
            code: error.code,
            message: error.message,
            transient: error.transient,
        }
    }
}

/// Failure reported by a [`QueueTransport`](crate::QueueTransport).
///
/// Carries the provider's own error code and message so that the cause
/// survives normalisation into [`QueueError::TransportFailure`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{provider} transport error {code}: {message}")]
pub struct TransportError {
    pub provider: String,
    pub code: String,
    pub message: String,
    pub status: Option<u16>,
    pub transient: bool,
}

impl TransportError {
    /// Create a non-transient transport error
    pub fn new(
        provider: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            code: code.into(),
            message: message.into(),
            status: None,
            transient: false,
        }
    }

    /// Attach the HTTP status returned by the remote service
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Mark the error as transient
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration parsing failed: {message}")]
    Parsing { message: String },
}

/// Validation errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
