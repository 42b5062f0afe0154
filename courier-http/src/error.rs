//! Error taxonomy for orchestrated requests.

use crate::response::Response;
use std::sync::Arc;
use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Boxed error type accepted from transports.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the orchestration layer.
///
/// Clone-able by design: deduplicated callers share one settlement, so a
/// single failure has to reject every waiter.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Non-success HTTP status outside the configured ignore list.
    #[error("HTTP error, status = {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message drawn from the response body or status text.
        message: String,
    },

    /// The transport call did not settle within the configured timeout.
    #[error("{message}")]
    Timeout {
        /// Configured timeout status (504 by default).
        status: u16,
        /// Configured timeout message.
        message: String,
    },

    /// The request was cancelled through an abort controller.
    #[error("request aborted")]
    Aborted,

    /// Transport-level failure (connection refused, DNS, TLS, ...).
    #[error("network failure: {message}")]
    Network {
        /// Human-readable description of the failure.
        message: String,
        /// The original transport error.
        #[source]
        cause: Option<Arc<dyn std::error::Error + Send + Sync + 'static>>,
    },

    /// Raw-passthrough request rejected with the response itself.
    #[error("HTTP error, status = {}", .response.status())]
    RawResponse {
        /// The unprocessed response.
        response: Response,
    },

    /// A request interceptor failed during the merge phase.
    #[error("request interceptor failed: {0}")]
    Interceptor(String),

    /// The request URL could not be assembled.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Body (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(String),

    /// Cache store read or explicit clear failed.
    #[error("cache store error: {0}")]
    Cache(#[from] courier_cache::CacheError),
}

impl ClientError {
    /// Wrap a transport failure, preserving the original error as the cause.
    pub fn network(err: impl Into<BoxError>) -> Self {
        let cause: BoxError = err.into();
        Self::Network {
            message: cause.to_string(),
            cause: Some(Arc::from(cause)),
        }
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if this error came from cancellation rather than failure.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Get the HTTP status code carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::Timeout { status, .. } => Some(*status),
            Self::RawResponse { response } => Some(response.status().as_u16()),
            _ => None,
        }
    }

    /// The underlying transport error, when one was preserved.
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Network { cause, .. } => cause.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_preserves_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ClientError::network(io);

        assert!(err.cause().is_some());
        assert!(err.to_string().contains("refused"));
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn test_predicates() {
        let timeout = ClientError::Timeout {
            status: 504,
            message: "timeout".to_string(),
        };
        assert!(timeout.is_timeout());
        assert!(!timeout.is_aborted());
        assert_eq!(timeout.status_code(), Some(504));

        assert!(ClientError::Aborted.is_aborted());
    }

    #[test]
    fn test_clone_keeps_shared_cause() {
        let err = ClientError::network(std::io::Error::other("boom"));
        let cloned = err.clone();
        assert!(cloned.cause().is_some());
    }
}
