//! Crate-level error type
//!
//! Every failure a request can hit maps onto one variant, and every variant
//! knows its HTTP status.

use hyper::StatusCode;

use crate::credentials::CredentialError;
use crate::store::StoreError;

/// Errors surfaced by the gateway
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Missing or malformed credentials (startup only)
    #[error("Configuration error: {0}")]
    Configuration(#[from] CredentialError),

    /// The store connection was never established
    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),

    /// A single store call failed
    #[error("Store {operation} on '{collection}' failed: {source}")]
    StoreOperation {
        operation: &'static str,
        collection: String,
        #[source]
        source: StoreError,
    },

    /// Unreadable or malformed request body
    #[error("Invalid request: {0}")]
    ClientInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// HTTP status this error is reported with
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::ClientInput(_) => StatusCode::BAD_REQUEST,
            GatewayError::Configuration(_)
            | GatewayError::StoreOperation { .. }
            | GatewayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            GatewayError::StoreUnavailable("no credentials".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            GatewayError::ClientInput("bad json".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        let op = GatewayError::StoreOperation {
            operation: "add",
            collection: "formSubmissions".into(),
            source: StoreError::Transport("connection reset".into()),
        };
        assert_eq!(op.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(op.to_string().contains("formSubmissions"));
    }
}
