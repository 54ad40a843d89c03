//! # Remote Store Errors

use thiserror::Error;

/// Result type for remote store operations
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Failures talking to the remote document store.
///
/// Every variant is a transport-class failure: the request did not
/// produce a usable answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("Invalid endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Remote error: {0}")]
    GraphQl(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid command name: {0}")]
    InvalidCommand(String),
}

impl RemoteError {
    /// Whether the remote answered at all
    pub fn is_response_error(&self) -> bool {
        matches!(
            self,
            RemoteError::Status { .. } | RemoteError::GraphQl(_) | RemoteError::NotFound(_)
        )
    }
}
