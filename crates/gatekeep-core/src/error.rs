//! Error types for Gatekeep core

use thiserror::Error;

/// Why a remote call did not produce a payload.
///
/// This is the failure half of every remote call's outcome. It is returned,
/// never raised, so callers handle every endpoint the same way. `Display`
/// renders the human-readable failure message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// No mirror answered within its timeout
    #[error("endpoint unreachable")]
    Unreachable,

    /// The service answered with a negative error code
    #[error("{message}")]
    Application { code: String, message: String },

    /// A mirror answered with a non-success HTTP status
    #[error("server responded with HTTP {0}")]
    Status(u16),

    /// The request was malformed before it reached the network
    #[error("{0}")]
    Contract(String),
}

impl CallError {
    /// The raw error code, for application errors
    pub fn code(&self) -> Option<&str> {
        match self {
            CallError::Application { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Whether the failure happened below the application protocol
    pub fn is_transport(&self) -> bool {
        matches!(self, CallError::Unreachable | CallError::Status(_))
    }
}

/// Errors from controlling the task chain runner
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("a task chain is already running")]
    AlreadyRunning,

    #[error("task chain has no operations")]
    Empty,

    #[error("failed to spawn chain worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Errors that end a download
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("server did not declare a content length")]
    MissingContentLength,

    #[error("Server error: HTTP {0}")]
    Status(u16),

    #[error("body ended after {received} of {expected} bytes")]
    Truncated { received: u64, expected: u64 },

    #[error("download worker stopped unexpectedly: {0}")]
    Worker(String),
}

/// Errors that can occur in Gatekeep core
#[derive(Debug, Error)]
pub enum GatekeepError {
    #[error(transparent)]
    Call(#[from] CallError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("no mirrors configured")]
    NoMirrors,

    #[error("permission check failed: {0}")]
    PermissionDenied(String),
}

// Allow converting to String for front ends that only display messages
impl From<GatekeepError> for String {
    fn from(error: GatekeepError) -> Self {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_error_messages() {
        assert_eq!(CallError::Unreachable.to_string(), "endpoint unreachable");
        let app = CallError::Application {
            code: "-82021".into(),
            message: "Wrong user name or password".into(),
        };
        assert_eq!(app.to_string(), "Wrong user name or password");
        assert_eq!(app.code(), Some("-82021"));
        assert!(!app.is_transport());
        assert!(CallError::Status(502).is_transport());
    }
}
