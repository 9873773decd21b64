//! Common error types for orgshare.

use std::fmt;

use thiserror::Error;

/// Remote service a failed API call was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Drive,
    YouTube,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Drive => write!(f, "Drive"),
            Service::YouTube => write!(f, "YouTube"),
        }
    }
}

/// Failure of a refresh-token grant.
///
/// Cloneable so every caller waiting on the same refresh receives the
/// identical failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshError {
    /// HTTP status of the token endpoint, when a response was received.
    pub status: Option<u16>,
    /// Response body or transport error description.
    pub message: String,
}

impl fmt::Display for RefreshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "Failed to refresh token: {} {}", status, self.message),
            None => write!(f, "Failed to refresh token: {}", self.message),
        }
    }
}

impl std::error::Error for RefreshError {}

fn render_status(status: &Option<u16>) -> String {
    status
        .map(|s| format!(" (status {})", s))
        .unwrap_or_default()
}

fn render_target(target: &Option<String>) -> String {
    target
        .as_ref()
        .map(|t| format!(" for {}", t))
        .unwrap_or_default()
}

/// Top-level error type for orgshare operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid credentials or settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Token refresh failed.
    #[error(transparent)]
    Refresh(#[from] RefreshError),

    /// Upload session initiation or binary transfer failed.
    #[error("Upload of '{filename}' into folder {folder_id} failed{}: {message}", render_status(.status))]
    Upload {
        status: Option<u16>,
        filename: String,
        folder_id: String,
        message: String,
    },

    /// Any other Drive or YouTube API call failed.
    #[error("{service} {operation} failed{}{}: {message}", render_target(.target), render_status(.status))]
    Api {
        service: Service,
        operation: &'static str,
        status: Option<u16>,
        target: Option<String>,
        message: String,
    },

    /// An authenticated client was built without a token.
    #[error("No authentication token provided")]
    NoToken,

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Refresh(e) => e.status,
            Error::Upload { status, .. } | Error::Api { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether the remote side answered with a 5xx status.
    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(500..=599))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_extraction() {
        let err = Error::Api {
            service: Service::Drive,
            operation: "delete_file",
            status: Some(404),
            target: Some("f1".to_string()),
            message: "File not found".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_server_error());

        let err = Error::Refresh(RefreshError {
            status: Some(503),
            message: "unavailable".to_string(),
        });
        assert_eq!(err.status(), Some(503));
        assert!(err.is_server_error());

        assert_eq!(Error::NoToken.status(), None);
    }

    #[test]
    fn test_display_includes_context() {
        let err = Error::Upload {
            status: Some(500),
            filename: "v.mp4".to_string(),
            folder_id: "folder-1".to_string(),
            message: "Failed to upload file".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("v.mp4"));
        assert!(text.contains("folder-1"));
        assert!(text.contains("500"));

        let err = Error::Api {
            service: Service::YouTube,
            operation: "create_playlist",
            status: None,
            target: None,
            message: "connection reset".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "YouTube create_playlist failed: connection reset"
        );
    }

    #[test]
    fn test_refresh_error_message() {
        let err = RefreshError {
            status: Some(400),
            message: "invalid_grant".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to refresh token: 400 invalid_grant");

        let err = RefreshError {
            status: None,
            message: "dns error".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to refresh token: dns error");
    }
}
