//! Error types for the GitHub provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// GitHub provider errors
#[derive(Error, Debug)]
pub enum GitHubError {
    /// Credential missing, expired, or lacking repository access
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Primary or secondary rate limit hit
    #[error("Rate limit exceeded{}", retry_hint(.retry_after_seconds))]
    RateLimitExceeded { retry_after_seconds: Option<u64> },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Ref update refused because the branch moved
    #[error("Ref update rejected: {0}")]
    Conflict(String),

    /// 5xx from the API
    #[error("GitHub unavailable (status {status_code}): {message}")]
    ServerError { status_code: u16, message: String },

    /// Any other unexpected status
    #[error("GitHub API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Recursive listing exceeded the API's entry limit
    #[error("Tree listing for {tree_id} was truncated by the API")]
    TruncatedTree { tree_id: String },

    /// Content cannot be sent with the requested encoding
    #[error("Invalid blob content: {0}")]
    InvalidContent(String),

    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

fn retry_hint(retry_after_seconds: &Option<u64>) -> String {
    match retry_after_seconds {
        Some(secs) => format!(", retry after {} seconds", secs),
        None => String::new(),
    }
}

/// Result type for GitHub operations
pub type Result<T> = std::result::Result<T, GitHubError>;

impl From<GitHubError> for BridgeError {
    fn from(error: GitHubError) -> Self {
        match error {
            GitHubError::AuthenticationFailed(msg) => BridgeError::Unauthorized(msg),
            GitHubError::RateLimitExceeded {
                retry_after_seconds,
            } => BridgeError::RateLimited {
                retry_after_secs: retry_after_seconds,
            },
            GitHubError::NotFound { resource } => BridgeError::NotFound(resource),
            GitHubError::Conflict(msg) => BridgeError::Conflict(msg),
            GitHubError::ServerError {
                status_code,
                message,
            } => BridgeError::RemoteUnavailable(format!("status {}: {}", status_code, message)),
            GitHubError::BridgeError(e) => e,
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}
