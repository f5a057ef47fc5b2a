use bridge_traits::error::BridgeError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Invalid slug {slug:?}: {reason}")]
    InvalidSlug { slug: String, reason: String },

    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Path {path:?} appears more than once in the transaction")]
    DuplicatePath { path: String },

    #[error("Invalid post: {0}")]
    InvalidPost(String),

    #[error("Invalid setting `{field}`: {reason}")]
    InvalidSettings { field: String, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Credential rejected: {0}")]
    Unauthorized(String),

    #[error("Rate limited by remote (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// The branch moved between reading its head and advancing it.
    #[error("Branch {branch} moved away from {expected}; rebuild the transaction from the new head")]
    StaleBranch { branch: String, expected: String },

    /// A blob upload failed; the transaction was aborted before any tree was built.
    #[error("Upload of {path:?} failed after {uploaded}/{total} blobs: {cause}")]
    PartialUploadFailure {
        path: String,
        uploaded: usize,
        total: usize,
        #[source]
        cause: BridgeError,
    },

    #[error("No blob id recorded for written path {path:?}")]
    MissingBlob { path: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Remote error: {0}")]
    Remote(String),
}

impl SyncError {
    /// Whether re-running the whole transaction from a fresh head may succeed.
    ///
    /// Only a lost branch race qualifies; rate limits carry their own hint
    /// and everything else needs a human.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::StaleBranch { .. })
    }

    /// Retry-after hint reported by the remote, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SyncError::RateLimited {
                retry_after_secs: Some(secs),
            } => Some(Duration::from_secs(*secs)),
            SyncError::PartialUploadFailure {
                cause:
                    BridgeError::RateLimited {
                        retry_after_secs: Some(secs),
                    },
                ..
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }
}

impl From<BridgeError> for SyncError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Unauthorized(msg) => SyncError::Unauthorized(msg),
            BridgeError::NotFound(msg) => SyncError::NotFound(msg),
            BridgeError::RateLimited { retry_after_secs } => {
                SyncError::RateLimited { retry_after_secs }
            }
            BridgeError::RemoteUnavailable(msg) => SyncError::RemoteUnavailable(msg),
            other => SyncError::Remote(other.to_string()),
        }
    }
}

impl From<serde_yaml::Error> for SyncError {
    fn from(error: serde_yaml::Error) -> Self {
        SyncError::Serialization(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
