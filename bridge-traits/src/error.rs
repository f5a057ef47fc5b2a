use thiserror::Error;

/// Failures surfaced across the host bridge.
///
/// Remote adapters map their transport and status errors onto the typed
/// variants below so callers can classify a failure without knowing which
/// backend produced it.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Credential rejected: {0}")]
    Unauthorized(String),

    #[error("Remote object not found: {0}")]
    NotFound(String),

    #[error("Rate limited by remote{}", retry_hint(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// A conditional update was refused because the remote moved.
    #[error("Conditional update rejected: {0}")]
    Conflict(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!(", retry after {}s", secs),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
