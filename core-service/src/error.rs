use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Sync error: {0}")]
    Sync(#[from] core_sync::SyncError),
}

impl CoreError {
    /// Whether the failed edit can be re-submitted as is
    pub fn is_stale_branch(&self) -> bool {
        matches!(
            self,
            CoreError::Sync(core_sync::SyncError::StaleBranch { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
