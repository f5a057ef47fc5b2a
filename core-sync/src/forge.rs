//! Commit creation and the conditional branch update

use crate::error::{Result, SyncError};
use bridge_traits::error::BridgeError;
use bridge_traits::object_store::{AccessToken, ObjectId, ObjectStore};
use std::sync::Arc;
use tracing::{info, instrument};

/// Creates single-parent commits
pub struct CommitForge {
    store: Arc<dyn ObjectStore>,
}

impl CommitForge {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, credential, message, tree_id, parent), fields(tree = %tree_id.short(), parent = %parent.short()))]
    pub async fn forge(
        &self,
        credential: &AccessToken,
        message: &str,
        tree_id: &ObjectId,
        parent: &ObjectId,
    ) -> Result<ObjectId> {
        let commit_id = self
            .store
            .create_commit(credential, message, tree_id, std::slice::from_ref(parent))
            .await?;
        info!(commit = %commit_id.short(), "Created commit");
        Ok(commit_id)
    }
}

/// Moves a branch from the head a transaction started on to its new commit
pub struct RefAdvancer {
    store: Arc<dyn ObjectStore>,
    branch: String,
}

impl RefAdvancer {
    pub fn new(store: Arc<dyn ObjectStore>, branch: impl Into<String>) -> Self {
        Self {
            store,
            branch: branch.into(),
        }
    }

    /// Advance only if the branch still points at `expected`.
    ///
    /// A refused update surfaces as [`SyncError::StaleBranch`].
    #[instrument(skip(self, credential, expected, new), fields(branch = %self.branch, from = %expected.short(), to = %new.short()))]
    pub async fn advance(
        &self,
        credential: &AccessToken,
        expected: &ObjectId,
        new: &ObjectId,
    ) -> Result<()> {
        match self
            .store
            .advance_ref(credential, &self.branch, expected, new)
            .await
        {
            Ok(()) => {
                info!("Branch advanced");
                Ok(())
            }
            Err(BridgeError::Conflict(reason)) => {
                info!(reason = %reason, "Branch moved since the transaction started");
                Err(SyncError::StaleBranch {
                    branch: self.branch.clone(),
                    expected: expected.to_string(),
                })
            }
            Err(other) => Err(other.into()),
        }
    }
}
