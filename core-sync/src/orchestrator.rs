//! # Sync Orchestrator
//!
//! Drives one logical edit through the commit transaction:
//!
//! 1. Read the branch head (ref, then the commit's tree)
//! 2. Resolve the request into path operations, listing the tree if needed
//! 3. Upload one blob per write, bounded and fail-fast
//! 4. Compose and create the new tree on top of the head tree
//! 5. Create a single-parent commit
//! 6. Advance the branch, conditional on it still pointing at the head
//!
//! Nothing becomes visible on the branch until step 6 succeeds. Objects
//! written by a failed transaction stay unreachable. There is no retry here;
//! see [`crate::retry`].

use crate::composer::TreeComposer;
use crate::error::{Result, SyncError};
use crate::forge::{CommitForge, RefAdvancer};
use crate::resolver::{ChangeRequest, ChangeSetResolver};
use crate::transaction::{TransactionPhase, TransactionState};
use crate::types::{
    BranchHead, CommitReceipt, Transaction, TransactionId, TransactionOutcome, TreeSnapshot,
};
use bridge_traits::object_store::{AccessToken, ObjectId, ObjectStore};
use bridge_traits::time::{Clock, SystemClock};
use bytes::Bytes;
use core_runtime::config::{
    ContentLayout, EngineConfig, DEFAULT_UPLOAD_CONCURRENCY, MAX_UPLOAD_CONCURRENCY,
};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use core_runtime::logging::strip_path;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub struct SyncOrchestrator {
    store: Arc<dyn ObjectStore>,
    resolver: ChangeSetResolver,
    branch: String,
    upload_concurrency: usize,
    event_bus: Option<EventBus>,
    clock: Arc<dyn Clock>,
}

impl SyncOrchestrator {
    pub fn new(store: Arc<dyn ObjectStore>, layout: ContentLayout, branch: impl Into<String>) -> Self {
        Self {
            store,
            resolver: ChangeSetResolver::new(layout),
            branch: branch.into(),
            upload_concurrency: DEFAULT_UPLOAD_CONCURRENCY,
            event_bus: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn from_config(store: Arc<dyn ObjectStore>, config: &EngineConfig) -> Self {
        Self::new(store, config.layout.clone(), config.repository.branch.clone())
            .with_upload_concurrency(config.upload_concurrency)
    }

    /// Bound on parallel blob uploads, clamped to `1..=16`.
    pub fn with_upload_concurrency(mut self, concurrency: usize) -> Self {
        self.upload_concurrency = concurrency.clamp(1, MAX_UPLOAD_CONCURRENCY);
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn resolver(&self) -> &ChangeSetResolver {
        &self.resolver
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn upload_concurrency(&self) -> usize {
        self.upload_concurrency
    }

    /// Run `request` as one atomic commit on the branch.
    #[instrument(skip(self, credential, request), fields(branch = %self.branch, kind = request.kind()))]
    pub async fn execute(
        &self,
        credential: &AccessToken,
        request: &ChangeRequest,
    ) -> Result<TransactionOutcome> {
        let mut state = TransactionState::new(TransactionId::new(), self.clock.now());
        let transaction_id = state.id();
        info!(transaction_id = %transaction_id, "Starting transaction");

        self.emit(SyncEvent::Started {
            transaction_id: transaction_id.to_string(),
            branch: self.branch.clone(),
        });

        match self.run(&mut state, credential, request).await {
            Ok(outcome) => {
                let duration_ms = state.duration_ms().unwrap_or_default();
                match &outcome {
                    TransactionOutcome::Committed(receipt) => {
                        info!(
                            transaction_id = %transaction_id,
                            commit = %receipt.commit_id,
                            paths = receipt.applied_paths.len(),
                            duration_ms,
                            "Transaction committed"
                        );
                        self.emit(SyncEvent::Completed {
                            transaction_id: transaction_id.to_string(),
                            commit_id: receipt.commit_id.to_string(),
                            paths_changed: receipt.applied_paths.len() as u64,
                            duration_ms,
                        });
                    }
                    TransactionOutcome::NothingToDo => {
                        info!(transaction_id = %transaction_id, "Nothing to commit");
                        self.emit(SyncEvent::NothingToDo {
                            transaction_id: transaction_id.to_string(),
                        });
                    }
                }
                Ok(outcome)
            }
            Err(err) => {
                let phase = state.phase();
                if let Err(transition) = state.fail(err.to_string(), self.clock.now()) {
                    debug!(error = %transition, "Transaction already terminal");
                }

                if err.is_retryable() {
                    warn!(transaction_id = %transaction_id, phase = %phase, error = %err, "Transaction lost branch race");
                } else {
                    error!(transaction_id = %transaction_id, phase = %phase, error = %err, "Transaction failed");
                }
                if phase.has_written_objects() {
                    debug!("Objects written by this transaction stay unreachable");
                }

                self.emit(SyncEvent::Failed {
                    transaction_id: transaction_id.to_string(),
                    phase: phase.as_str().to_string(),
                    message: err.to_string(),
                    retryable: err.is_retryable(),
                });
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        state: &mut TransactionState,
        credential: &AccessToken,
        request: &ChangeRequest,
    ) -> Result<TransactionOutcome> {
        // Phase 1: Read branch head
        self.enter(state, TransactionPhase::ReadingHead)?;
        info!("Phase 1: Reading head of {}", self.branch);
        let head = self.read_head(credential).await?;

        // Phase 2: Resolve changes
        self.enter(state, TransactionPhase::ResolvingChanges)?;
        info!("Phase 2: Resolving {} request", request.kind());
        let snapshot = if request.needs_tree_listing() {
            let items = self.store.list_tree(credential, &head.tree_id).await?;
            let snapshot = TreeSnapshot::from_items(items);
            debug!(files = snapshot.len(), "Listed base tree");
            Some(snapshot)
        } else {
            None
        };

        let change_set = self.resolver.resolve(request, snapshot.as_ref())?;
        if change_set.is_empty() {
            state.advance(TransactionPhase::Done, self.clock.now())?;
            return Ok(TransactionOutcome::NothingToDo);
        }
        let transaction = Transaction::new(state.id(), change_set)?;

        // Phase 3: Upload blobs
        self.enter(state, TransactionPhase::UploadingBlobs)?;
        let blob_ids = self.upload_blobs(credential, &transaction).await?;

        // Phase 4: Compose tree
        self.enter(state, TransactionPhase::ComposingTree)?;
        info!(
            "Phase 4: Composing tree with {} entries on {}",
            transaction.operations.len(),
            head.tree_id.short()
        );
        let tree_request = TreeComposer::compose(
            &head.tree_id,
            &transaction.operations,
            &blob_ids,
            snapshot.as_ref(),
        )?;
        let tree_id = self
            .store
            .create_tree(credential, tree_request.entries, &tree_request.base_tree)
            .await?;

        // Phase 5: Forge commit
        self.enter(state, TransactionPhase::ForgingCommit)?;
        info!("Phase 5: Forging commit on {}", head.commit_id.short());
        let commit_id = CommitForge::new(Arc::clone(&self.store))
            .forge(credential, &transaction.message, &tree_id, &head.commit_id)
            .await?;

        // Phase 6: Advance ref
        self.enter(state, TransactionPhase::AdvancingRef)?;
        info!("Phase 6: Advancing {} to {}", self.branch, commit_id.short());
        RefAdvancer::new(Arc::clone(&self.store), self.branch.clone())
            .advance(credential, &head.commit_id, &commit_id)
            .await?;

        state.advance(TransactionPhase::Done, self.clock.now())?;

        Ok(TransactionOutcome::Committed(CommitReceipt {
            transaction_id: transaction.id,
            commit_id,
            tree_id,
            parent_commit_id: head.commit_id,
            applied_paths: transaction.paths(),
        }))
    }

    /// Read the current branch tip. Never cached.
    pub async fn read_head(&self, credential: &AccessToken) -> Result<BranchHead> {
        let commit_id = self.store.read_ref(credential, &self.branch).await?;
        let tree_id = self.store.read_commit_tree(credential, &commit_id).await?;
        debug!(commit = %commit_id.short(), tree = %tree_id.short(), "Read branch head");
        Ok(BranchHead { commit_id, tree_id })
    }

    /// Contents of `path` at the current branch head, if the file exists.
    #[instrument(skip(self, credential))]
    pub async fn read_file(&self, credential: &AccessToken, path: &str) -> Result<Option<Bytes>> {
        let head = self.read_head(credential).await?;
        let snapshot = TreeSnapshot::from_items(self.store.list_tree(credential, &head.tree_id).await?);

        match snapshot.object_id(path) {
            Some(blob_id) => Ok(Some(self.store.read_blob(credential, blob_id).await?)),
            None => {
                debug!("File not present on branch");
                Ok(None)
            }
        }
    }

    /// Upload every write in parallel. The first failure cancels the rest.
    async fn upload_blobs(
        &self,
        credential: &AccessToken,
        transaction: &Transaction,
    ) -> Result<HashMap<String, ObjectId>> {
        let writes: Vec<_> = transaction
            .writes()
            .map(|(path, content, encoding)| (path.to_string(), content.clone(), encoding))
            .collect();
        let total = writes.len();
        info!(
            "Phase 3: Uploading {} blobs (concurrency {})",
            total, self.upload_concurrency
        );

        let mut uploads = stream::iter(writes)
            .map(|(path, content, encoding)| {
                let store = Arc::clone(&self.store);
                async move {
                    let result = store.create_blob(credential, content, encoding).await;
                    (path, result)
                }
            })
            .buffer_unordered(self.upload_concurrency);

        let mut blob_ids = HashMap::with_capacity(total);
        while let Some((path, result)) = uploads.next().await {
            match result {
                Ok(blob_id) => {
                    debug!(
                        file = %strip_path(&path),
                        blob = %blob_id.short(),
                        "Uploaded blob {}/{}",
                        blob_ids.len() + 1,
                        total
                    );
                    blob_ids.insert(path, blob_id);
                    self.emit(SyncEvent::Progress {
                        transaction_id: transaction.id.to_string(),
                        phase: TransactionPhase::UploadingBlobs.as_str().to_string(),
                        completed: blob_ids.len() as u64,
                        total: total as u64,
                    });
                }
                Err(cause) => {
                    return Err(SyncError::PartialUploadFailure {
                        path,
                        uploaded: blob_ids.len(),
                        total,
                        cause,
                    });
                }
            }
        }

        Ok(blob_ids)
    }

    fn enter(&self, state: &mut TransactionState, phase: TransactionPhase) -> Result<()> {
        state.advance(phase, self.clock.now())?;
        self.emit(SyncEvent::Progress {
            transaction_id: state.id().to_string(),
            phase: phase.as_str().to_string(),
            completed: 0,
            total: 0,
        });
        Ok(())
    }

    fn emit(&self, event: SyncEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Sync(event)).ok();
        }
    }
}
