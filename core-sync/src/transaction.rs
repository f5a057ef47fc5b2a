//! # Transaction State Machine
//!
//! Tracks a single commit transaction through its phases with validated
//! transitions.
//!
//! ## State Machine
//!
//! ```text
//! Idle → ReadingHead → ResolvingChanges → UploadingBlobs → ComposingTree
//!                             │                                  │
//!                             └──────→ Done ←── AdvancingRef ←── ForgingCommit
//!
//! any non-terminal state except Idle ──→ Failed
//! ```
//!
//! `ResolvingChanges → Done` is taken when the request resolves to nothing.

use crate::error::{Result, SyncError};
use crate::types::TransactionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Phase of a commit transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionPhase {
    Idle,
    ReadingHead,
    ResolvingChanges,
    UploadingBlobs,
    ComposingTree,
    ForgingCommit,
    AdvancingRef,
    Done,
    Failed,
}

impl TransactionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionPhase::Done | TransactionPhase::Failed)
    }

    /// Whether the remote may hold objects created by this transaction
    pub fn has_written_objects(&self) -> bool {
        matches!(
            self,
            TransactionPhase::UploadingBlobs
                | TransactionPhase::ComposingTree
                | TransactionPhase::ForgingCommit
                | TransactionPhase::AdvancingRef
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionPhase::Idle => "idle",
            TransactionPhase::ReadingHead => "reading_head",
            TransactionPhase::ResolvingChanges => "resolving_changes",
            TransactionPhase::UploadingBlobs => "uploading_blobs",
            TransactionPhase::ComposingTree => "composing_tree",
            TransactionPhase::ForgingCommit => "forging_commit",
            TransactionPhase::AdvancingRef => "advancing_ref",
            TransactionPhase::Done => "done",
            TransactionPhase::Failed => "failed",
        }
    }

    fn can_transition_to(&self, to: TransactionPhase) -> bool {
        use TransactionPhase::*;

        match (self, to) {
            (Idle, ReadingHead) => true,
            (ReadingHead, ResolvingChanges) => true,
            (ResolvingChanges, UploadingBlobs) => true,
            (ResolvingChanges, Done) => true,
            (UploadingBlobs, ComposingTree) => true,
            (ComposingTree, ForgingCommit) => true,
            (ForgingCommit, AdvancingRef) => true,
            (AdvancingRef, Done) => true,

            // Nothing has started in Idle, so there is nothing to fail
            (Idle, Failed) => false,
            (from, Failed) => !from.is_terminal(),

            _ => false,
        }
    }
}

impl FromStr for TransactionPhase {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "idle" => Ok(TransactionPhase::Idle),
            "reading_head" => Ok(TransactionPhase::ReadingHead),
            "resolving_changes" => Ok(TransactionPhase::ResolvingChanges),
            "uploading_blobs" => Ok(TransactionPhase::UploadingBlobs),
            "composing_tree" => Ok(TransactionPhase::ComposingTree),
            "forging_commit" => Ok(TransactionPhase::ForgingCommit),
            "advancing_ref" => Ok(TransactionPhase::AdvancingRef),
            "done" => Ok(TransactionPhase::Done),
            "failed" => Ok(TransactionPhase::Failed),
            other => Err(SyncError::Serialization(format!(
                "unknown transaction phase: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for TransactionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle record of one transaction
#[derive(Debug, Clone)]
pub struct TransactionState {
    id: TransactionId,
    phase: TransactionPhase,
    failure: Option<String>,
    /// Phase the transaction was in when it failed
    failed_in: Option<TransactionPhase>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl TransactionState {
    pub fn new(id: TransactionId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            phase: TransactionPhase::Idle,
            failure: None,
            failed_in: None,
            started_at: now,
            finished_at: None,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn phase(&self) -> TransactionPhase {
        self.phase
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn failed_in(&self) -> Option<TransactionPhase> {
        self.failed_in
    }

    pub fn advance(&mut self, to: TransactionPhase, now: DateTime<Utc>) -> Result<()> {
        if to == TransactionPhase::Failed {
            return Err(SyncError::InvalidStateTransition {
                from: self.phase.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: "use fail() to record a failure reason".to_string(),
            });
        }
        self.validate_transition(to)?;
        self.phase = to;
        if to.is_terminal() {
            self.finished_at = Some(now);
        }
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Result<()> {
        self.validate_transition(TransactionPhase::Failed)?;
        self.failed_in = Some(self.phase);
        self.phase = TransactionPhase::Failed;
        self.failure = Some(reason.into());
        self.finished_at = Some(now);
        Ok(())
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds().max(0) as u64)
    }

    fn validate_transition(&self, to: TransactionPhase) -> Result<()> {
        if !self.phase.can_transition_to(to) {
            return Err(SyncError::InvalidStateTransition {
                from: self.phase.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!(
                    "Cannot transition from {} to {}",
                    self.phase.as_str(),
                    to.as_str()
                ),
            });
        }
        Ok(())
    }
}
