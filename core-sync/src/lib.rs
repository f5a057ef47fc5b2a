//! # Content Sync Module
//!
//! Commits logical blog edits to a remote, content-addressed object store as
//! single atomic commits.
//!
//! ## Overview
//!
//! Each edit (publish a post, delete posts, save the site settings) becomes
//! one transaction:
//! - Read the branch head
//! - Resolve the edit into path writes and deletes
//! - Upload blobs, build one tree on top of the head tree, forge one commit
//! - Advance the branch only if nobody else moved it in the meantime
//!
//! A failure at any step leaves the branch untouched. A lost race surfaces as
//! [`SyncError::StaleBranch`]; re-running is the caller's decision.
//!
//! ## Components
//!
//! - **Resolver** (`resolver`): Logical edits to path operations
//! - **Front matter** (`frontmatter`): Post document rendering
//! - **Settings** (`settings`): Typed site configuration with validated setters
//! - **Composer** (`composer`): Path validation and tree entry composition
//! - **Forge** (`forge`): Commit creation and the conditional ref update
//! - **Transaction** (`transaction`): Phase state machine
//! - **Orchestrator** (`orchestrator`): Drives a transaction end to end
//! - **Retry** (`retry`): Caller-side retry for stale branches

pub mod composer;
pub mod error;
pub mod forge;
pub mod frontmatter;
pub mod orchestrator;
pub mod resolver;
pub mod retry;
pub mod settings;
pub mod transaction;
pub mod types;

pub use composer::{validate_path, TreeComposer, TreeRequest};
pub use error::{Result, SyncError};
pub use forge::{CommitForge, RefAdvancer};
pub use frontmatter::{render_post, PostFrontMatter};
pub use orchestrator::SyncOrchestrator;
pub use resolver::{
    AssetKind, ChangeRequest, ChangeSetResolver, ImageAttachment, PendingAsset, PostDraft,
    PostFormat, PreviousPost, SettingsDocument, SettingsUpdate,
};
pub use retry::{retry_stale_branch, RetryPolicy};
pub use settings::{
    CommentProvider, MoveDirection, SiteSettings, SocialLink, SocialPreset,
};
pub use transaction::{TransactionPhase, TransactionState};
pub use types::{
    BranchHead, ChangeSet, CommitReceipt, OperationKind, PathOperation, Slug, Transaction,
    TransactionId, TransactionOutcome, TreeSnapshot,
};
