//! Value types shared by the resolver, composer and orchestrator.

use crate::error::{Result, SyncError};
use bridge_traits::object_store::{BlobEncoding, ObjectId, ObjectKind, TreeItem};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a commit transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| SyncError::Serialization(format!("invalid transaction id: {}", e)))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Post identifier: lowercase ASCII alphanumerics, `-` and `_`, starting with
/// an alphanumeric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = |reason: &str| SyncError::InvalidSlug {
            slug: value.to_string(),
            reason: reason.to_string(),
        };

        let mut chars = value.chars();
        match chars.next() {
            None => return Err(invalid("slug is empty")),
            Some(c) if !(c.is_ascii_lowercase() || c.is_ascii_digit()) => {
                return Err(invalid("must start with a lowercase letter or digit"))
            }
            Some(_) => {}
        }

        if let Some(c) =
            chars.find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '_'))
        {
            return Err(invalid(&format!("character {:?} is not allowed", c)));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Slug {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Slug {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

/// What a transaction does to a single path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    Write {
        content: Bytes,
        encoding: BlobEncoding,
    },
    Delete,
}

/// A write or delete of one repository-relative path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathOperation {
    pub path: String,
    pub kind: OperationKind,
}

impl PathOperation {
    pub fn write_text(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: OperationKind::Write {
                content: Bytes::from(content.into()),
                encoding: BlobEncoding::Utf8,
            },
        }
    }

    pub fn write_binary(path: impl Into<String>, content: Bytes) -> Self {
        Self {
            path: path.into(),
            kind: OperationKind::Write {
                content,
                encoding: BlobEncoding::Base64,
            },
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: OperationKind::Delete,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self.kind, OperationKind::Delete)
    }
}

/// Resolver output: the operations for one logical change and its message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    pub message: String,
    pub operations: Vec<PathOperation>,
}

impl ChangeSet {
    pub fn new(message: impl Into<String>, operations: Vec<PathOperation>) -> Self {
        Self {
            message: message.into(),
            operations,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// A validated change set bound to one commit attempt.
///
/// Every path is well formed and appears once.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    pub message: String,
    pub operations: Vec<PathOperation>,
}

impl Transaction {
    pub fn new(id: TransactionId, change_set: ChangeSet) -> Result<Self> {
        let mut seen = HashSet::with_capacity(change_set.operations.len());
        for operation in &change_set.operations {
            crate::composer::validate_path(&operation.path)?;
            if !seen.insert(operation.path.as_str()) {
                return Err(SyncError::DuplicatePath {
                    path: operation.path.clone(),
                });
            }
        }

        Ok(Self {
            id,
            message: change_set.message,
            operations: change_set.operations,
        })
    }

    pub fn writes(&self) -> impl Iterator<Item = (&str, &Bytes, BlobEncoding)> {
        self.operations.iter().filter_map(|op| match &op.kind {
            OperationKind::Write { content, encoding } => {
                Some((op.path.as_str(), content, *encoding))
            }
            OperationKind::Delete => None,
        })
    }

    pub fn paths(&self) -> Vec<String> {
        self.operations.iter().map(|op| op.path.clone()).collect()
    }
}

/// Branch tip captured at the start of a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchHead {
    pub commit_id: ObjectId,
    pub tree_id: ObjectId,
}

/// Flat view of every file reachable from a tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSnapshot {
    files: BTreeMap<String, ObjectId>,
}

impl TreeSnapshot {
    pub fn from_items(items: Vec<TreeItem>) -> Self {
        let files = items
            .into_iter()
            .filter(|item| item.kind == ObjectKind::Blob)
            .map(|item| (item.path, item.object_id))
            .collect();
        Self { files }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn object_id(&self, path: &str) -> Option<&ObjectId> {
        self.files.get(path)
    }

    /// Exact path as stored, matched ignoring ASCII case
    pub fn find_ignore_case(&self, path: &str) -> Option<&str> {
        if let Some((stored, _)) = self.files.get_key_value(path) {
            return Some(stored.as_str());
        }
        self.files
            .keys()
            .find(|candidate| candidate.eq_ignore_ascii_case(path))
            .map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Identifiers produced by a committed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub transaction_id: TransactionId,
    pub commit_id: ObjectId,
    pub tree_id: ObjectId,
    pub parent_commit_id: ObjectId,
    pub applied_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    Committed(CommitReceipt),
    /// The request resolved to zero operations; no remote writes happened.
    NothingToDo,
}

impl TransactionOutcome {
    pub fn commit_id(&self) -> Option<&ObjectId> {
        match self {
            TransactionOutcome::Committed(receipt) => Some(&receipt.commit_id),
            TransactionOutcome::NothingToDo => None,
        }
    }

    pub fn receipt(&self) -> Option<&CommitReceipt> {
        match self {
            TransactionOutcome::Committed(receipt) => Some(receipt),
            TransactionOutcome::NothingToDo => None,
        }
    }
}
