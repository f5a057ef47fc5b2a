//! Content-Addressed Object Store Abstraction
//!
//! Thin primitives over a remote Git-like object database: immutable blobs,
//! trees and commits named by their content hash, plus a mutable branch ref.
//! Adapters translate transport and status failures into typed
//! [`BridgeError`] variants and never retry on their own.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{BridgeError, Result};

/// Length of a hex-encoded SHA-1 object name.
pub const OBJECT_ID_LEN: usize = 40;

/// Content hash naming a blob, tree or commit.
///
/// Always 40 lowercase hexadecimal characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    pub fn parse(value: &str) -> Result<Self> {
        if value.len() != OBJECT_ID_LEN || !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(BridgeError::OperationFailed(format!(
                "Malformed object id: {:?}",
                value
            )));
        }
        Ok(Self(value.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines.
    pub fn short(&self) -> &str {
        &self.0[..7]
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectId {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ObjectId {
    type Error = BridgeError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

/// Opaque bearer credential supplied by the caller on every call.
///
/// The engine never stores or refreshes it; `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

impl From<String> for AccessToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for AccessToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// How blob content travels over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobEncoding {
    /// Text content sent as-is.
    Utf8,
    /// Binary content sent base64-encoded.
    Base64,
}

/// Kind of object referenced by a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
        }
    }
}

/// File mode of a tree entry. Only regular files are ever written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryMode {
    #[default]
    Regular,
}

impl EntryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryMode::Regular => "100644",
        }
    }
}

/// One entry of a tree-creation request.
///
/// `object_id == None` is the deletion sentinel: the path is removed from the
/// base tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub mode: EntryMode,
    pub kind: ObjectKind,
    pub object_id: Option<ObjectId>,
}

impl TreeEntry {
    pub fn blob(path: impl Into<String>, object_id: ObjectId) -> Self {
        Self {
            path: path.into(),
            mode: EntryMode::Regular,
            kind: ObjectKind::Blob,
            object_id: Some(object_id),
        }
    }

    pub fn deletion(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: EntryMode::Regular,
            kind: ObjectKind::Blob,
            object_id: None,
        }
    }

    pub fn is_deletion(&self) -> bool {
        self.object_id.is_none()
    }
}

/// One object reachable from a tree, as returned by a recursive listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeItem {
    pub path: String,
    pub kind: ObjectKind,
    pub object_id: ObjectId,
    pub size: Option<u64>,
}

/// Remote content-addressed object store.
///
/// Every call carries the caller's credential. Implementations map failures
/// to [`BridgeError::Unauthorized`], [`BridgeError::NotFound`],
/// [`BridgeError::RateLimited`], [`BridgeError::RemoteUnavailable`] or, for
/// [`ObjectStore::advance_ref`], [`BridgeError::Conflict`].
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `content` as a blob. Identical content yields the same id.
    async fn create_blob(
        &self,
        credential: &AccessToken,
        content: Bytes,
        encoding: BlobEncoding,
    ) -> Result<ObjectId>;

    /// Read the raw bytes of a blob.
    async fn read_blob(&self, credential: &AccessToken, blob_id: &ObjectId) -> Result<Bytes>;

    /// Resolve a branch name to the commit it points at.
    async fn read_ref(&self, credential: &AccessToken, branch: &str) -> Result<ObjectId>;

    /// Resolve a commit to its root tree.
    async fn read_commit_tree(
        &self,
        credential: &AccessToken,
        commit_id: &ObjectId,
    ) -> Result<ObjectId>;

    /// List every blob reachable from `tree_id`, with full paths.
    ///
    /// A listing the remote reports as truncated is an error.
    async fn list_tree(&self, credential: &AccessToken, tree_id: &ObjectId)
        -> Result<Vec<TreeItem>>;

    /// Create a tree by applying `entries` on top of `base_tree`.
    async fn create_tree(
        &self,
        credential: &AccessToken,
        entries: Vec<TreeEntry>,
        base_tree: &ObjectId,
    ) -> Result<ObjectId>;

    /// Create a commit object.
    async fn create_commit(
        &self,
        credential: &AccessToken,
        message: &str,
        tree_id: &ObjectId,
        parents: &[ObjectId],
    ) -> Result<ObjectId>;

    /// Move `branch` from `from` to `to`, only if it still points at `from`.
    async fn advance_ref(
        &self,
        credential: &AccessToken,
        branch: &str,
        from: &ObjectId,
        to: &ObjectId,
    ) -> Result<()>;
}
