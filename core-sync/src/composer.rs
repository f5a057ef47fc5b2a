//! Tree composition
//!
//! Turns a transaction's operations plus the ids of its uploaded blobs into
//! the entry list for a single tree-creation call on top of the head tree.
//! Pure: no remote calls happen here.

use crate::error::{Result, SyncError};
use crate::types::{OperationKind, PathOperation, TreeSnapshot};
use bridge_traits::object_store::{ObjectId, TreeEntry};
use std::collections::HashMap;

/// Reject paths the remote would interpret differently than intended.
pub fn validate_path(path: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(SyncError::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        })
    };

    if path.is_empty() {
        return invalid("path is empty");
    }
    if path.starts_with('/') {
        return invalid("path must be relative to the repository root");
    }
    if path.contains('\\') {
        return invalid("backslash is not a path separator");
    }
    for segment in path.split('/') {
        match segment {
            "" => return invalid("empty path segment"),
            "." | ".." => return invalid("relative segments are not allowed"),
            _ => {}
        }
    }
    Ok(())
}

/// Entries for one tree-creation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRequest {
    pub base_tree: ObjectId,
    pub entries: Vec<TreeEntry>,
}

pub struct TreeComposer;

impl TreeComposer {
    /// Build the tree request for `operations` applied to `base_tree`.
    ///
    /// Writes become blob entries with the uploaded id; deletes become
    /// deletion entries and must name a path present in `snapshot`.
    /// Entries come back sorted by path.
    pub fn compose(
        base_tree: &ObjectId,
        operations: &[PathOperation],
        blob_ids: &HashMap<String, ObjectId>,
        snapshot: Option<&TreeSnapshot>,
    ) -> Result<TreeRequest> {
        let mut entries = Vec::with_capacity(operations.len());

        for operation in operations {
            validate_path(&operation.path)?;

            let entry = match &operation.kind {
                OperationKind::Write { .. } => {
                    let blob_id =
                        blob_ids
                            .get(&operation.path)
                            .ok_or_else(|| SyncError::MissingBlob {
                                path: operation.path.clone(),
                            })?;
                    TreeEntry::blob(operation.path.clone(), blob_id.clone())
                }
                OperationKind::Delete => {
                    let present = snapshot.map(|s| s.contains(&operation.path));
                    match present {
                        Some(true) => TreeEntry::deletion(operation.path.clone()),
                        Some(false) => {
                            return Err(SyncError::InvalidPath {
                                path: operation.path.clone(),
                                reason: "cannot delete a path absent from the base tree"
                                    .to_string(),
                            })
                        }
                        None => {
                            return Err(SyncError::InvalidPath {
                                path: operation.path.clone(),
                                reason: "deletion requires a listing of the base tree"
                                    .to_string(),
                            })
                        }
                    }
                }
            };
            entries.push(entry);
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        if let Some(pair) = entries.windows(2).find(|pair| pair[0].path == pair[1].path) {
            return Err(SyncError::DuplicatePath {
                path: pair[0].path.clone(),
            });
        }

        Ok(TreeRequest {
            base_tree: base_tree.clone(),
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::object_store::{ObjectKind, TreeItem};
    use bytes::Bytes;

    fn oid(c: char) -> ObjectId {
        ObjectId::parse(&c.to_string().repeat(40)).unwrap()
    }

    fn snapshot(paths: &[&str]) -> TreeSnapshot {
        TreeSnapshot::from_items(
            paths
                .iter()
                .map(|path| TreeItem {
                    path: path.to_string(),
                    kind: ObjectKind::Blob,
                    object_id: oid('f'),
                    size: None,
                })
                .collect(),
        )
    }

    #[test]
    fn test_validate_path() {
        assert!(validate_path("content/blog/hello.md").is_ok());
        assert!(validate_path("blog.config.yaml").is_ok());

        for bad in [
            "",
            "/abs.md",
            "a//b.md",
            "a/b/",
            "./a.md",
            "a/../b.md",
            "..",
            "images\\a.png",
        ] {
            assert!(
                matches!(validate_path(bad), Err(SyncError::InvalidPath { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_compose_mixed_operations_sorted() {
        let operations = vec![
            PathOperation::write_text("content/blog/b.md", "b"),
            PathOperation::delete("content/blog/a.md"),
            PathOperation::write_binary("images/b/1.png", Bytes::from_static(b"png")),
        ];
        let blob_ids = HashMap::from([
            ("content/blog/b.md".to_string(), oid('1')),
            ("images/b/1.png".to_string(), oid('2')),
        ]);
        let base = oid('0');

        let request = TreeComposer::compose(
            &base,
            &operations,
            &blob_ids,
            Some(&snapshot(&["content/blog/a.md"])),
        )
        .unwrap();

        assert_eq!(request.base_tree, base);
        assert_eq!(
            request.entries,
            vec![
                TreeEntry::deletion("content/blog/a.md"),
                TreeEntry::blob("content/blog/b.md", oid('1')),
                TreeEntry::blob("images/b/1.png", oid('2')),
            ]
        );
    }

    #[test]
    fn test_compose_rejects_delete_of_absent_path() {
        let operations = vec![PathOperation::delete("content/blog/ghost.md")];
        let result = TreeComposer::compose(
            &oid('0'),
            &operations,
            &HashMap::new(),
            Some(&snapshot(&["content/blog/real.md"])),
        );
        assert!(matches!(result, Err(SyncError::InvalidPath { .. })));

        let result = TreeComposer::compose(&oid('0'), &operations, &HashMap::new(), None);
        assert!(matches!(result, Err(SyncError::InvalidPath { .. })));
    }

    #[test]
    fn test_compose_requires_uploaded_blob() {
        let operations = vec![PathOperation::write_text("content/blog/a.md", "a")];
        let result = TreeComposer::compose(&oid('0'), &operations, &HashMap::new(), None);
        assert!(matches!(result, Err(SyncError::MissingBlob { path }) if path == "content/blog/a.md"));
    }

    #[test]
    fn test_compose_rejects_duplicates() {
        let operations = vec![
            PathOperation::write_text("content/blog/a.md", "a"),
            PathOperation::write_text("content/blog/a.md", "b"),
        ];
        let blob_ids = HashMap::from([("content/blog/a.md".to_string(), oid('1'))]);
        let result = TreeComposer::compose(&oid('0'), &operations, &blob_ids, None);
        assert!(matches!(result, Err(SyncError::DuplicatePath { .. })));
    }
}
