//! GitHub git database API request and response types
//!
//! See: https://docs.github.com/en/rest/git

use serde::{Deserialize, Serialize};

/// `GET /repos/{owner}/{repo}/git/ref/{ref}` response
#[derive(Debug, Deserialize)]
pub struct RefResponse {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub object: RefObject,
}

#[derive(Debug, Deserialize)]
pub struct RefObject {
    pub sha: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Any response where only the object name matters
#[derive(Debug, Deserialize)]
pub struct ShaResponse {
    pub sha: String,
}

/// `GET /repos/{owner}/{repo}/git/commits/{sha}` response
#[derive(Debug, Deserialize)]
pub struct CommitResponse {
    pub sha: String,
    pub tree: ShaResponse,
    #[serde(default)]
    pub parents: Vec<ShaResponse>,
}

/// `GET /repos/{owner}/{repo}/git/trees/{sha}?recursive=1` response
#[derive(Debug, Deserialize)]
pub struct TreeResponse {
    pub sha: String,
    pub tree: Vec<TreeResponseEntry>,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Deserialize)]
pub struct TreeResponseEntry {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: String,
    pub size: Option<u64>,
}

/// `GET /repos/{owner}/{repo}/git/blobs/{sha}` response
#[derive(Debug, Deserialize)]
pub struct BlobResponse {
    pub sha: String,
    pub content: String,
    pub encoding: String,
    pub size: Option<u64>,
}

/// `POST /repos/{owner}/{repo}/git/blobs` body
#[derive(Debug, Serialize)]
pub struct CreateBlobRequest<'a> {
    pub content: &'a str,
    /// `"utf-8"` or `"base64"`
    pub encoding: &'static str,
}

/// `POST /repos/{owner}/{repo}/git/trees` body
#[derive(Debug, Serialize)]
pub struct CreateTreeRequest {
    pub base_tree: String,
    pub tree: Vec<CreateTreeEntry>,
}

#[derive(Debug, Serialize)]
pub struct CreateTreeEntry {
    pub path: String,
    pub mode: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Serialized as `null` to delete the path from the base tree
    pub sha: Option<String>,
}

/// `POST /repos/{owner}/{repo}/git/commits` body
#[derive(Debug, Serialize)]
pub struct CreateCommitRequest<'a> {
    pub message: &'a str,
    pub tree: &'a str,
    pub parents: Vec<&'a str>,
}

/// `PATCH /repos/{owner}/{repo}/git/refs/{ref}` body
#[derive(Debug, Serialize)]
pub struct UpdateRefRequest<'a> {
    pub sha: &'a str,
    pub force: bool,
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    pub documentation_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deletion_entry_serializes_null_sha() {
        let entry = CreateTreeEntry {
            path: "content/blog/old.md".to_string(),
            mode: "100644",
            kind: "blob",
            sha: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["sha"], serde_json::Value::Null);
        assert_eq!(json["type"], "blob");
    }

    #[test]
    fn test_tree_response_defaults() {
        let json = r#"{"sha":"3b18e512dba79e4c8300dd08aeb37f8e728b8dad","tree":[]}"#;
        let response: TreeResponse = serde_json::from_str(json).unwrap();
        assert!(!response.truncated);
        assert!(response.tree.is_empty());
    }
}
