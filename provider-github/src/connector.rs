//! GitHub git database API connector
//!
//! Implements the `ObjectStore` trait on top of the REST v3 "git data"
//! endpoints. Every call is a single HTTP request (two for `advance_ref`);
//! retries are the caller's business.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::object_store::{
    AccessToken, BlobEncoding, ObjectId, ObjectKind, ObjectStore, TreeEntry, TreeItem,
};
use bridge_traits::time::{Clock, SystemClock};
use bytes::Bytes;
use core_runtime::config::{EngineConfig, DEFAULT_API_BASE_URL};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::GitHubError;
use crate::types::{
    BlobResponse, CommitResponse, CreateBlobRequest, CreateCommitRequest, CreateTreeEntry,
    CreateTreeRequest, ErrorResponse, RefResponse, ShaResponse, TreeResponse, UpdateRefRequest,
};

/// Media type recommended by the REST API
const ACCEPT: &str = "application/vnd.github+json";

/// Pinned REST API version
const API_VERSION: &str = "2022-11-28";

/// GitHub object store connector
///
/// Holds no credential: the caller's [`AccessToken`] travels with every call.
///
/// # Example
///
/// ```ignore
/// use provider_github::GitHubObjectStore;
/// use bridge_traits::{AccessToken, ObjectStore};
///
/// let store = GitHubObjectStore::new(http_client, "mahiro", "blog");
/// let head = store.read_ref(&AccessToken::new(token), "main").await?;
/// ```
pub struct GitHubObjectStore {
    http_client: Arc<dyn HttpClient>,
    api_base: String,
    owner: String,
    repo: String,
    request_timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl GitHubObjectStore {
    /// Create a connector for `owner/repo` on github.com
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            api_base: DEFAULT_API_BASE_URL.to_string(),
            owner: owner.into(),
            repo: repo.into(),
            request_timeout: Duration::from_secs(30),
            clock: Arc::new(SystemClock),
        }
    }

    /// Create a connector from a validated engine configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            Arc::clone(&config.http_client),
            config.repository.owner.clone(),
            config.repository.name.clone(),
        )
        .with_api_base(config.api_base_url.clone())
        .with_timeout(config.request_timeout)
    }

    /// Point at a GitHub Enterprise or test server
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Clock used to turn `x-ratelimit-reset` into a retry-after hint
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn git_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/git/{}",
            self.api_base,
            urlencoding::encode(&self.owner),
            urlencoding::encode(&self.repo),
            path
        )
    }

    /// Percent-encode each segment of a branch name, keeping `/` separators
    fn encode_branch(branch: &str) -> String {
        branch
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn request(&self, method: HttpMethod, url: String, credential: &AccessToken) -> HttpRequest {
        HttpRequest::new(method, url)
            .bearer_token(credential.secret())
            .header("Accept", ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
            .timeout(self.request_timeout)
    }

    /// Send a request and turn any non-2xx status into a typed error
    async fn send(&self, request: HttpRequest, resource: &str) -> crate::Result<HttpResponse> {
        let method = request.method;
        let response = self.http_client.execute(request).await?;

        if response.is_success() {
            debug!(?method, status = response.status, resource, "GitHub request succeeded");
            return Ok(response);
        }

        let error = self.classify(&response, resource);
        warn!(?method, status = response.status, resource, error = %error, "GitHub request failed");
        Err(error)
    }

    /// Map a failed response onto the provider error taxonomy
    fn classify(&self, response: &HttpResponse, resource: &str) -> GitHubError {
        let message = Self::error_message(response);

        match response.status {
            401 => GitHubError::AuthenticationFailed(message),
            403 | 429 if self.is_rate_limited(response, &message) => {
                GitHubError::RateLimitExceeded {
                    retry_after_seconds: self.retry_after(response),
                }
            }
            403 => GitHubError::AuthenticationFailed(message),
            404 => GitHubError::NotFound {
                resource: resource.to_string(),
            },
            status @ 500..=599 => GitHubError::ServerError {
                status_code: status,
                message,
            },
            status => GitHubError::ApiError {
                status_code: status,
                message,
            },
        }
    }

    fn is_rate_limited(&self, response: &HttpResponse, message: &str) -> bool {
        response.status == 429
            || response.header("x-ratelimit-remaining") == Some("0")
            || response.header("retry-after").is_some()
            || message.to_ascii_lowercase().contains("rate limit")
    }

    /// `retry-after` seconds, else seconds until `x-ratelimit-reset`
    fn retry_after(&self, response: &HttpResponse) -> Option<u64> {
        if let Some(secs) = response
            .header("retry-after")
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            return Some(secs);
        }

        response
            .header("x-ratelimit-reset")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(|reset| reset.saturating_sub(self.clock.unix_timestamp()).max(0) as u64)
    }

    fn error_message(response: &HttpResponse) -> String {
        serde_json::from_slice::<ErrorResponse>(&response.body)
            .map(|body| body.message)
            .unwrap_or_else(|_| String::from_utf8_lossy(&response.body).trim().to_string())
    }

    fn parse<T: DeserializeOwned>(response: &HttpResponse, what: &str) -> crate::Result<T> {
        serde_json::from_slice(&response.body)
            .map_err(|e| GitHubError::ParseError(format!("Failed to parse {}: {}", what, e)))
    }

    fn object_id(sha: &str) -> crate::Result<ObjectId> {
        ObjectId::parse(sha).map_err(|e| GitHubError::ParseError(e.to_string()))
    }

    fn decode_blob(blob: BlobResponse) -> crate::Result<Bytes> {
        match blob.encoding.as_str() {
            "base64" => {
                // The API wraps base64 content at 60 columns
                let compact: String = blob
                    .content
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                STANDARD.decode(compact).map(Bytes::from).map_err(|e| {
                    GitHubError::ParseError(format!("Invalid base64 in blob {}: {}", blob.sha, e))
                })
            }
            "utf-8" | "utf8" => Ok(Bytes::from(blob.content)),
            other => Err(GitHubError::ParseError(format!(
                "Unsupported blob encoding {:?} for {}",
                other, blob.sha
            ))),
        }
    }
}

#[async_trait]
impl ObjectStore for GitHubObjectStore {
    #[instrument(skip(self, credential, content), fields(bytes = content.len()))]
    async fn create_blob(
        &self,
        credential: &AccessToken,
        content: Bytes,
        encoding: BlobEncoding,
    ) -> Result<ObjectId> {
        let (payload, wire_encoding) = match encoding {
            BlobEncoding::Utf8 => {
                let text = std::str::from_utf8(&content)
                    .map_err(|e| GitHubError::InvalidContent(format!("not UTF-8: {}", e)))?;
                (text.to_string(), "utf-8")
            }
            BlobEncoding::Base64 => (STANDARD.encode(&content), "base64"),
        };

        let request = self
            .request(HttpMethod::Post, self.git_url("blobs"), credential)
            .json(&CreateBlobRequest {
                content: &payload,
                encoding: wire_encoding,
            })?;

        let response = self.send(request, "blob").await?;
        let created: ShaResponse = Self::parse(&response, "blob creation response")?;
        let id = Self::object_id(&created.sha)?;

        debug!(blob = %id.short(), "Blob created");
        Ok(id)
    }

    #[instrument(skip(self, credential, blob_id), fields(blob = %blob_id.short()))]
    async fn read_blob(&self, credential: &AccessToken, blob_id: &ObjectId) -> Result<Bytes> {
        let url = self.git_url(&format!("blobs/{}", blob_id));
        let response = self
            .send(
                self.request(HttpMethod::Get, url, credential),
                &format!("blob {}", blob_id),
            )
            .await?;

        let blob: BlobResponse = Self::parse(&response, "blob")?;
        Ok(Self::decode_blob(blob)?)
    }

    #[instrument(skip(self, credential))]
    async fn read_ref(&self, credential: &AccessToken, branch: &str) -> Result<ObjectId> {
        let url = self.git_url(&format!("ref/heads/{}", Self::encode_branch(branch)));
        let response = self
            .send(
                self.request(HttpMethod::Get, url, credential),
                &format!("branch {}", branch),
            )
            .await?;

        let reference: RefResponse = Self::parse(&response, "ref")?;
        if reference.object.kind != "commit" {
            return Err(GitHubError::ParseError(format!(
                "{} points at a {}, expected a commit",
                reference.ref_name, reference.object.kind
            ))
            .into());
        }

        let head = Self::object_id(&reference.object.sha)?;
        debug!(head = %head.short(), "Branch head read");
        Ok(head)
    }

    #[instrument(skip(self, credential, commit_id), fields(commit = %commit_id.short()))]
    async fn read_commit_tree(
        &self,
        credential: &AccessToken,
        commit_id: &ObjectId,
    ) -> Result<ObjectId> {
        let url = self.git_url(&format!("commits/{}", commit_id));
        let response = self
            .send(
                self.request(HttpMethod::Get, url, credential),
                &format!("commit {}", commit_id),
            )
            .await?;

        let commit: CommitResponse = Self::parse(&response, "commit")?;
        Ok(Self::object_id(&commit.tree.sha)?)
    }

    #[instrument(skip(self, credential, tree_id), fields(tree = %tree_id.short()))]
    async fn list_tree(
        &self,
        credential: &AccessToken,
        tree_id: &ObjectId,
    ) -> Result<Vec<TreeItem>> {
        let url = self.git_url(&format!("trees/{}?recursive=1", tree_id));
        let response = self
            .send(
                self.request(HttpMethod::Get, url, credential),
                &format!("tree {}", tree_id),
            )
            .await?;

        let tree: TreeResponse = Self::parse(&response, "tree")?;
        if tree.truncated {
            return Err(GitHubError::TruncatedTree {
                tree_id: tree.sha,
            }
            .into());
        }

        let mut items = Vec::with_capacity(tree.tree.len());
        for entry in tree.tree {
            // Sub-trees are implied by blob paths; submodules are not content
            if entry.kind != ObjectKind::Blob.as_str() {
                continue;
            }
            items.push(TreeItem {
                object_id: Self::object_id(&entry.sha)?,
                path: entry.path,
                kind: ObjectKind::Blob,
                size: entry.size,
            });
        }

        info!(entries = items.len(), "Tree listed");
        Ok(items)
    }

    #[instrument(skip(self, credential, entries, base_tree), fields(base = %base_tree.short(), entries = entries.len()))]
    async fn create_tree(
        &self,
        credential: &AccessToken,
        entries: Vec<TreeEntry>,
        base_tree: &ObjectId,
    ) -> Result<ObjectId> {
        let body = CreateTreeRequest {
            base_tree: base_tree.to_string(),
            tree: entries
                .into_iter()
                .map(|entry| CreateTreeEntry {
                    path: entry.path,
                    mode: entry.mode.as_str(),
                    kind: entry.kind.as_str(),
                    sha: entry.object_id.map(String::from),
                })
                .collect(),
        };

        let request = self
            .request(HttpMethod::Post, self.git_url("trees"), credential)
            .json(&body)?;
        let response = self.send(request, "tree").await?;
        let created: ShaResponse = Self::parse(&response, "tree creation response")?;
        let id = Self::object_id(&created.sha)?;

        info!(tree = %id.short(), "Tree created");
        Ok(id)
    }

    #[instrument(skip(self, credential, message, tree_id, parents), fields(tree = %tree_id.short()))]
    async fn create_commit(
        &self,
        credential: &AccessToken,
        message: &str,
        tree_id: &ObjectId,
        parents: &[ObjectId],
    ) -> Result<ObjectId> {
        let body = CreateCommitRequest {
            message,
            tree: tree_id.as_str(),
            parents: parents.iter().map(ObjectId::as_str).collect(),
        };

        let request = self
            .request(HttpMethod::Post, self.git_url("commits"), credential)
            .json(&body)?;
        let response = self.send(request, "commit").await?;
        let created: ShaResponse = Self::parse(&response, "commit creation response")?;
        let id = Self::object_id(&created.sha)?;

        info!(commit = %id.short(), "Commit created");
        Ok(id)
    }

    #[instrument(skip(self, credential, from, to), fields(from = %from.short(), to = %to.short()))]
    async fn advance_ref(
        &self,
        credential: &AccessToken,
        branch: &str,
        from: &ObjectId,
        to: &ObjectId,
    ) -> Result<()> {
        // The REST API has no compare-and-swap on refs: re-read first, then
        // rely on `force: false` to reject anything that is not a fast-forward.
        let current = self.read_ref(credential, branch).await?;
        if &current != from {
            warn!(expected = %from.short(), actual = %current.short(), "Branch moved");
            return Err(GitHubError::Conflict(format!(
                "branch {} is at {}, expected {}",
                branch, current, from
            ))
            .into());
        }

        let url = self.git_url(&format!("refs/heads/{}", Self::encode_branch(branch)));
        let request = self
            .request(HttpMethod::Patch, url, credential)
            .json(&UpdateRefRequest {
                sha: to.as_str(),
                force: false,
            })?;

        match self.send(request, &format!("branch {}", branch)).await {
            Ok(_) => {
                info!(branch, head = %to.short(), "Branch advanced");
                Ok(())
            }
            Err(GitHubError::ApiError {
                status_code: 409 | 422,
                message,
            }) => Err(GitHubError::Conflict(format!("branch {}: {}", branch, message)).into()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use chrono::{DateTime, TimeZone, Utc};
    use mockall::mock;
    use mockall::Sequence;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
        }
    }

    const HEAD: &str = "1111111111111111111111111111111111111111";
    const TREE: &str = "2222222222222222222222222222222222222222";
    const BLOB: &str = "3333333333333333333333333333333333333333";
    const NEW: &str = "4444444444444444444444444444444444444444";

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            Utc.timestamp_opt(self.0, 0).unwrap()
        }
    }

    fn respond(status: u16, body: &str) -> Result<HttpResponse> {
        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        })
    }

    fn respond_with_headers(
        status: u16,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Result<HttpResponse> {
        Ok(HttpResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: Bytes::from(body.to_string()),
        })
    }

    fn store(mock: MockHttpClient) -> GitHubObjectStore {
        GitHubObjectStore::new(Arc::new(mock), "mahiro", "blog")
    }

    fn id(sha: &str) -> ObjectId {
        ObjectId::parse(sha).unwrap()
    }

    fn token() -> AccessToken {
        AccessToken::new("ghp_test")
    }

    fn body_json(request: &HttpRequest) -> serde_json::Value {
        serde_json::from_slice(request.body.as_ref().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_read_ref_sends_headers() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.method, HttpMethod::Get);
            assert_eq!(
                req.url,
                "https://api.github.com/repos/mahiro/blog/git/ref/heads/main"
            );
            assert_eq!(
                req.headers.get("Authorization"),
                Some(&"Bearer ghp_test".to_string())
            );
            assert_eq!(req.headers.get("Accept"), Some(&ACCEPT.to_string()));
            assert_eq!(
                req.headers.get("X-GitHub-Api-Version"),
                Some(&API_VERSION.to_string())
            );
            respond(
                200,
                &format!(
                    r#"{{"ref":"refs/heads/main","object":{{"sha":"{}","type":"commit"}}}}"#,
                    HEAD
                ),
            )
        });

        let head = store(mock_http).read_ref(&token(), "main").await.unwrap();
        assert_eq!(head, id(HEAD));
    }

    #[tokio::test]
    async fn test_read_ref_encodes_branch_segments() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert!(req.url.ends_with("/git/ref/heads/drafts/hello%20world"));
            respond(404, r#"{"message":"Not Found"}"#)
        });

        let result = store(mock_http).read_ref(&token(), "drafts/hello world").await;
        assert!(matches!(result, Err(BridgeError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_read_commit_tree() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert!(req.url.ends_with(&format!("/git/commits/{}", HEAD)));
            respond(
                200,
                &format!(
                    r#"{{"sha":"{}","tree":{{"sha":"{}"}},"parents":[]}}"#,
                    HEAD, TREE
                ),
            )
        });

        let tree = store(mock_http)
            .read_commit_tree(&token(), &id(HEAD))
            .await
            .unwrap();
        assert_eq!(tree, id(TREE));
    }

    #[tokio::test]
    async fn test_create_blob_utf8_and_base64() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = Sequence::new();
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                assert_eq!(req.method, HttpMethod::Post);
                let body = body_json(&req);
                assert_eq!(body["encoding"], "utf-8");
                assert_eq!(body["content"], "# Hi");
                respond(201, &format!(r#"{{"sha":"{}","url":"x"}}"#, BLOB))
            });
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                let body = body_json(&req);
                assert_eq!(body["encoding"], "base64");
                assert_eq!(body["content"], "iVBORw==");
                respond(201, &format!(r#"{{"sha":"{}","url":"x"}}"#, NEW))
            });

        let store = store(mock_http);
        let text = store
            .create_blob(&token(), Bytes::from("# Hi"), BlobEncoding::Utf8)
            .await
            .unwrap();
        let image = store
            .create_blob(
                &token(),
                Bytes::from_static(&[0x89, 0x50, 0x4e, 0x47]),
                BlobEncoding::Base64,
            )
            .await
            .unwrap();

        assert_eq!(text, id(BLOB));
        assert_eq!(image, id(NEW));
    }

    #[tokio::test]
    async fn test_create_blob_rejects_invalid_utf8() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(0);

        let result = store(mock_http)
            .create_blob(&token(), Bytes::from_static(&[0xff, 0xfe]), BlobEncoding::Utf8)
            .await;
        assert!(matches!(result, Err(BridgeError::OperationFailed(_))));
    }

    #[tokio::test]
    async fn test_read_blob_decodes_wrapped_base64() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|_| {
            respond(
                200,
                &format!(
                    r#"{{"sha":"{}","content":"IyBI\naQ==\n","encoding":"base64","size":4}}"#,
                    BLOB
                ),
            )
        });

        let content = store(mock_http).read_blob(&token(), &id(BLOB)).await.unwrap();
        assert_eq!(&content[..], b"# Hi");
    }

    #[tokio::test]
    async fn test_list_tree_keeps_blobs_only() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert!(req.url.ends_with(&format!("/git/trees/{}?recursive=1", TREE)));
            respond(
                200,
                &format!(
                    r#"{{"sha":"{tree}","truncated":false,"tree":[
                        {{"path":"content","mode":"040000","type":"tree","sha":"{tree}"}},
                        {{"path":"content/blog/hello.md","mode":"100644","type":"blob","sha":"{blob}","size":12}},
                        {{"path":"themes/vendor","mode":"160000","type":"commit","sha":"{new}"}}
                    ]}}"#,
                    tree = TREE,
                    blob = BLOB,
                    new = NEW
                ),
            )
        });

        let items = store(mock_http).list_tree(&token(), &id(TREE)).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].path, "content/blog/hello.md");
        assert_eq!(items[0].object_id, id(BLOB));
        assert_eq!(items[0].size, Some(12));
    }

    #[tokio::test]
    async fn test_list_tree_truncated_is_error() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|_| {
            respond(
                200,
                &format!(r#"{{"sha":"{}","truncated":true,"tree":[]}}"#, TREE),
            )
        });

        let result = store(mock_http).list_tree(&token(), &id(TREE)).await;
        match result {
            Err(BridgeError::OperationFailed(msg)) => assert!(msg.contains("truncated")),
            other => panic!("expected truncation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_tree_sends_deletion_sentinel() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            let body = body_json(&req);
            assert_eq!(body["base_tree"], TREE);
            let tree = body["tree"].as_array().unwrap();
            assert_eq!(tree.len(), 2);
            assert_eq!(tree[0]["path"], "content/blog/new.md");
            assert_eq!(tree[0]["sha"], BLOB);
            assert_eq!(tree[0]["mode"], "100644");
            assert_eq!(tree[1]["path"], "content/blog/old.md");
            assert!(tree[1]["sha"].is_null());
            respond(201, &format!(r#"{{"sha":"{}"}}"#, NEW))
        });

        let entries = vec![
            TreeEntry::blob("content/blog/new.md", id(BLOB)),
            TreeEntry::deletion("content/blog/old.md"),
        ];
        let tree = store(mock_http)
            .create_tree(&token(), entries, &id(TREE))
            .await
            .unwrap();
        assert_eq!(tree, id(NEW));
    }

    #[tokio::test]
    async fn test_create_commit_single_parent() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            let body = body_json(&req);
            assert_eq!(body["message"], "publish post: hello");
            assert_eq!(body["tree"], TREE);
            assert_eq!(body["parents"], serde_json::json!([HEAD]));
            respond(201, &format!(r#"{{"sha":"{}"}}"#, NEW))
        });

        let commit = store(mock_http)
            .create_commit(&token(), "publish post: hello", &id(TREE), &[id(HEAD)])
            .await
            .unwrap();
        assert_eq!(commit, id(NEW));
    }

    #[tokio::test]
    async fn test_advance_ref_fast_forward() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = Sequence::new();
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                respond(
                    200,
                    &format!(
                        r#"{{"ref":"refs/heads/main","object":{{"sha":"{}","type":"commit"}}}}"#,
                        HEAD
                    ),
                )
            });
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                assert_eq!(req.method, HttpMethod::Patch);
                assert!(req.url.ends_with("/git/refs/heads/main"));
                let body = body_json(&req);
                assert_eq!(body["sha"], NEW);
                assert_eq!(body["force"], false);
                respond(200, "{}")
            });

        store(mock_http)
            .advance_ref(&token(), "main", &id(HEAD), &id(NEW))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_advance_ref_detects_moved_branch_before_update() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|_| {
            respond(
                200,
                &format!(
                    r#"{{"ref":"refs/heads/main","object":{{"sha":"{}","type":"commit"}}}}"#,
                    BLOB
                ),
            )
        });

        let result = store(mock_http)
            .advance_ref(&token(), "main", &id(HEAD), &id(NEW))
            .await;
        assert!(matches!(result, Err(BridgeError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_advance_ref_non_fast_forward_is_conflict() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = Sequence::new();
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                respond(
                    200,
                    &format!(
                        r#"{{"ref":"refs/heads/main","object":{{"sha":"{}","type":"commit"}}}}"#,
                        HEAD
                    ),
                )
            });
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| respond(422, r#"{"message":"Update is not a fast forward"}"#));

        let result = store(mock_http)
            .advance_ref(&token(), "main", &id(HEAD), &id(NEW))
            .await;
        match result {
            Err(BridgeError::Conflict(msg)) => assert!(msg.contains("not a fast forward")),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_classification() {
        let cases: Vec<(u16, Vec<(&'static str, &'static str)>, &'static str)> = vec![
            (401, vec![], r#"{"message":"Bad credentials"}"#),
            (403, vec![], r#"{"message":"Resource not accessible by integration"}"#),
            (429, vec![("Retry-After", "30")], r#"{"message":"slow down"}"#),
            (502, vec![], "Bad Gateway"),
            (400, vec![], r#"{"message":"Problems parsing JSON"}"#),
        ];

        let mut results = Vec::new();
        for (status, headers, body) in cases {
            let mut mock_http = MockHttpClient::new();
            mock_http
                .expect_execute()
                .times(1)
                .returning(move |_| respond_with_headers(status, &headers, body));
            results.push(store(mock_http).read_ref(&token(), "main").await);
        }

        assert!(matches!(results[0], Err(BridgeError::Unauthorized(_))));
        assert!(matches!(results[1], Err(BridgeError::Unauthorized(_))));
        assert!(matches!(
            results[2],
            Err(BridgeError::RateLimited {
                retry_after_secs: Some(30)
            })
        ));
        assert!(matches!(results[3], Err(BridgeError::RemoteUnavailable(_))));
        assert!(matches!(results[4], Err(BridgeError::OperationFailed(_))));
    }

    #[tokio::test]
    async fn test_primary_rate_limit_uses_reset_header() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|_| {
            respond_with_headers(
                403,
                &[
                    ("x-ratelimit-remaining", "0"),
                    ("x-ratelimit-reset", "1700000090"),
                ],
                r#"{"message":"API rate limit exceeded"}"#,
            )
        });

        let store = store(mock_http).with_clock(Arc::new(FixedClock(1_700_000_000)));
        let result = store.read_ref(&token(), "main").await;
        assert!(matches!(
            result,
            Err(BridgeError::RateLimited {
                retry_after_secs: Some(90)
            })
        ));
    }

    #[tokio::test]
    async fn test_transport_error_passes_through() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::RemoteUnavailable("Request timed out".into())));

        let result = store(mock_http).read_ref(&token(), "main").await;
        assert!(matches!(result, Err(BridgeError::RemoteUnavailable(_))));
    }

    #[test]
    fn test_enterprise_base_url() {
        let store = store(MockHttpClient::new()).with_api_base("https://ghe.example.com/api/v3/");
        assert_eq!(
            store.git_url("blobs"),
            "https://ghe.example.com/api/v3/repos/mahiro/blog/git/blobs"
        );
    }
}
