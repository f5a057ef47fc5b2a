//! # Engine Configuration Module
//!
//! Provides configuration management for the blog synchronization engine.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an
//! `EngineConfig` holding the target repository, the content layout inside it,
//! transaction tuning, and the HTTP client the remote adapter talks through.
//! Validation is fail-fast: `build()` refuses a configuration that could only
//! fail later at the first remote call.
//!
//! ## Required Settings
//!
//! - Repository owner and name
//!
//! ## Optional Settings (with defaults)
//!
//! - Branch (`main`)
//! - API base URL (`https://api.github.com`)
//! - [`ContentLayout`] (`content/blog`, `images`, `blog.config.yaml`, ...)
//! - Upload concurrency (4, allowed 1..=16)
//! - Request timeout (30 s)
//! - Stale-branch retry budget (3 attempts, 200 ms base backoff)
//! - `HttpClient` (desktop default: reqwest, behind `desktop-shims`)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::EngineConfig;
//!
//! let config = EngineConfig::builder()
//!     .repository("mahiro", "blog")
//!     .branch("main")
//!     .upload_concurrency(8)
//!     .build()?;
//! # Ok::<(), core_runtime::Error>(())
//! ```
//!
//! Without the `desktop-shims` feature an `HttpClient` must be injected:
//!
//! ```ignore
//! let config = EngineConfig::builder()
//!     .repository("mahiro", "blog")
//!     .http_client(Arc::new(MyHttpClient))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::HttpClient;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 4;
pub const MAX_UPLOAD_CONCURRENCY: usize = 16;

/// Where each kind of content lives inside the repository.
///
/// Paths are repository-root-relative with forward slashes and no leading or
/// trailing slash. Public paths are the URLs the built site serves the asset
/// under and are what gets written into the site configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLayout {
    /// Directory holding `{slug}.md` / `{slug}.mdx` posts
    pub blog_dir: String,
    /// Root of the per-post image directories (`{image_dir}/{slug}/...`)
    pub image_dir: String,
    /// URL prefix the site serves `image_dir` under
    pub image_public_prefix: String,
    /// YAML site configuration file
    pub config_path: String,
    pub favicon_path: String,
    pub favicon_public_path: String,
    pub avatar_path: String,
    pub avatar_public_path: String,
}

impl Default for ContentLayout {
    fn default() -> Self {
        Self {
            blog_dir: "content/blog".to_string(),
            image_dir: "images".to_string(),
            image_public_prefix: "/images".to_string(),
            config_path: "blog.config.yaml".to_string(),
            favicon_path: "public/favicon.ico".to_string(),
            favicon_public_path: "/favicon.ico".to_string(),
            avatar_path: "public/profile.png".to_string(),
            avatar_public_path: "/profile.png".to_string(),
        }
    }
}

impl ContentLayout {
    /// Validates that every repository path is relative and well-formed.
    pub fn validate(&self) -> Result<()> {
        let repo_paths = [
            ("blog_dir", &self.blog_dir),
            ("image_dir", &self.image_dir),
            ("config_path", &self.config_path),
            ("favicon_path", &self.favicon_path),
            ("avatar_path", &self.avatar_path),
        ];

        for (name, path) in repo_paths {
            if path.is_empty()
                || path.starts_with('/')
                || path.ends_with('/')
                || path.contains('\\')
                || path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
            {
                return Err(Error::InvalidLayout {
                    field: name,
                    reason: format!(
                        "must be a relative repository path without empty, '.' or '..' \
                         segments (got {:?})",
                        path
                    ),
                });
            }
        }

        let public_paths = [
            ("image_public_prefix", &self.image_public_prefix),
            ("favicon_public_path", &self.favicon_public_path),
            ("avatar_public_path", &self.avatar_public_path),
        ];

        for (name, path) in public_paths {
            if !path.starts_with('/') {
                return Err(Error::InvalidLayout {
                    field: name,
                    reason: format!("must be an absolute URL path (got {:?})", path),
                });
            }
        }

        Ok(())
    }
}

/// Repository the engine commits to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    pub owner: String,
    pub name: String,
    pub branch: String,
}

/// Engine configuration.
///
/// Use [`EngineConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct EngineConfig {
    pub repository: RepositoryConfig,

    /// Base URL of the remote object API
    pub api_base_url: String,

    pub layout: ContentLayout,

    /// Maximum number of blob uploads in flight within one transaction
    pub upload_concurrency: usize,

    /// Per-request timeout applied by the remote adapter
    pub request_timeout: Duration,

    /// Total attempts for a transaction that loses a branch race (1 = no retry)
    pub stale_branch_attempts: u32,

    /// Base delay between stale-branch attempts, doubled each time
    pub retry_backoff: Duration,

    /// HTTP client used by the remote adapter
    pub http_client: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("repository", &self.repository)
            .field("api_base_url", &self.api_base_url)
            .field("layout", &self.layout)
            .field("upload_concurrency", &self.upload_concurrency)
            .field("request_timeout", &self.request_timeout)
            .field("stale_branch_attempts", &self.stale_branch_attempts)
            .field("retry_backoff", &self.retry_backoff)
            .field("http_client", &"HttpClient { ... }")
            .finish()
    }
}

impl EngineConfig {
    /// Creates a new builder for constructing an `EngineConfig`.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Owner, repository and branch names are non-empty and contain no `/`
    ///   (branch may contain `/`, but not `..` or a leading/trailing `/`)
    /// - API base URL is http(s)
    /// - Upload concurrency is within 1..=16
    /// - Request timeout and retry budget are non-zero
    /// - Content layout paths are well-formed
    pub fn validate(&self) -> Result<()> {
        let repo = &self.repository;
        for (name, value) in [("owner", &repo.owner), ("repository name", &repo.name)] {
            if value.trim().is_empty() || value.contains('/') {
                return Err(Error::Config(format!(
                    "Repository {} must be non-empty and must not contain '/' (got {:?})",
                    name, value
                )));
            }
        }

        if repo.branch.is_empty()
            || repo.branch.starts_with('/')
            || repo.branch.ends_with('/')
            || repo.branch.contains("..")
            || repo.branch.contains(char::is_whitespace)
        {
            return Err(Error::Config(format!(
                "Branch name {:?} is not a valid ref name",
                repo.branch
            )));
        }

        if !(self.api_base_url.starts_with("https://") || self.api_base_url.starts_with("http://"))
        {
            return Err(Error::Config(format!(
                "API base URL must start with http:// or https:// (got {:?})",
                self.api_base_url
            )));
        }

        if self.upload_concurrency == 0 || self.upload_concurrency > MAX_UPLOAD_CONCURRENCY {
            return Err(Error::Config(format!(
                "Upload concurrency must be between 1 and {} (got {})",
                MAX_UPLOAD_CONCURRENCY, self.upload_concurrency
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if self.stale_branch_attempts == 0 {
            return Err(Error::Config(
                "Stale-branch attempts must be at least 1 (1 disables retrying)".to_string(),
            ));
        }

        self.layout.validate()
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    let client = bridge_desktop::ReqwestHttpClient::with_timeout(timeout).map_err(|e| {
        Error::CapabilityMissing {
            capability: "HttpClient".to_string(),
            message: e.to_string(),
        }
    })?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "No HTTP client implementation provided. \
                  Enable the `desktop-shims` feature or inject one with \
                  EngineConfigBuilder::http_client()."
            .to_string(),
    })
}

/// Builder for [`EngineConfig`].
#[derive(Default)]
pub struct EngineConfigBuilder {
    owner: Option<String>,
    name: Option<String>,
    branch: Option<String>,
    api_base_url: Option<String>,
    layout: Option<ContentLayout>,
    upload_concurrency: Option<usize>,
    request_timeout: Option<Duration>,
    stale_branch_attempts: Option<u32>,
    retry_backoff: Option<Duration>,
    http_client: Option<Arc<dyn HttpClient>>,
}

impl EngineConfigBuilder {
    /// Sets the repository owner and name (required).
    pub fn repository(mut self, owner: impl Into<String>, name: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self.name = Some(name.into());
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Overrides the API base URL, e.g. for GitHub Enterprise
    /// (`https://ghe.example.com/api/v3`). A trailing slash is ignored.
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn layout(mut self, layout: ContentLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn upload_concurrency(mut self, concurrency: usize) -> Self {
        self.upload_concurrency = Some(concurrency);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Total attempts for a transaction that fails with a stale branch.
    pub fn stale_branch_attempts(mut self, attempts: u32) -> Self {
        self.stale_branch_attempts = Some(attempts);
        self
    }

    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = Some(backoff);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// Optional when the `desktop-shims` feature supplies a reqwest default.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when a required setting is missing or invalid
    /// - [`Error::CapabilityMissing`] when no `HttpClient` is available
    pub fn build(self) -> Result<EngineConfig> {
        let owner = self.owner.ok_or_else(|| {
            Error::Config(
                "Repository owner is required. Use .repository(owner, name) to set it."
                    .to_string(),
            )
        })?;
        let name = self.name.ok_or_else(|| {
            Error::Config(
                "Repository name is required. Use .repository(owner, name) to set it.".to_string(),
            )
        })?;

        let request_timeout = self.request_timeout.unwrap_or(Duration::from_secs(30));

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(request_timeout)?,
        };

        let api_base_url = self
            .api_base_url
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let config = EngineConfig {
            repository: RepositoryConfig {
                owner,
                name,
                branch: self.branch.unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            },
            api_base_url,
            layout: self.layout.unwrap_or_default(),
            upload_concurrency: self
                .upload_concurrency
                .unwrap_or(DEFAULT_UPLOAD_CONCURRENCY),
            request_timeout,
            stale_branch_attempts: self.stale_branch_attempts.unwrap_or(3),
            retry_backoff: self.retry_backoff.unwrap_or(Duration::from_millis(200)),
            http_client,
        };

        config.validate()?;

        Ok(config)
    }
}
