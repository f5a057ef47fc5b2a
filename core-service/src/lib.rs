//! Blog service façade.
//!
//! Wires an [`EngineConfig`] to the GitHub object store and the sync
//! orchestrator, and exposes one method per editor action. Every write runs
//! as a single commit transaction; a transaction that loses the branch race
//! is re-run from the new head according to the service's [`RetryPolicy`].
//!
//! The service never installs a tracing subscriber. Hosts call
//! [`init_logging`] once at startup, before building the service.
//!
//! ```no_run
//! # async fn example() -> core_service::Result<()> {
//! use core_runtime::config::EngineConfig;
//! use core_service::{init_logging, BlogService, LogFormat, LoggingConfig};
//! use core_sync::{PostDraft, PostFrontMatter, Slug};
//! use bridge_traits::object_store::AccessToken;
//!
//! init_logging(LoggingConfig::default().with_format(LogFormat::Compact))?;
//!
//! let config = EngineConfig::builder()
//!     .repository("mahiro", "blog")
//!     .build()?;
//! let service = BlogService::new(config)?;
//!
//! let token = AccessToken::new("ghp_...");
//! let draft = PostDraft::new(
//!     Slug::parse("hello-world")?,
//!     PostFrontMatter::new("Hello"),
//!     "First post",
//! );
//! service.publish_post(&token, draft).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;

pub use error::{CoreError, Result};
pub use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};

use std::sync::Arc;

use bridge_traits::object_store::{AccessToken, ObjectStore};
use core_runtime::config::EngineConfig;
use core_runtime::events::{ContentEvent, CoreEvent, EventBus, EventStream, Receiver};
use core_sync::{
    retry_stale_branch, AssetKind, ChangeRequest, ImageAttachment, PostDraft, RetryPolicy,
    SettingsUpdate, SiteSettings, Slug, SyncError, SyncOrchestrator, TransactionOutcome,
};
use provider_github::GitHubObjectStore;
use tracing::{info, instrument, warn};

/// Primary façade exposed to the editor.
#[derive(Clone)]
pub struct BlogService {
    config: EngineConfig,
    orchestrator: Arc<SyncOrchestrator>,
    retry_policy: RetryPolicy,
    event_bus: EventBus,
}

impl BlogService {
    /// Create a service talking to the GitHub repository named in `config`.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(GitHubObjectStore::from_config(&config));
        Ok(Self::with_store(config, store))
    }

    /// Create a service over any object store.
    pub fn with_store(config: EngineConfig, store: Arc<dyn ObjectStore>) -> Self {
        let event_bus = EventBus::default();
        let orchestrator =
            SyncOrchestrator::from_config(store, &config).with_event_bus(event_bus.clone());
        let retry_policy = RetryPolicy::new(config.stale_branch_attempts, config.retry_backoff);

        Self {
            config,
            orchestrator: Arc::new(orchestrator),
            retry_policy,
            event_bus,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }

    /// Published, deleted and settings events only; transaction progress is
    /// filtered out.
    pub fn content_events(&self) -> EventStream {
        EventStream::new(self.subscribe())
            .filter(|event| matches!(event, CoreEvent::Content(_)))
    }

    /// Public URL an attachment will be served under once `slug` is published.
    pub fn image_url(&self, slug: &Slug, image: &ImageAttachment) -> String {
        self.orchestrator.resolver().image_url(slug, image)
    }

    /// Write a post and its images. Renames and format changes remove the
    /// previous file in the same commit.
    #[instrument(skip(self, credential, draft), fields(slug = %draft.slug))]
    pub async fn publish_post(
        &self,
        credential: &AccessToken,
        draft: PostDraft,
    ) -> Result<TransactionOutcome> {
        let path = self
            .orchestrator
            .resolver()
            .post_path(&draft.slug, draft.format);
        let slug = draft.slug.to_string();
        let updated = draft.previous.is_some();

        let outcome = self
            .run(credential, ChangeRequest::PublishPost(draft))
            .await?;

        if let Some(commit_id) = outcome.commit_id() {
            info!(path = %path, commit = %commit_id.short(), "Post published");
            self.emit(ContentEvent::PostPublished {
                slug,
                path,
                commit_id: commit_id.to_string(),
                updated,
            });
        }
        Ok(outcome)
    }

    /// Remove a post together with its image directory.
    #[instrument(skip(self, credential, slug), fields(slug = %slug))]
    pub async fn delete_post(
        &self,
        credential: &AccessToken,
        slug: Slug,
    ) -> Result<TransactionOutcome> {
        let slugs = vec![slug.to_string()];
        let outcome = self.run(credential, ChangeRequest::DeletePost(slug)).await?;
        self.emit_deleted(&outcome, slugs);
        Ok(outcome)
    }

    /// Remove several posts in one commit.
    #[instrument(skip(self, credential, slugs), fields(count = slugs.len()))]
    pub async fn batch_delete_posts(
        &self,
        credential: &AccessToken,
        slugs: Vec<Slug>,
    ) -> Result<TransactionOutcome> {
        let names = slugs.iter().map(Slug::to_string).collect();
        let outcome = self.run(credential, ChangeRequest::BatchDelete(slugs)).await?;
        self.emit_deleted(&outcome, names);
        Ok(outcome)
    }

    /// Write the site configuration and any replaced favicon or avatar.
    #[instrument(skip(self, credential, update), fields(assets = update.assets.len()))]
    pub async fn save_settings(
        &self,
        credential: &AccessToken,
        update: SettingsUpdate,
    ) -> Result<TransactionOutcome> {
        let layout = self.orchestrator.resolver().layout();
        let assets: Vec<String> = update
            .assets
            .iter()
            .map(|asset| match asset.kind {
                AssetKind::Favicon => layout.favicon_path.clone(),
                AssetKind::Avatar => layout.avatar_path.clone(),
            })
            .collect();

        let outcome = self
            .run(credential, ChangeRequest::UpdateSettings(update))
            .await?;

        if let Some(commit_id) = outcome.commit_id() {
            self.emit(ContentEvent::SettingsSaved {
                commit_id: commit_id.to_string(),
                assets,
            });
        }
        Ok(outcome)
    }

    /// Site configuration at the branch head. A repository without a
    /// configuration file yields the defaults.
    #[instrument(skip(self, credential))]
    pub async fn load_settings(&self, credential: &AccessToken) -> Result<SiteSettings> {
        match self.read_config(credential).await? {
            Some(text) => Ok(SiteSettings::from_yaml(&text)?),
            None => Ok(SiteSettings::default()),
        }
    }

    /// Configuration file text as stored, for editing with
    /// [`SettingsUpdate::raw`]. Empty when the file does not exist.
    #[instrument(skip(self, credential))]
    pub async fn load_settings_text(&self, credential: &AccessToken) -> Result<String> {
        Ok(self.read_config(credential).await?.unwrap_or_default())
    }

    async fn read_config(&self, credential: &AccessToken) -> Result<Option<String>> {
        let path = &self.orchestrator.resolver().layout().config_path;

        let Some(content) = self.orchestrator.read_file(credential, path).await? else {
            warn!(path = %path, "Site configuration not found; using defaults");
            return Ok(None);
        };

        let text = String::from_utf8(content.to_vec())
            .map_err(|e| SyncError::Serialization(format!("{} is not UTF-8: {}", path, e)))?;
        Ok(Some(text))
    }

    async fn run(
        &self,
        credential: &AccessToken,
        request: ChangeRequest,
    ) -> Result<TransactionOutcome> {
        let outcome = retry_stale_branch(&self.retry_policy, || {
            self.orchestrator.execute(credential, &request)
        })
        .await?;
        Ok(outcome)
    }

    fn emit_deleted(&self, outcome: &TransactionOutcome, slugs: Vec<String>) {
        if let Some(commit_id) = outcome.commit_id() {
            self.emit(ContentEvent::PostsDeleted {
                slugs,
                commit_id: commit_id.to_string(),
            });
        }
    }

    fn emit(&self, event: ContentEvent) {
        self.event_bus.emit(CoreEvent::Content(event)).ok();
    }
}
