//! Change-set resolution
//!
//! Maps a logical edit (publish a post, delete posts, save settings) onto
//! concrete path operations against the content layout.

use crate::error::Result;
use crate::frontmatter::{render_post, PostFrontMatter};
use crate::settings::SiteSettings;
use crate::types::{ChangeSet, PathOperation, Slug, TreeSnapshot};
use bytes::Bytes;
use core_runtime::config::ContentLayout;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use tracing::{debug, warn};

const IMAGE_HASH_LEN: usize = 16;

/// Post file flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostFormat {
    #[default]
    Markdown,
    Mdx,
}

impl PostFormat {
    pub const ALL: [PostFormat; 2] = [PostFormat::Markdown, PostFormat::Mdx];

    pub fn extension(&self) -> &'static str {
        match self {
            PostFormat::Markdown => "md",
            PostFormat::Mdx => "mdx",
        }
    }
}

/// An image uploaded alongside a post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub file_name: String,
    pub content: Bytes,
}

impl ImageAttachment {
    pub fn new(file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    /// Lower-cased ASCII extension of the file name, `bin` when unusable.
    pub fn extension(&self) -> String {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "bin".to_string())
    }

    fn content_hash(&self) -> String {
        let digest = Sha256::digest(&self.content);
        let mut hash = hex::encode(digest);
        hash.truncate(IMAGE_HASH_LEN);
        hash
    }
}

/// Where an edited post lived before this edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviousPost {
    pub slug: Slug,
    pub format: PostFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub slug: Slug,
    pub front_matter: PostFrontMatter,
    pub body: String,
    pub format: PostFormat,
    pub images: Vec<ImageAttachment>,
    /// Set when editing an existing post
    pub previous: Option<PreviousPost>,
}

impl PostDraft {
    pub fn new(slug: Slug, front_matter: PostFrontMatter, body: impl Into<String>) -> Self {
        Self {
            slug,
            front_matter,
            body: body.into(),
            format: PostFormat::default(),
            images: Vec::new(),
            previous: None,
        }
    }

    pub fn with_format(mut self, format: PostFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.images.push(image);
        self
    }

    pub fn editing(mut self, slug: Slug, format: PostFormat) -> Self {
        self.previous = Some(PreviousPost { slug, format });
        self
    }
}

/// Site asset replaced together with the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Favicon,
    Avatar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAsset {
    pub kind: AssetKind,
    pub content: Bytes,
}

/// Configuration content to commit
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsDocument {
    /// Re-serialized from the typed model; asset paths are patched in.
    Typed(SiteSettings),
    /// Edited YAML text, committed byte-for-byte once it parses and validates.
    Raw(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettingsUpdate {
    pub document: SettingsDocument,
    pub assets: Vec<PendingAsset>,
}

impl SettingsUpdate {
    pub fn new(settings: SiteSettings) -> Self {
        Self {
            document: SettingsDocument::Typed(settings),
            assets: Vec::new(),
        }
    }

    /// Save hand-edited YAML as-is, keeping comments and key order.
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            document: SettingsDocument::Raw(text.into()),
            assets: Vec::new(),
        }
    }

    pub fn with_asset(mut self, kind: AssetKind, content: impl Into<Bytes>) -> Self {
        self.assets.push(PendingAsset {
            kind,
            content: content.into(),
        });
        self
    }
}

/// A logical edit requested by the editor
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeRequest {
    PublishPost(PostDraft),
    DeletePost(Slug),
    BatchDelete(Vec<Slug>),
    UpdateSettings(SettingsUpdate),
}

impl ChangeRequest {
    /// Whether resolution has to look at the files on the branch.
    pub fn needs_tree_listing(&self) -> bool {
        match self {
            ChangeRequest::PublishPost(draft) => draft.previous.is_some(),
            ChangeRequest::DeletePost(_) | ChangeRequest::BatchDelete(_) => true,
            ChangeRequest::UpdateSettings(_) => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChangeRequest::PublishPost(_) => "publish_post",
            ChangeRequest::DeletePost(_) => "delete_post",
            ChangeRequest::BatchDelete(_) => "batch_delete",
            ChangeRequest::UpdateSettings(_) => "update_settings",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChangeSetResolver {
    layout: ContentLayout,
}

impl ChangeSetResolver {
    pub fn new(layout: ContentLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ContentLayout {
        &self.layout
    }

    pub fn post_path(&self, slug: &Slug, format: PostFormat) -> String {
        format!("{}/{}.{}", self.layout.blog_dir, slug, format.extension())
    }

    pub fn image_path(&self, slug: &Slug, image: &ImageAttachment) -> String {
        format!(
            "{}/{}/{}.{}",
            self.layout.image_dir,
            slug,
            image.content_hash(),
            image.extension()
        )
    }

    /// URL the published site serves an attachment under, for embedding in the body.
    pub fn image_url(&self, slug: &Slug, image: &ImageAttachment) -> String {
        format!(
            "{}/{}/{}.{}",
            self.layout.image_public_prefix,
            slug,
            image.content_hash(),
            image.extension()
        )
    }

    /// Resolve `request` into operations.
    ///
    /// `snapshot` must be provided when [`ChangeRequest::needs_tree_listing`]
    /// is true; without it deletions resolve to nothing.
    pub fn resolve(
        &self,
        request: &ChangeRequest,
        snapshot: Option<&TreeSnapshot>,
    ) -> Result<ChangeSet> {
        match request {
            ChangeRequest::PublishPost(draft) => self.resolve_publish(draft, snapshot),
            ChangeRequest::DeletePost(slug) => {
                let operations = self.delete_operations(slug, snapshot);
                Ok(ChangeSet::new(format!("delete post: {}", slug), operations))
            }
            ChangeRequest::BatchDelete(slugs) => Ok(self.resolve_batch_delete(slugs, snapshot)),
            ChangeRequest::UpdateSettings(update) => self.resolve_settings(update),
        }
    }

    fn resolve_publish(
        &self,
        draft: &PostDraft,
        snapshot: Option<&TreeSnapshot>,
    ) -> Result<ChangeSet> {
        let document = render_post(&draft.front_matter, &draft.body)?;
        let post_path = self.post_path(&draft.slug, draft.format);

        let mut operations = vec![PathOperation::write_text(post_path.clone(), document)];

        let mut image_paths = BTreeSet::new();
        for image in &draft.images {
            let path = self.image_path(&draft.slug, image);
            if image_paths.insert(path.clone()) {
                operations.push(PathOperation::write_binary(path, image.content.clone()));
            } else {
                debug!(path = %path, "Skipping duplicate image attachment");
            }
        }

        let message = match &draft.previous {
            None => format!("publish post: {}", draft.slug),
            Some(previous) => {
                let old_path = self.post_path(&previous.slug, previous.format);
                match snapshot.and_then(|s| s.find_ignore_case(&old_path)) {
                    Some(existing) if existing != post_path => {
                        operations.push(PathOperation::delete(existing))
                    }
                    Some(_) => {}
                    None if old_path == post_path => {}
                    None => warn!(
                        old_path = %old_path,
                        "Previous post file not found on branch; nothing to remove"
                    ),
                }
                format!("update post: {}", draft.slug)
            }
        };

        Ok(ChangeSet::new(message, operations))
    }

    fn resolve_batch_delete(&self, slugs: &[Slug], snapshot: Option<&TreeSnapshot>) -> ChangeSet {
        let unique: BTreeSet<&Slug> = slugs.iter().collect();
        let mut paths = BTreeSet::new();
        for slug in &unique {
            for operation in self.delete_operations(slug, snapshot) {
                paths.insert(operation.path);
            }
        }

        let message = match unique.iter().next() {
            Some(only) if unique.len() == 1 => format!("delete post: {}", only),
            _ => format!("delete {} posts", unique.len()),
        };
        ChangeSet::new(message, paths.into_iter().map(PathOperation::delete).collect())
    }

    /// Post files and the slug's image directory, matched ignoring case.
    fn delete_operations(&self, slug: &Slug, snapshot: Option<&TreeSnapshot>) -> Vec<PathOperation> {
        let Some(snapshot) = snapshot else {
            warn!(slug = %slug, "No tree listing available; cannot resolve deletions");
            return Vec::new();
        };

        let post_paths: Vec<String> = PostFormat::ALL
            .iter()
            .map(|format| self.post_path(slug, *format))
            .collect();
        let image_root = format!("{}/", self.layout.image_dir);

        let mut found_post = false;
        let mut operations = Vec::new();
        for path in snapshot.paths() {
            if post_paths.iter().any(|p| p.eq_ignore_ascii_case(path)) {
                found_post = true;
                operations.push(PathOperation::delete(path));
                continue;
            }

            let in_image_dir = path
                .strip_prefix(&image_root)
                .and_then(|rest| rest.split_once('/'))
                .map_or(false, |(dir, file)| {
                    dir.eq_ignore_ascii_case(slug.as_str()) && !file.is_empty()
                });
            if in_image_dir {
                operations.push(PathOperation::delete(path));
            }
        }

        if !found_post {
            warn!(slug = %slug, "No post file matches slug");
        }
        debug!(slug = %slug, count = operations.len(), "Resolved deletions");
        operations
    }

    fn resolve_settings(&self, update: &SettingsUpdate) -> Result<ChangeSet> {
        let mut operations = Vec::with_capacity(update.assets.len() + 1);

        let config = match &update.document {
            SettingsDocument::Typed(settings) => {
                let mut settings = settings.clone();
                for asset in &update.assets {
                    match asset.kind {
                        AssetKind::Favicon => settings.set_favicon(&self.layout.favicon_public_path)?,
                        AssetKind::Avatar => settings.set_avatar(&self.layout.avatar_public_path)?,
                    }
                }
                settings.validate()?;
                settings.to_yaml()?
            }
            SettingsDocument::Raw(text) => {
                SiteSettings::from_yaml(text)?.validate()?;
                text.clone()
            }
        };

        for asset in &update.assets {
            let (path, public_path) = match asset.kind {
                AssetKind::Favicon => (&self.layout.favicon_path, &self.layout.favicon_public_path),
                AssetKind::Avatar => (&self.layout.avatar_path, &self.layout.avatar_public_path),
            };
            debug!(path = %path, public_path = %public_path, "Replacing site asset");
            operations.push(PathOperation::write_binary(path.clone(), asset.content.clone()));
        }
        operations.push(PathOperation::write_text(self.layout.config_path.clone(), config));

        Ok(ChangeSet::new(
            "chore(config): update site configuration",
            operations,
        ))
    }
}
