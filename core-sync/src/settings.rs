//! Typed site configuration
//!
//! Mirrors the blog's YAML configuration file. Keys this type does not model
//! are kept in the `extra` maps and written back untouched.

use crate::error::{Result, SyncError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteSettings {
    #[serde(default)]
    pub site: SiteSection,
    #[serde(default)]
    pub user: UserSection,
    #[serde(default)]
    pub comments: CommentsSection,
    #[serde(default)]
    pub umami: UmamiSection,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteSection {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tab: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub favicon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icp_link: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSection {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub site: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sidebar: Sidebar,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sidebar {
    #[serde(default)]
    pub social: Vec<SocialLink>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialLink {
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "ariaLabel")]
    pub aria_label: String,
    #[serde(default)]
    pub svg: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentsSection {
    #[serde(default)]
    pub enable: bool,
    /// An empty `type` loads as `None`.
    #[serde(
        default,
        rename = "type",
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub provider: Option<CommentProvider>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Comment backend named by `comments.type`
///
/// Providers the site theme knows but this type does not are carried in
/// `Other` and written back as they were read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentProvider {
    Giscus,
    Waline,
    Other(String),
}

impl CommentProvider {
    pub fn as_str(&self) -> &str {
        match self {
            CommentProvider::Giscus => "giscus",
            CommentProvider::Waline => "waline",
            CommentProvider::Other(name) => name,
        }
    }
}

impl From<&str> for CommentProvider {
    fn from(name: &str) -> Self {
        match name {
            "giscus" => CommentProvider::Giscus,
            "waline" => CommentProvider::Waline,
            other => CommentProvider::Other(other.to_string()),
        }
    }
}

impl fmt::Display for CommentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CommentProvider {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CommentProvider {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(CommentProvider::from(name.as_str()))
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<CommentProvider>, D::Error>
where
    D: Deserializer<'de>,
{
    let name = Option::<String>::deserialize(deserializer)?;
    Ok(name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(CommentProvider::from))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UmamiSection {
    #[serde(default)]
    pub enable: bool,
    #[serde(default, rename = "baseUrl", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, rename = "shareId", skip_serializing_if = "Option::is_none")]
    pub share_id: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Icon presets offered for sidebar social links
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialPreset {
    Github,
    Twitter,
    Bilibili,
    Email,
    Telegram,
    Qq,
    WeChat,
    Douyin,
    Rss,
    Weibo,
    Zhihu,
    Other,
}

impl SocialPreset {
    pub const ALL: [SocialPreset; 12] = [
        SocialPreset::Github,
        SocialPreset::Twitter,
        SocialPreset::Bilibili,
        SocialPreset::Email,
        SocialPreset::Telegram,
        SocialPreset::Qq,
        SocialPreset::WeChat,
        SocialPreset::Douyin,
        SocialPreset::Rss,
        SocialPreset::Weibo,
        SocialPreset::Zhihu,
        SocialPreset::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SocialPreset::Github => "Github",
            SocialPreset::Twitter => "Twitter (X)",
            SocialPreset::Bilibili => "Bilibili",
            SocialPreset::Email => "Email",
            SocialPreset::Telegram => "Telegram",
            SocialPreset::Qq => "QQ",
            SocialPreset::WeChat => "WeChat",
            SocialPreset::Douyin => "Douyin",
            SocialPreset::Rss => "RSS",
            SocialPreset::Weibo => "Weibo",
            SocialPreset::Zhihu => "Zhihu",
            SocialPreset::Other => "Other",
        }
    }

    /// Iconify name stored in the `svg` field
    pub fn icon(&self) -> &'static str {
        match self {
            SocialPreset::Github => "ri:github-line",
            SocialPreset::Twitter => "ri:twitter-line",
            SocialPreset::Bilibili => "ri:bilibili-line",
            SocialPreset::Email => "ri:mail-line",
            SocialPreset::Telegram => "ri:telegram-line",
            SocialPreset::Qq => "ri:qq-line",
            SocialPreset::WeChat => "ri:wechat-fill",
            SocialPreset::Douyin => "ri:tiktok-line",
            SocialPreset::Rss => "ri:rss-fill",
            SocialPreset::Weibo => "ri:weibo-fill",
            SocialPreset::Zhihu => "ri:zhihu-line",
            SocialPreset::Other => "ri:link",
        }
    }

    pub fn from_icon(icon: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|preset| preset.icon() == icon)
    }
}

impl fmt::Display for SocialPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

fn invalid(field: &str, reason: impl Into<String>) -> SyncError {
    SyncError::InvalidSettings {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("https://") || value.starts_with("http://")
}

/// Site-relative path (`/favicon.ico`) or absolute http(s) URL
fn is_public_reference(value: &str) -> bool {
    value.starts_with('/') || is_http_url(value)
}

impl SiteSettings {
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check the invariants every saved configuration must hold.
    pub fn validate(&self) -> Result<()> {
        if self.site.title.trim().is_empty() {
            return Err(invalid("site.title", "site title must not be empty"));
        }
        if !self.site.favicon.is_empty() && !is_public_reference(&self.site.favicon) {
            return Err(invalid(
                "site.favicon",
                "must be a site-relative path or an http(s) URL",
            ));
        }
        if !self.user.avatar.is_empty() && !is_public_reference(&self.user.avatar) {
            return Err(invalid(
                "user.avatar",
                "must be a site-relative path or an http(s) URL",
            ));
        }
        for (index, link) in self.user.sidebar.social.iter().enumerate() {
            if link.href.trim().is_empty() {
                return Err(invalid(
                    &format!("user.sidebar.social[{}].href", index),
                    "link target must not be empty",
                ));
            }
        }
        if self.comments.enable && self.comments.provider.is_none() {
            return Err(invalid(
                "comments.type",
                "a provider is required when comments are enabled",
            ));
        }
        if self.umami.enable {
            match self.umami.base_url.as_deref() {
                Some(url) if is_http_url(url) => {}
                _ => {
                    return Err(invalid(
                        "umami.baseUrl",
                        "an http(s) base URL is required when analytics are enabled",
                    ))
                }
            }
        }
        Ok(())
    }

    pub fn set_site_title(&mut self, title: &str) -> Result<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(invalid("site.title", "site title must not be empty"));
        }
        self.site.title = title.to_string();
        Ok(())
    }

    pub fn set_tab_title(&mut self, tab: &str) {
        self.site.tab = tab.trim().to_string();
    }

    pub fn set_site_description(&mut self, description: &str) {
        self.site.description = description.to_string();
    }

    /// Set or clear the ICP filing number and its link.
    pub fn set_icp(&mut self, icp: Option<&str>, link: Option<&str>) -> Result<()> {
        let link = link.map(str::trim).filter(|l| !l.is_empty());
        if let Some(link) = link {
            if !is_http_url(link) {
                return Err(invalid("site.icp_link", "must be an http(s) URL"));
            }
        }
        self.site.icp = icp.map(str::trim).filter(|v| !v.is_empty()).map(String::from);
        self.site.icp_link = link.map(String::from);
        Ok(())
    }

    pub fn set_favicon(&mut self, reference: &str) -> Result<()> {
        if !is_public_reference(reference) {
            return Err(invalid(
                "site.favicon",
                "must be a site-relative path or an http(s) URL",
            ));
        }
        self.site.favicon = reference.to_string();
        Ok(())
    }

    pub fn set_avatar(&mut self, reference: &str) -> Result<()> {
        if !is_public_reference(reference) {
            return Err(invalid(
                "user.avatar",
                "must be a site-relative path or an http(s) URL",
            ));
        }
        self.user.avatar = reference.to_string();
        Ok(())
    }

    pub fn set_user_name(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid("user.name", "name must not be empty"));
        }
        self.user.name = name.to_string();
        Ok(())
    }

    pub fn set_user_site(&mut self, site: &str) -> Result<()> {
        let site = site.trim();
        if !site.is_empty() && !is_http_url(site) {
            return Err(invalid("user.site", "must be an http(s) URL"));
        }
        self.user.site = site.to_string();
        Ok(())
    }

    pub fn set_user_description(&mut self, description: &str) {
        self.user.description = description.to_string();
    }

    /// Append a social link styled by `preset`; returns its index.
    pub fn add_social_link(&mut self, preset: SocialPreset, href: &str) -> Result<usize> {
        let href = href.trim();
        if href.is_empty() {
            return Err(invalid("user.sidebar.social.href", "link target must not be empty"));
        }
        let social = &mut self.user.sidebar.social;
        social.push(SocialLink {
            href: href.to_string(),
            title: preset.label().to_string(),
            aria_label: preset.label().to_string(),
            svg: preset.icon().to_string(),
            extra: BTreeMap::new(),
        });
        Ok(social.len() - 1)
    }

    pub fn remove_social_link(&mut self, index: usize) -> Result<SocialLink> {
        let social = &mut self.user.sidebar.social;
        if index >= social.len() {
            return Err(invalid(
                "user.sidebar.social",
                format!("no link at index {} ({} links)", index, social.len()),
            ));
        }
        Ok(social.remove(index))
    }

    /// Swap a link with its neighbour. Moving past either end is a no-op.
    pub fn move_social_link(&mut self, index: usize, direction: MoveDirection) -> Result<()> {
        let social = &mut self.user.sidebar.social;
        if index >= social.len() {
            return Err(invalid(
                "user.sidebar.social",
                format!("no link at index {} ({} links)", index, social.len()),
            ));
        }
        match direction {
            MoveDirection::Up if index > 0 => social.swap(index, index - 1),
            MoveDirection::Down if index + 1 < social.len() => social.swap(index, index + 1),
            _ => {}
        }
        Ok(())
    }

    /// Change a link's icon; title and aria label follow the preset.
    pub fn set_social_icon(&mut self, index: usize, preset: SocialPreset) -> Result<()> {
        let count = self.user.sidebar.social.len();
        let link = self.user.sidebar.social.get_mut(index).ok_or_else(|| {
            invalid(
                "user.sidebar.social",
                format!("no link at index {} ({} links)", index, count),
            )
        })?;
        link.svg = preset.icon().to_string();
        link.title = preset.label().to_string();
        link.aria_label = preset.label().to_string();
        Ok(())
    }

    pub fn set_social_href(&mut self, index: usize, href: &str) -> Result<()> {
        let href = href.trim();
        if href.is_empty() {
            return Err(invalid("user.sidebar.social.href", "link target must not be empty"));
        }
        let count = self.user.sidebar.social.len();
        let link = self.user.sidebar.social.get_mut(index).ok_or_else(|| {
            invalid(
                "user.sidebar.social",
                format!("no link at index {} ({} links)", index, count),
            )
        })?;
        link.href = href.to_string();
        Ok(())
    }

    pub fn set_comments(&mut self, enable: bool, provider: Option<CommentProvider>) -> Result<()> {
        if enable && provider.is_none() {
            return Err(invalid(
                "comments.type",
                "a provider is required when comments are enabled",
            ));
        }
        self.comments.enable = enable;
        if provider.is_some() {
            self.comments.provider = provider;
        }
        Ok(())
    }

    pub fn set_analytics(
        &mut self,
        enable: bool,
        base_url: Option<&str>,
        share_id: Option<&str>,
    ) -> Result<()> {
        let base_url = base_url.map(|u| u.trim().trim_end_matches('/')).filter(|u| !u.is_empty());
        if let Some(url) = base_url {
            if !is_http_url(url) {
                return Err(invalid("umami.baseUrl", "must be an http(s) URL"));
            }
        } else if enable {
            return Err(invalid(
                "umami.baseUrl",
                "an http(s) base URL is required when analytics are enabled",
            ));
        }
        self.umami.enable = enable;
        self.umami.base_url = base_url.map(String::from);
        self.umami.share_id = share_id.map(str::trim).filter(|s| !s.is_empty()).map(String::from);
        Ok(())
    }
}
