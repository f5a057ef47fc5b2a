//! Post documents: YAML front matter followed by the markdown body.

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};

/// Front-matter fields of a post.
///
/// Unset options, empty strings, empty lists and `draft: false` are left out
/// of the rendered block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostFrontMatter {
    pub title: String,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub draft: bool,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

impl PostFrontMatter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    fn normalized(&self) -> Self {
        let clean = |values: &[String]| -> Vec<String> {
            values
                .iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect()
        };

        Self {
            title: self.title.trim().to_string(),
            tags: clean(&self.tags),
            categories: clean(&self.categories),
            ..self.clone()
        }
    }
}

/// Render a complete post document.
///
/// Line endings are normalised to `\n`.
pub fn render_post(front_matter: &PostFrontMatter, body: &str) -> Result<String> {
    let front_matter = front_matter.normalized();
    if front_matter.title.is_empty() {
        return Err(SyncError::InvalidPost("title must not be empty".to_string()));
    }

    let body = body.replace("\r\n", "\n");
    if body.trim().is_empty() {
        return Err(SyncError::InvalidPost("body must not be empty".to_string()));
    }

    let yaml = serde_yaml::to_string(&front_matter)?.replace("\r\n", "\n");
    Ok(format!("---\n{}---\n{}", yaml, body))
}
