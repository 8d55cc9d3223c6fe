use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{CommentId, RoadmapId, UserId, VersionId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

/// Title, description and visibility of a roadmap.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapMeta {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub visibility: Visibility,
}

impl RoadmapMeta {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Applies the fields present in `patch`.
    pub fn apply(&mut self, patch: &MetaPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(visibility) = patch.visibility {
            self.visibility = visibility;
        }
    }
}

/// Partial metadata update; absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
}

impl MetaPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.visibility.is_none()
    }
}

/// A roadmap as returned by the metadata endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapRecord {
    #[serde(alias = "ID")]
    pub id: RoadmapId,
    #[serde(default, alias = "Title")]
    pub title: String,
    #[serde(default, alias = "Description")]
    pub description: String,
    #[serde(default)]
    pub visibility: Visibility,
}

impl RoadmapRecord {
    pub fn meta(&self) -> RoadmapMeta {
        RoadmapMeta {
            title: self.title.clone(),
            description: self.description.clone(),
            visibility: self.visibility,
        }
    }
}

/// One entry of a roadmap's version history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSummary {
    #[serde(alias = "ID")]
    pub id: VersionId,
    #[serde(rename = "createdAt", alias = "CreatedAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "authorId", alias = "AuthorID", default)]
    pub author_id: Option<UserId>,
}

/// A comment from the roadmap's discussion feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(alias = "ID")]
    pub id: CommentId,
    #[serde(default, alias = "Username", alias = "username")]
    pub author: String,
    #[serde(default, alias = "Content")]
    pub content: String,
    /// Display text; the backend does not use a single timestamp format here.
    #[serde(rename = "createdAt", alias = "CreatedAt", default)]
    pub created_at: String,
}
