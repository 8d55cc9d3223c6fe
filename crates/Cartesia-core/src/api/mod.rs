//! # Backend transport
//!
//! The raw operations of the roadmap backend. `DiagramGateway` builds the typed, diagram-aware
//! layer on top of any implementation of [`RoadmapBackend`].

pub mod client;
pub mod memory;

use async_trait::async_trait;
use roadmap_canvas::{Orientation, PageSize};
use serde::{Deserialize, Serialize};

use crate::domain::{Comment, MetaPatch, RoadmapId, RoadmapMeta, RoadmapRecord, VersionId, VersionSummary};
use crate::error::GatewayError;

pub use client::ApiClient;
pub use memory::MemoryBackend;

/// The roadmap backend, reduced to the calls the editor needs.
///
/// Diagram bodies cross this boundary as the opaque `diagramJSON` string; parsing happens in the
/// gateway.
#[async_trait]
pub trait RoadmapBackend: Send + Sync {
    /// `GET /roadmaps/{id}/diagram`. An empty string means the diagram was never saved.
    async fn fetch_diagram(&self, id: &RoadmapId) -> Result<String, GatewayError>;

    /// `PUT /roadmaps/{id}/diagram`.
    async fn store_diagram(&self, id: &RoadmapId, diagram_json: String) -> Result<(), GatewayError>;

    /// `POST /roadmaps`.
    async fn create_roadmap(&self, meta: &RoadmapMeta) -> Result<RoadmapRecord, GatewayError>;

    /// `PUT /roadmaps/{id}`.
    async fn update_roadmap(&self, id: &RoadmapId, patch: &MetaPatch) -> Result<(), GatewayError>;

    /// `GET /roadmaps/{id}`.
    async fn fetch_roadmap(&self, id: &RoadmapId) -> Result<RoadmapRecord, GatewayError>;

    /// `POST /roadmaps/{id}/lock`.
    async fn lock(&self, id: &RoadmapId) -> Result<(), GatewayError>;

    /// `POST /roadmaps/{id}/unlock`.
    async fn unlock(&self, id: &RoadmapId) -> Result<(), GatewayError>;

    /// `GET /roadmaps/{id}/versions`, newest first.
    async fn list_versions(&self, id: &RoadmapId) -> Result<Vec<VersionSummary>, GatewayError>;

    /// `GET /roadmaps/{id}/versions/{version}`, returning the stored `diagramJSON`.
    async fn fetch_version(&self, id: &RoadmapId, version: &VersionId) -> Result<String, GatewayError>;

    /// `POST /roadmaps/{id}/export/log`.
    async fn log_export(&self, id: &RoadmapId, entry: &ExportLogEntry) -> Result<(), GatewayError>;

    /// `GET /roadmaps/{id}/comments`.
    async fn list_comments(&self, id: &RoadmapId) -> Result<Vec<Comment>, GatewayError>;
}

/// Audit record of one finished export attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportLogEntry {
    pub include_resources: bool,
    pub include_comments: bool,
    /// `None` means the live diagram was exported.
    pub version_id: Option<VersionId>,
    pub page_size: PageSize,
    pub orientation: Orientation,
}

/// Body of the diagram endpoints.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DiagramPayload {
    #[serde(rename = "diagramJSON", default)]
    pub diagram_json: String,
}

/// List endpoints answer either with a bare array or with `{"items": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ItemList<T> {
    Bare(Vec<T>),
    /// `items` is `null` when the backend has nothing to list.
    Wrapped { items: Option<Vec<T>> },
}

impl<T> ItemList<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            ItemList::Bare(items) => items,
            ItemList::Wrapped { items } => items.unwrap_or_default(),
        }
    }
}
