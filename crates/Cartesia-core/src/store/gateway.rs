use roadmap_canvas::model::RoadmapDiagram;
use roadmap_canvas::persistence;
use std::sync::Arc;

use crate::api::{ExportLogEntry, RoadmapBackend};
use crate::domain::{Comment, MetaPatch, RoadmapId, RoadmapMeta, RoadmapRecord, VersionId, VersionSummary};
use crate::error::GatewayError;

/// Where a save ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { id: RoadmapId },
    /// The caller could not write `previous`, so a new roadmap owned by the caller was created.
    Forked { previous: RoadmapId, current: RoadmapId },
}

impl SaveOutcome {
    /// The roadmap the diagram now lives in.
    pub fn id(&self) -> &RoadmapId {
        match self {
            SaveOutcome::Saved { id } => id,
            SaveOutcome::Forked { current, .. } => current,
        }
    }
}

/// Typed diagram persistence on top of a [`RoadmapBackend`].
///
/// Parsing and serializing happen here; the backend only ever sees the `diagramJSON` string.
#[derive(Clone)]
pub struct DiagramGateway {
    backend: Arc<dyn RoadmapBackend>,
}

impl DiagramGateway {
    pub fn new(backend: Arc<dyn RoadmapBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn RoadmapBackend> {
        &self.backend
    }

    /// Loads the current diagram. A roadmap whose diagram was never saved is `NotFound`.
    #[tracing::instrument(skip(self), fields(roadmap_id = %id))]
    pub async fn load_diagram(&self, id: &RoadmapId) -> Result<RoadmapDiagram, GatewayError> {
        let raw = self.backend.fetch_diagram(id).await?;
        parse_stored(&raw)
    }

    #[tracing::instrument(skip(self, diagram), fields(roadmap_id = %id, nodes = diagram.node_count()))]
    pub async fn save_diagram(&self, id: &RoadmapId, diagram: &RoadmapDiagram) -> Result<(), GatewayError> {
        let json = persistence::serialize(diagram)?;
        self.backend.store_diagram(id, json).await
    }

    /// Saves the diagram, forking into a new roadmap when the caller may not write `id`.
    ///
    /// Only `Forbidden` triggers the fork: one `create_roadmap` with `meta`, then one save
    /// against the new id. Every other error is returned as-is.
    #[tracing::instrument(skip(self, meta, diagram), fields(roadmap_id = %id))]
    pub async fn save_or_fork(
        &self,
        id: &RoadmapId,
        meta: &RoadmapMeta,
        diagram: &RoadmapDiagram,
    ) -> Result<SaveOutcome, GatewayError> {
        let json = persistence::serialize(diagram)?;
        match self.backend.store_diagram(id, json.clone()).await {
            Ok(()) => Ok(SaveOutcome::Saved { id: id.clone() }),
            Err(GatewayError::Forbidden) => {
                tracing::info!(roadmap_id = %id, "no write permission, saving as a new roadmap");
                let record = self.backend.create_roadmap(meta).await?;
                self.backend.store_diagram(&record.id, json).await?;
                tracing::info!(previous = %id, current = %record.id, "roadmap forked");
                Ok(SaveOutcome::Forked {
                    previous: id.clone(),
                    current: record.id,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Loads a historical version. Never touches the live diagram.
    #[tracing::instrument(skip(self), fields(roadmap_id = %id, version_id = %version))]
    pub async fn load_version(&self, id: &RoadmapId, version: &VersionId) -> Result<RoadmapDiagram, GatewayError> {
        let raw = self.backend.fetch_version(id, version).await?;
        parse_stored(&raw)
    }

    pub async fn list_versions(&self, id: &RoadmapId) -> Result<Vec<VersionSummary>, GatewayError> {
        self.backend.list_versions(id).await
    }

    pub async fn create_roadmap(&self, meta: &RoadmapMeta) -> Result<RoadmapRecord, GatewayError> {
        self.backend.create_roadmap(meta).await
    }

    pub async fn update_meta(&self, id: &RoadmapId, patch: &MetaPatch) -> Result<(), GatewayError> {
        self.backend.update_roadmap(id, patch).await
    }

    pub async fn fetch_meta(&self, id: &RoadmapId) -> Result<RoadmapMeta, GatewayError> {
        self.backend.fetch_roadmap(id).await.map(|r| r.meta())
    }

    pub async fn lock(&self, id: &RoadmapId) -> Result<(), GatewayError> {
        self.backend.lock(id).await
    }

    pub async fn unlock(&self, id: &RoadmapId) -> Result<(), GatewayError> {
        self.backend.unlock(id).await
    }

    pub async fn list_comments(&self, id: &RoadmapId) -> Result<Vec<Comment>, GatewayError> {
        self.backend.list_comments(id).await
    }

    pub async fn log_export(&self, id: &RoadmapId, entry: &ExportLogEntry) -> Result<(), GatewayError> {
        self.backend.log_export(id, entry).await
    }
}

fn parse_stored(raw: &str) -> Result<RoadmapDiagram, GatewayError> {
    if raw.trim().is_empty() {
        return Err(GatewayError::NotFound);
    }
    Ok(persistence::parse(raw)?)
}
