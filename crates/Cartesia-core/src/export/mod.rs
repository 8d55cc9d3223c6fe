//! # Export
//!
//! Printable snapshots of the live diagram or of a historical version.
//!
//! While an export runs, the session shows the exported diagram and rejects edits. A guard puts
//! the live diagram back when the export ends, whether the renderer printed, was cancelled,
//! failed, or the export future was dropped.

use roadmap_canvas::model::{NodeId, Resource, RoadmapDiagram};
use roadmap_canvas::render::RenderList;
use roadmap_canvas::{Orientation, PageSetup, PageSize};

use crate::api::ExportLogEntry;
use crate::domain::{Comment, VersionId};
use crate::error::{SessionError, SessionResult};
use crate::session::{EditorSession, SessionTarget};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    /// Export this saved version instead of the live diagram.
    pub version_id: Option<VersionId>,
    pub include_resources: bool,
    pub include_comments: bool,
    pub page_size: PageSize,
    pub orientation: Orientation,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            version_id: None,
            include_resources: true,
            include_comments: true,
            page_size: PageSize::default(),
            orientation: Orientation::default(),
        }
    }
}

impl ExportOptions {
    pub fn version(mut self, version: impl Into<VersionId>) -> Self {
        self.version_id = Some(version.into());
        self
    }

    pub fn page(mut self, page_size: PageSize, orientation: Orientation) -> Self {
        self.page_size = page_size;
        self.orientation = orientation;
        self
    }

    pub fn setup(&self) -> PageSetup {
        PageSetup::new(self.page_size, self.orientation)
    }

    fn overrides(&self) -> ViewOverrides {
        ViewOverrides {
            hide_resources: !self.include_resources,
            hide_comments: !self.include_comments,
        }
    }

    fn audit_entry(&self) -> ExportLogEntry {
        ExportLogEntry {
            include_resources: self.include_resources,
            include_comments: self.include_comments,
            version_id: self.version_id.clone(),
            page_size: self.page_size,
            orientation: self.orientation,
        }
    }
}

/// Temporary visibility changes applied to the editor for the duration of an export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewOverrides {
    pub hide_resources: bool,
    pub hide_comments: bool,
}

/// Resources of one node, as listed in the printed resources panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceSection {
    pub node_id: NodeId,
    pub heading: String,
    pub resources: Vec<Resource>,
}

/// Everything a renderer needs to print one export.
#[derive(Clone, Debug, PartialEq)]
pub struct PrintDocument {
    pub title: String,
    pub setup: PageSetup,
    /// `None` when the live diagram was exported.
    pub version_id: Option<VersionId>,
    /// Display list of the diagram page.
    pub page: RenderList,
    /// `None` when the resources panel is hidden.
    pub resources: Option<Vec<ResourceSection>>,
    /// `None` when the comments feed is hidden.
    pub comments: Option<Vec<Comment>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrintOutcome {
    Printed,
    /// The user dismissed the print dialog.
    Cancelled,
}

/// The host's print backend (a print dialog, a PDF writer, ...).
pub trait PrintRenderer {
    fn render(&mut self, document: &PrintDocument) -> anyhow::Result<PrintOutcome>;
}

/// Restores the live diagram and clears overrides when dropped.
struct ExportGuard<'a> {
    session: &'a EditorSession,
    live: Option<RoadmapDiagram>,
}

impl<'a> ExportGuard<'a> {
    fn engage(
        session: &'a EditorSession,
        substitute: Option<RoadmapDiagram>,
        overrides: ViewOverrides,
    ) -> SessionResult<Self> {
        let mut inner = session.lock_inner();
        inner.ensure_open()?;
        if inner.export.is_some() {
            return Err(SessionError::ExportInProgress);
        }
        let live = substitute.map(|diagram| std::mem::replace(&mut inner.diagram, diagram));
        inner.export = Some(overrides);
        Ok(Self { session, live })
    }
}

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.session.lock_inner();
        if let Some(live) = self.live.take() {
            inner.diagram = live;
        }
        inner.export = None;
        tracing::debug!("export finished, live view restored");
    }
}

fn resource_sections(diagram: &RoadmapDiagram) -> Vec<ResourceSection> {
    diagram
        .nodes()
        .filter(|n| !n.content.resources.is_empty())
        .map(|n| ResourceSection {
            node_id: n.id.clone(),
            heading: if n.content.content_title.is_empty() {
                n.label.clone()
            } else {
                n.content.content_title.clone()
            },
            resources: n.content.resources.clone(),
        })
        .collect()
}

impl EditorSession {
    /// Prints the live diagram, or a saved version of it, through `renderer`.
    ///
    /// Exactly one audit entry is sent when the renderer printed or was cancelled; audit failures
    /// are logged and otherwise ignored. Local sessions have nothing to audit against.
    #[tracing::instrument(skip(self, renderer))]
    pub async fn export(
        &self,
        options: ExportOptions,
        renderer: &mut dyn PrintRenderer,
    ) -> SessionResult<PrintOutcome> {
        let (target, title) = {
            let inner = self.lock_inner();
            inner.ensure_open()?;
            if inner.export.is_some() {
                return Err(SessionError::ExportInProgress);
            }
            if self.is_saving() {
                return Err(SessionError::SaveInFlight);
            }
            (inner.target.clone(), inner.meta.title.clone())
        };

        let historical = match (&options.version_id, &target) {
            (Some(version), SessionTarget::Remote(id)) => Some(self.gateway().load_version(id, version).await?),
            (Some(_), SessionTarget::Local) => return Err(SessionError::NotRemote),
            (None, _) => None,
        };

        let guard = ExportGuard::engage(self, historical, options.overrides())?;

        let comments = match (&target, options.include_comments) {
            (_, false) => None,
            (SessionTarget::Remote(id), true) => Some(self.gateway().list_comments(id).await.unwrap_or_else(|err| {
                tracing::warn!(roadmap_id = %id, error = %err, "comments unavailable for export");
                Vec::new()
            })),
            (SessionTarget::Local, true) => Some(Vec::new()),
        };

        let document = {
            let inner = self.lock_inner();
            PrintDocument {
                title: title.clone(),
                setup: options.setup(),
                version_id: options.version_id.clone(),
                page: inner.canvas.print(&inner.diagram, options.setup(), Some(&title)),
                resources: options.include_resources.then(|| resource_sections(&inner.diagram)),
                comments,
            }
        };

        let rendered = renderer.render(&document);
        drop(guard);

        let outcome = rendered.map_err(SessionError::Render)?;
        if let SessionTarget::Remote(id) = &target {
            if let Err(err) = self.gateway().log_export(id, &options.audit_entry()).await {
                tracing::warn!(roadmap_id = %id, error = %err, "export audit failed");
            }
        }
        tracing::info!(?outcome, version_id = ?options.version_id, "export finished");
        Ok(outcome)
    }
}
