use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{ExportLogEntry, RoadmapBackend};
use crate::domain::{
    Comment, MetaPatch, RoadmapId, RoadmapMeta, RoadmapRecord, UserId, VersionId, VersionSummary,
};
use crate::error::GatewayError;

/// Which backend operation a call was.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
    FetchDiagram,
    StoreDiagram,
    CreateRoadmap,
    UpdateRoadmap,
    FetchRoadmap,
    Lock,
    Unlock,
    ListVersions,
    FetchVersion,
    LogExport,
    ListComments,
}

/// One recorded call, with the arguments that matter for assertions.
#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    FetchDiagram(RoadmapId),
    StoreDiagram { id: RoadmapId, diagram_json: String },
    CreateRoadmap(RoadmapMeta),
    UpdateRoadmap { id: RoadmapId, patch: MetaPatch },
    FetchRoadmap(RoadmapId),
    Lock(RoadmapId),
    Unlock(RoadmapId),
    ListVersions(RoadmapId),
    FetchVersion { id: RoadmapId, version: VersionId },
    LogExport { id: RoadmapId, entry: ExportLogEntry },
    ListComments(RoadmapId),
}

impl BackendCall {
    pub fn kind(&self) -> CallKind {
        match self {
            BackendCall::FetchDiagram(_) => CallKind::FetchDiagram,
            BackendCall::StoreDiagram { .. } => CallKind::StoreDiagram,
            BackendCall::CreateRoadmap(_) => CallKind::CreateRoadmap,
            BackendCall::UpdateRoadmap { .. } => CallKind::UpdateRoadmap,
            BackendCall::FetchRoadmap(_) => CallKind::FetchRoadmap,
            BackendCall::Lock(_) => CallKind::Lock,
            BackendCall::Unlock(_) => CallKind::Unlock,
            BackendCall::ListVersions(_) => CallKind::ListVersions,
            BackendCall::FetchVersion { .. } => CallKind::FetchVersion,
            BackendCall::LogExport { .. } => CallKind::LogExport,
            BackendCall::ListComments(_) => CallKind::ListComments,
        }
    }
}

#[derive(Debug, Default)]
struct StoredRoadmap {
    record: Option<RoadmapRecord>,
    diagram_json: String,
    versions: Vec<(VersionSummary, String)>,
    comments: Vec<Comment>,
    /// The current user may read but not write.
    read_only: bool,
    locked_by_other: bool,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    roadmaps: HashMap<RoadmapId, StoredRoadmap>,
    calls: Vec<BackendCall>,
    failures: HashMap<CallKind, Vec<fn() -> GatewayError>>,
    store_delay: Option<Duration>,
    lock_delay: Option<Duration>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process roadmap backend that records every call.
///
/// Behaves like the HTTP backend for a single signed-in user: roadmaps can be marked read-only
/// (writes and locks answer `Forbidden`) or locked by someone else (locks and writes answer
/// `Conflict`). Each successful diagram store also records a version.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
    user: Option<UserId>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: impl Into<UserId>) -> Self {
        self.user = Some(user.into());
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means a test thread panicked mid-call; the data is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seeds a roadmap and returns its id. An empty `diagram_json` means "never saved".
    pub fn insert_roadmap(&self, meta: RoadmapMeta, diagram_json: impl Into<String>) -> RoadmapId {
        let mut state = self.state();
        let id = RoadmapId::from(state.next_id());
        state.roadmaps.insert(
            id.clone(),
            StoredRoadmap {
                record: Some(record_for(&id, &meta)),
                diagram_json: diagram_json.into(),
                ..Default::default()
            },
        );
        id
    }

    /// Seeds a historical version of `id`.
    pub fn insert_version(&self, id: &RoadmapId, diagram_json: impl Into<String>) -> VersionId {
        let mut state = self.state();
        let version = VersionId::from(state.next_id());
        let summary = VersionSummary {
            id: version.clone(),
            created_at: Utc::now(),
            author_id: self.user.clone(),
        };
        state
            .roadmaps
            .entry(id.clone())
            .or_default()
            .versions
            .push((summary, diagram_json.into()));
        version
    }

    pub fn insert_comment(&self, id: &RoadmapId, author: &str, content: &str) {
        let mut state = self.state();
        let comment = Comment {
            id: state.next_id().into(),
            author: author.to_string(),
            content: content.to_string(),
            created_at: Utc::now().to_rfc3339(),
        };
        state.roadmaps.entry(id.clone()).or_default().comments.push(comment);
    }

    /// Makes every write and lock on `id` answer `Forbidden`.
    pub fn set_read_only(&self, id: &RoadmapId, read_only: bool) {
        self.state().roadmaps.entry(id.clone()).or_default().read_only = read_only;
    }

    /// Makes locks and diagram writes on `id` answer `Conflict`.
    pub fn set_locked_by_other(&self, id: &RoadmapId, locked: bool) {
        self.state().roadmaps.entry(id.clone()).or_default().locked_by_other = locked;
    }

    /// The next call of `kind` fails with the error `make` builds. Queued failures are consumed
    /// in order.
    pub fn fail_next(&self, kind: CallKind, make: fn() -> GatewayError) {
        self.state().failures.entry(kind).or_default().push(make);
    }

    /// Delays every diagram store, so tests can observe a save in flight.
    pub fn set_store_delay(&self, delay: Option<Duration>) {
        self.state().store_delay = delay;
    }

    /// Delays every lock request, so tests can observe one in flight.
    pub fn set_lock_delay(&self, delay: Option<Duration>) {
        self.state().lock_delay = delay;
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state().calls.clone()
    }

    pub fn count(&self, kind: CallKind) -> usize {
        self.state().calls.iter().filter(|c| c.kind() == kind).count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Stored diagram body of `id`, if the roadmap exists.
    pub fn diagram_json(&self, id: &RoadmapId) -> Option<String> {
        self.state().roadmaps.get(id).map(|r| r.diagram_json.clone())
    }

    pub fn record(&self, id: &RoadmapId) -> Option<RoadmapRecord> {
        self.state().roadmaps.get(id).and_then(|r| r.record.clone())
    }

    /// Records `call` and returns the queued failure for it, if any.
    fn enter(&self, call: BackendCall) -> Result<(), GatewayError> {
        let mut state = self.state();
        let kind = call.kind();
        state.calls.push(call);
        match state.failures.get_mut(&kind) {
            Some(queue) if !queue.is_empty() => Err(queue.remove(0)()),
            _ => Ok(()),
        }
    }

    fn with_roadmap<T>(
        &self,
        id: &RoadmapId,
        f: impl FnOnce(&mut StoredRoadmap) -> Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        let mut state = self.state();
        let roadmap = state
            .roadmaps
            .get_mut(id)
            .filter(|r| r.record.is_some())
            .ok_or(GatewayError::NotFound)?;
        f(roadmap)
    }
}

fn record_for(id: &RoadmapId, meta: &RoadmapMeta) -> RoadmapRecord {
    RoadmapRecord {
        id: id.clone(),
        title: meta.title.clone(),
        description: meta.description.clone(),
        visibility: meta.visibility,
    }
}

fn writable(roadmap: &StoredRoadmap) -> Result<(), GatewayError> {
    if roadmap.read_only {
        Err(GatewayError::Forbidden)
    } else if roadmap.locked_by_other {
        Err(GatewayError::Conflict)
    } else {
        Ok(())
    }
}

#[async_trait]
impl RoadmapBackend for MemoryBackend {
    async fn fetch_diagram(&self, id: &RoadmapId) -> Result<String, GatewayError> {
        self.enter(BackendCall::FetchDiagram(id.clone()))?;
        self.with_roadmap(id, |r| Ok(r.diagram_json.clone()))
    }

    async fn store_diagram(&self, id: &RoadmapId, diagram_json: String) -> Result<(), GatewayError> {
        self.enter(BackendCall::StoreDiagram {
            id: id.clone(),
            diagram_json: diagram_json.clone(),
        })?;
        let delay = self.state().store_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let version = VersionId::from(self.state().next_id());
        let author = self.user.clone();
        self.with_roadmap(id, |r| {
            writable(r)?;
            r.versions.insert(
                0,
                (
                    VersionSummary {
                        id: version,
                        created_at: Utc::now(),
                        author_id: author,
                    },
                    diagram_json.clone(),
                ),
            );
            r.diagram_json = diagram_json;
            Ok(())
        })
    }

    async fn create_roadmap(&self, meta: &RoadmapMeta) -> Result<RoadmapRecord, GatewayError> {
        self.enter(BackendCall::CreateRoadmap(meta.clone()))?;
        let mut state = self.state();
        let id = RoadmapId::from(state.next_id());
        let record = record_for(&id, meta);
        state.roadmaps.insert(
            id,
            StoredRoadmap {
                record: Some(record.clone()),
                ..Default::default()
            },
        );
        Ok(record)
    }

    async fn update_roadmap(&self, id: &RoadmapId, patch: &MetaPatch) -> Result<(), GatewayError> {
        self.enter(BackendCall::UpdateRoadmap {
            id: id.clone(),
            patch: patch.clone(),
        })?;
        self.with_roadmap(id, |r| {
            if r.read_only {
                return Err(GatewayError::Forbidden);
            }
            if let Some(record) = r.record.as_mut() {
                let mut meta = record.meta();
                meta.apply(patch);
                *record = record_for(&record.id, &meta);
            }
            Ok(())
        })
    }

    async fn fetch_roadmap(&self, id: &RoadmapId) -> Result<RoadmapRecord, GatewayError> {
        self.enter(BackendCall::FetchRoadmap(id.clone()))?;
        self.with_roadmap(id, |r| r.record.clone().ok_or(GatewayError::NotFound))
    }

    async fn lock(&self, id: &RoadmapId) -> Result<(), GatewayError> {
        self.enter(BackendCall::Lock(id.clone()))?;
        let delay = self.state().lock_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.with_roadmap(id, |r| writable(r))
    }

    async fn unlock(&self, id: &RoadmapId) -> Result<(), GatewayError> {
        self.enter(BackendCall::Unlock(id.clone()))?;
        self.with_roadmap(id, |_| Ok(()))
    }

    async fn list_versions(&self, id: &RoadmapId) -> Result<Vec<VersionSummary>, GatewayError> {
        self.enter(BackendCall::ListVersions(id.clone()))?;
        self.with_roadmap(id, |r| Ok(r.versions.iter().map(|(s, _)| s.clone()).collect()))
    }

    async fn fetch_version(&self, id: &RoadmapId, version: &VersionId) -> Result<String, GatewayError> {
        self.enter(BackendCall::FetchVersion {
            id: id.clone(),
            version: version.clone(),
        })?;
        self.with_roadmap(id, |r| {
            r.versions
                .iter()
                .find(|(s, _)| &s.id == version)
                .map(|(_, json)| json.clone())
                .ok_or(GatewayError::NotFound)
        })
    }

    async fn log_export(&self, id: &RoadmapId, entry: &ExportLogEntry) -> Result<(), GatewayError> {
        self.enter(BackendCall::LogExport {
            id: id.clone(),
            entry: entry.clone(),
        })?;
        self.with_roadmap(id, |_| Ok(()))
    }

    async fn list_comments(&self, id: &RoadmapId) -> Result<Vec<Comment>, GatewayError> {
        self.enter(BackendCall::ListComments(id.clone()))?;
        self.with_roadmap(id, |r| Ok(r.comments.clone()))
    }
}
