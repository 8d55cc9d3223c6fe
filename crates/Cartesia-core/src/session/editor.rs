use chrono::{DateTime, Utc};
use roadmap_canvas::model::RoadmapDiagram;
use roadmap_canvas::{Canvas, CanvasConfig, Gesture, LogicEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

use super::lock::{EditMode, LockNotice, LockState};
use crate::domain::{MetaPatch, RoadmapId, RoadmapMeta, VersionSummary};
use crate::error::{GatewayError, SessionError, SessionResult};
use crate::export::ViewOverrides;
use crate::store::{DiagramGateway, DraftStore, SaveOutcome};

/// Where the session's roadmap is persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionTarget {
    Remote(RoadmapId),
    /// Not yet published; persisted through the draft store.
    Local,
}

/// How opening the session went. Every variant leaves a usable (possibly empty) diagram.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// Nothing was saved yet.
    Empty,
    /// The stored diagram could not be read; the session starts empty.
    Invalid(String),
    /// The backend could not be reached; the session starts empty.
    Unavailable(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved { at: DateTime<Utc> },
    /// Saved into a newly created roadmap because `previous` was not writable.
    Forked { previous: RoadmapId, current: RoadmapId },
    Failed(String),
}

/// Result of a successful [`EditorSession::save`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SavedTo {
    Draft,
    Roadmap(SaveOutcome),
}

pub(crate) struct Inner {
    pub(crate) target: SessionTarget,
    pub(crate) meta: RoadmapMeta,
    pub(crate) diagram: RoadmapDiagram,
    pub(crate) lock: LockState,
    pub(crate) canvas: Canvas,
    /// Present while an export holds the canvas.
    pub(crate) export: Option<ViewOverrides>,
    revision: u64,
    saved_revision: u64,
    save_status: SaveStatus,
    load_outcome: LoadOutcome,
    closed: bool,
}

impl Inner {
    fn new(target: SessionTarget, lock: LockState) -> Self {
        let mut canvas = Canvas::new(CanvasConfig::default());
        canvas.set_access(lock.access());
        Self {
            target,
            meta: RoadmapMeta::default(),
            diagram: RoadmapDiagram::new(),
            lock,
            canvas,
            export: None,
            revision: 0,
            saved_revision: 0,
            save_status: SaveStatus::Idle,
            load_outcome: LoadOutcome::Empty,
            closed: false,
        }
    }

    pub(crate) fn ensure_open(&self) -> SessionResult<()> {
        if self.closed {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    fn ensure_idle(&self) -> SessionResult<()> {
        self.ensure_open()?;
        if self.export.is_some() {
            return Err(SessionError::ExportInProgress);
        }
        Ok(())
    }

    fn sync_access(&mut self) {
        self.canvas.set_access(self.lock.access());
    }

    fn remote_id(&self) -> Option<RoadmapId> {
        match &self.target {
            SessionTarget::Remote(id) => Some(id.clone()),
            SessionTarget::Local => None,
        }
    }
}

/// Raised flag for an outstanding save or lock request. Lowered on drop, however the request
/// finishes.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    /// `None` when the flag is already raised.
    fn raise(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One open roadmap in the editor.
///
/// Owns exactly one diagram, one metadata record and one lock state. All user edits go through
/// [`EditorSession::apply`], which enforces the lock. Methods take `&self`; the internal state is
/// never held across an await, so a save can be in flight while the host keeps reading state.
pub struct EditorSession {
    gateway: DiagramGateway,
    drafts: Arc<dyn DraftStore>,
    inner: Mutex<Inner>,
    saving: AtomicBool,
    locking: AtomicBool,
}

impl EditorSession {
    fn with_inner(gateway: DiagramGateway, drafts: Arc<dyn DraftStore>, inner: Inner) -> Self {
        Self {
            gateway,
            drafts,
            inner: Mutex::new(inner),
            saving: AtomicBool::new(false),
            locking: AtomicBool::new(false),
        }
    }

    /// Opens a backend roadmap: loads its diagram and metadata, then tries to take the edit lock.
    ///
    /// Load failures never fail the call; they leave an empty diagram and are reported through
    /// [`EditorSession::load_outcome`]. Lock failures leave the session read-only.
    #[tracing::instrument(skip(gateway, drafts), fields(roadmap_id = %id))]
    pub async fn open_remote(gateway: DiagramGateway, drafts: Arc<dyn DraftStore>, id: RoadmapId) -> Self {
        let mut inner = Inner::new(SessionTarget::Remote(id.clone()), LockState::new());

        match gateway.load_diagram(&id).await {
            Ok(diagram) => {
                inner.diagram = diagram;
                inner.load_outcome = LoadOutcome::Loaded;
            }
            Err(GatewayError::NotFound) => {
                tracing::info!(roadmap_id = %id, "no saved diagram, starting empty");
                inner.load_outcome = LoadOutcome::Empty;
            }
            Err(GatewayError::Parse(err)) => {
                tracing::warn!(roadmap_id = %id, error = %err, "stored diagram is invalid, starting empty");
                inner.load_outcome = LoadOutcome::Invalid(err.to_string());
            }
            Err(err) => {
                tracing::warn!(roadmap_id = %id, error = %err, "could not load diagram");
                inner.load_outcome = LoadOutcome::Unavailable(err.to_string());
            }
        }

        match gateway.fetch_meta(&id).await {
            Ok(meta) => inner.meta = meta,
            Err(err) => tracing::warn!(roadmap_id = %id, error = %err, "could not load roadmap metadata"),
        }

        let session = Self::with_inner(gateway, drafts, inner);
        session.acquire_lock().await;
        session
    }

    /// Opens the local draft. Local sessions are editable right away; there is nothing to lock.
    #[tracing::instrument(skip(gateway, drafts))]
    pub fn open_local(gateway: DiagramGateway, drafts: Arc<dyn DraftStore>) -> Self {
        let mut inner = Inner::new(SessionTarget::Local, LockState::local());

        match drafts.load() {
            Ok(Some(draft)) => {
                inner.meta = draft.meta;
                inner.diagram = draft.diagram;
                inner.load_outcome = LoadOutcome::Loaded;
            }
            Ok(None) => inner.load_outcome = LoadOutcome::Empty,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "draft is unreadable, starting empty");
                inner.load_outcome = LoadOutcome::Invalid(format!("{err:#}"));
            }
        }

        Self::with_inner(gateway, drafts, inner)
    }

    pub(crate) fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn gateway(&self) -> &DiagramGateway {
        &self.gateway
    }

    pub fn target(&self) -> SessionTarget {
        self.lock_inner().target.clone()
    }

    pub fn roadmap_id(&self) -> Option<RoadmapId> {
        self.lock_inner().remote_id()
    }

    pub fn meta(&self) -> RoadmapMeta {
        self.lock_inner().meta.clone()
    }

    /// A copy of the diagram currently shown.
    pub fn diagram(&self) -> RoadmapDiagram {
        self.lock_inner().diagram.clone()
    }

    /// Runs `f` against the diagram currently shown without copying it.
    pub fn with_diagram<T>(&self, f: impl FnOnce(&RoadmapDiagram) -> T) -> T {
        f(&self.lock_inner().diagram)
    }

    pub fn edit_mode(&self) -> EditMode {
        self.lock_inner().lock.mode()
    }

    pub fn lock_notice(&self) -> LockNotice {
        self.lock_inner().lock.notice().clone()
    }

    pub fn load_outcome(&self) -> LoadOutcome {
        self.lock_inner().load_outcome.clone()
    }

    pub fn save_status(&self) -> SaveStatus {
        self.lock_inner().save_status.clone()
    }

    /// True while a save or publish is outstanding; the host disables its save control.
    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::Acquire)
    }

    /// True while a lock request is outstanding; the host disables its retry control.
    pub fn is_locking(&self) -> bool {
        self.locking.load(Ordering::Acquire)
    }

    /// True when edits were made since the last successful save.
    pub fn is_dirty(&self) -> bool {
        let inner = self.lock_inner();
        inner.revision != inner.saved_revision
    }

    pub fn is_exporting(&self) -> bool {
        self.lock_inner().export.is_some()
    }

    /// Visibility overrides of the export in progress, if any.
    pub fn view_overrides(&self) -> Option<ViewOverrides> {
        self.lock_inner().export
    }

    pub fn is_closed(&self) -> bool {
        self.lock_inner().closed
    }

    pub fn set_canvas_config(&self, config: CanvasConfig) {
        self.lock_inner().canvas.config = config;
    }

    /// Applies one user gesture. Rejected while read-only, while an export holds the canvas, and
    /// after teardown.
    pub fn apply(&self, gesture: Gesture) -> SessionResult<Vec<LogicEvent>> {
        let mut guard = self.lock_inner();
        guard.ensure_idle()?;
        let inner = &mut *guard;
        let events = inner.canvas.dispatch(gesture, &mut inner.diagram)?;
        inner.revision += 1;
        Ok(events)
    }

    /// Tries to take the edit lock. Failures are recorded in the lock state, not returned.
    ///
    /// Sends nothing when the lock is already held or another lock request is outstanding; the
    /// current mode is returned instead.
    #[tracing::instrument(skip(self))]
    pub async fn acquire_lock(&self) -> EditMode {
        let Some(_locking) = InFlight::raise(&self.locking) else {
            tracing::debug!("lock request already outstanding");
            return self.edit_mode();
        };
        let id = {
            let inner = self.lock_inner();
            if inner.closed || inner.lock.holds_lock() {
                return inner.lock.mode();
            }
            match inner.remote_id() {
                Some(id) => id,
                None => return inner.lock.mode(),
            }
        };

        let result = self.gateway.lock(&id).await;

        let mut inner = self.lock_inner();
        if inner.closed || inner.remote_id().as_ref() != Some(&id) {
            // Session moved on while the request was out; do not keep a lock nobody will release.
            if result.is_ok() {
                drop(inner);
                self.spawn_unlock(id);
                return self.edit_mode();
            }
            return inner.lock.mode();
        }
        match result {
            Ok(()) => {
                tracing::info!(roadmap_id = %id, "edit lock acquired");
                inner.lock.on_acquired();
            }
            Err(err) => {
                tracing::info!(roadmap_id = %id, error = %err, "edit lock not acquired");
                inner.lock.on_acquire_failed(&err);
            }
        }
        inner.sync_access();
        inner.lock.mode()
    }

    /// Gives the edit lock back. The session is read-only afterwards even if the request failed.
    #[tracing::instrument(skip(self))]
    pub async fn release_lock(&self) -> SessionResult<()> {
        let id = {
            let mut inner = self.lock_inner();
            inner.ensure_open()?;
            let id = inner.remote_id().filter(|_| inner.lock.holds_lock());
            if id.is_some() {
                inner.lock.on_released();
                inner.sync_access();
            }
            id
        };

        if let Some(id) = id {
            self.gateway.unlock(&id).await?;
            tracing::info!(roadmap_id = %id, "edit lock released");
        }
        Ok(())
    }

    /// Closes the session. If a lock is held, its release is started on the current tokio
    /// runtime and not awaited; release errors are swallowed. Later calls do nothing.
    pub fn teardown(&self) -> Option<JoinHandle<()>> {
        let id = {
            let mut inner = self.lock_inner();
            if inner.closed {
                return None;
            }
            inner.closed = true;
            let id = inner.remote_id().filter(|_| inner.lock.holds_lock());
            inner.lock.on_released();
            inner.sync_access();
            id
        };
        id.and_then(|id| self.spawn_unlock(id))
    }

    fn spawn_unlock(&self, id: RoadmapId) -> Option<JoinHandle<()>> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(roadmap_id = %id, "no runtime to release the lock on, leaving it to expire");
            return None;
        };
        let gateway = self.gateway.clone();
        Some(runtime.spawn(async move {
            if let Err(err) = gateway.unlock(&id).await {
                tracing::debug!(roadmap_id = %id, error = %err, "lock release on teardown failed");
            }
        }))
    }

    /// Saves the diagram to wherever the session persists.
    ///
    /// Remote sessions fall back to a new roadmap when the current one is not writable; the
    /// session then continues on the new id and tries to lock it. A second save while one is
    /// outstanding is rejected with [`SessionError::SaveInFlight`].
    #[tracing::instrument(skip(self))]
    pub async fn save(&self) -> SessionResult<SavedTo> {
        let _saving = InFlight::raise(&self.saving).ok_or(SessionError::SaveInFlight)?;

        let (target, meta, diagram, revision) = {
            let mut inner = self.lock_inner();
            inner.ensure_idle()?;
            inner.save_status = SaveStatus::Saving;
            (
                inner.target.clone(),
                inner.meta.clone(),
                inner.diagram.clone(),
                inner.revision,
            )
        };

        match target {
            SessionTarget::Local => {
                let result = self.drafts.save(&meta, &diagram);
                let mut inner = self.lock_inner();
                match result {
                    Ok(()) => {
                        inner.saved_revision = revision;
                        inner.save_status = SaveStatus::Saved { at: Utc::now() };
                        Ok(SavedTo::Draft)
                    }
                    Err(err) => {
                        inner.save_status = SaveStatus::Failed(format!("{err:#}"));
                        Err(SessionError::Draft(err))
                    }
                }
            }
            SessionTarget::Remote(id) => {
                let result = self.gateway.save_or_fork(&id, &meta, &diagram).await;
                let outcome = {
                    let mut inner = self.lock_inner();
                    match result {
                        Ok(outcome) => {
                            inner.saved_revision = revision;
                            inner.save_status = match &outcome {
                                SaveOutcome::Saved { .. } => SaveStatus::Saved { at: Utc::now() },
                                SaveOutcome::Forked { previous, current } => SaveStatus::Forked {
                                    previous: previous.clone(),
                                    current: current.clone(),
                                },
                            };
                            outcome
                        }
                        Err(err) => {
                            tracing::warn!(roadmap_id = %id, error = %err, "save failed");
                            inner.save_status = SaveStatus::Failed(err.to_string());
                            return Err(err.into());
                        }
                    }
                };

                if let SaveOutcome::Forked { previous, current } = &outcome {
                    self.switch_roadmap(previous, current.clone()).await;
                }
                Ok(SavedTo::Roadmap(outcome))
            }
        }
    }

    /// Moves the session onto `current`, handing back any lock held on `previous`.
    async fn switch_roadmap(&self, previous: &RoadmapId, current: RoadmapId) {
        let held = {
            let mut inner = self.lock_inner();
            inner.target = SessionTarget::Remote(current);
            let held = inner.lock.holds_lock();
            inner.lock.on_released();
            inner.sync_access();
            held
        };
        if held && let Err(err) = self.gateway.unlock(previous).await {
            tracing::debug!(roadmap_id = %previous, error = %err, "could not release lock on the previous roadmap");
        }
        self.acquire_lock().await;
    }

    /// Publishes a local draft as a new backend roadmap and continues on it.
    #[tracing::instrument(skip(self))]
    pub async fn publish(&self) -> SessionResult<RoadmapId> {
        let _saving = InFlight::raise(&self.saving).ok_or(SessionError::SaveInFlight)?;

        let (meta, diagram, revision) = {
            let mut inner = self.lock_inner();
            inner.ensure_idle()?;
            if inner.target != SessionTarget::Local {
                return Err(SessionError::AlreadyPublished);
            }
            inner.save_status = SaveStatus::Saving;
            (inner.meta.clone(), inner.diagram.clone(), inner.revision)
        };

        let published = async {
            let record = self.gateway.create_roadmap(&meta).await?;
            self.gateway.save_diagram(&record.id, &diagram).await?;
            Ok::<_, GatewayError>(record.id)
        }
        .await;

        let id = {
            let mut inner = self.lock_inner();
            match published {
                Ok(id) => {
                    inner.target = SessionTarget::Remote(id.clone());
                    inner.lock = LockState::new();
                    inner.sync_access();
                    inner.saved_revision = revision;
                    inner.save_status = SaveStatus::Saved { at: Utc::now() };
                    id
                }
                Err(err) => {
                    inner.save_status = SaveStatus::Failed(err.to_string());
                    return Err(err.into());
                }
            }
        };

        tracing::info!(roadmap_id = %id, "draft published");
        if let Err(err) = self.drafts.clear() {
            tracing::warn!(error = %format!("{err:#}"), "published draft could not be cleared");
        }
        self.acquire_lock().await;
        Ok(id)
    }

    /// Changes title, description or visibility.
    ///
    /// The in-memory metadata is updated first, so a later fork uses it even if the backend
    /// rejected the update.
    #[tracing::instrument(skip(self))]
    pub async fn update_meta(&self, patch: MetaPatch) -> SessionResult<()> {
        let (target, meta, diagram) = {
            let mut inner = self.lock_inner();
            inner.ensure_open()?;
            inner.meta.apply(&patch);
            (inner.target.clone(), inner.meta.clone(), inner.diagram.clone())
        };

        match target {
            SessionTarget::Remote(id) => Ok(self.gateway.update_meta(&id, &patch).await?),
            SessionTarget::Local => self.drafts.save(&meta, &diagram).map_err(SessionError::Draft),
        }
    }

    pub async fn list_versions(&self) -> SessionResult<Vec<VersionSummary>> {
        let id = {
            let inner = self.lock_inner();
            inner.ensure_open()?;
            inner.remote_id().ok_or(SessionError::NotRemote)?
        };
        Ok(self.gateway.list_versions(&id).await?)
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        let _ = self.teardown();
    }
}
