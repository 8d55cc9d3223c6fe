use roadmap_canvas::Access;

use crate::error::GatewayError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EditMode {
    #[default]
    ReadOnly,
    Editable,
}

/// Why a session is read-only, for the banner the host shows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LockNotice {
    #[default]
    None,
    /// Someone else holds the edit lock.
    LockedByOther,
    /// The current user may not edit this roadmap.
    NoPermission,
    /// The lock request itself failed (network, server error).
    Unavailable(String),
}

/// Edit-lock state of one session.
///
/// Starts `ReadOnly`. Only a confirmed lock makes it `Editable`; a failed acquisition leaves it
/// `ReadOnly` with a notice and is never retried automatically.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LockState {
    mode: EditMode,
    notice: LockNotice,
    holds_lock: bool,
}

impl LockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of a session with no backend roadmap: editable, nothing to lock.
    pub fn local() -> Self {
        Self {
            mode: EditMode::Editable,
            notice: LockNotice::None,
            holds_lock: false,
        }
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn notice(&self) -> &LockNotice {
        &self.notice
    }

    /// True while a server lock was acquired and not yet released.
    pub fn holds_lock(&self) -> bool {
        self.holds_lock
    }

    pub fn access(&self) -> Access {
        match self.mode {
            EditMode::Editable => Access::Editable,
            EditMode::ReadOnly => Access::ReadOnly,
        }
    }

    pub fn on_acquired(&mut self) {
        self.mode = EditMode::Editable;
        self.notice = LockNotice::None;
        self.holds_lock = true;
    }

    /// Records a refused or failed lock request. A lock already held stays held: the server
    /// keeps it until it is released, whatever a later request answered.
    pub fn on_acquire_failed(&mut self, err: &GatewayError) {
        if self.holds_lock {
            return;
        }
        self.mode = EditMode::ReadOnly;
        self.notice = match err {
            GatewayError::Conflict => LockNotice::LockedByOther,
            GatewayError::Forbidden | GatewayError::Unauthorized => LockNotice::NoPermission,
            other => LockNotice::Unavailable(other.to_string()),
        };
    }

    /// Explicit release or teardown.
    pub fn on_released(&mut self) {
        self.mode = EditMode::ReadOnly;
        self.notice = LockNotice::None;
        self.holds_lock = false;
    }
}
