use roadmap_canvas::GestureError;
use roadmap_canvas::persistence::{EncodeError, ParseError};

/// Failures of the roadmap backend, classified by what the caller can do about them.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Unknown roadmap or version, or a roadmap whose diagram was never saved.
    #[error("roadmap not found")]
    NotFound,
    /// The current user may not write this roadmap.
    #[error("permission denied")]
    Forbidden,
    /// The roadmap is locked by someone else.
    #[error("roadmap is locked by another editor")]
    Conflict,
    #[error("authentication required")]
    Unauthorized,
    #[error("stored diagram is invalid: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
    /// Connection failures, timeouts and undecodable responses.
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport(err.to_string())
    }
}

impl From<url::ParseError> for GatewayError {
    fn from(err: url::ParseError) -> Self {
        GatewayError::Transport(format!("invalid endpoint url: {err}"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("a save is already in progress")]
    SaveInFlight,
    #[error("the canvas is held by an export")]
    ExportInProgress,
    #[error("the session has been closed")]
    Closed,
    #[error("the session is not backed by a remote roadmap")]
    NotRemote,
    #[error("the roadmap is already published")]
    AlreadyPublished,
    #[error(transparent)]
    Gesture(#[from] GestureError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("draft store failed: {0:#}")]
    Draft(anyhow::Error),
    #[error("print renderer failed: {0:#}")]
    Render(anyhow::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;
