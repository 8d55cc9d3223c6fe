//! # Cartesia Core
//!
//! Editor sessions for Cartesia roadmaps: loading and saving diagrams against the roadmap
//! backend, the edit lock, the fork-on-save fallback, local drafts and print export.
//!
//! Diagram editing itself lives in `roadmap_canvas`; this crate wires it to persistence.

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod session;
pub mod store;

pub use config::ClientConfig;
pub use error::{GatewayError, SessionError, SessionResult};
pub use export::{ExportOptions, PrintDocument, PrintOutcome, PrintRenderer, ViewOverrides};
pub use session::{EditMode, EditorSession, LockNotice, SaveStatus, SavedTo, SessionTarget};
pub use store::{DiagramGateway, DraftStore, FileDraftStore, MemoryDraftStore, SaveOutcome};
