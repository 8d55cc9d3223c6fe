pub mod draft;
pub mod gateway;

pub use draft::{Draft, DraftStore, FileDraftStore, MemoryDraftStore};
pub use gateway::{DiagramGateway, SaveOutcome};
