pub mod editor;
pub mod lock;

pub use editor::{EditorSession, LoadOutcome, SaveStatus, SavedTo, SessionTarget};
pub use lock::{EditMode, LockNotice, LockState};
