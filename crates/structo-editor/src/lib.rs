pub mod commands;
pub mod sync;

pub use commands::{Command, CommandStack};
pub use sync::{EditorError, SyncEngine, WorkspaceMutation};
