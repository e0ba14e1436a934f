//! Storage layer: SQLite persistence and the async access handle.

pub mod handle;
pub mod schema;
pub mod sqlite;

pub use handle::StorageHandle;
pub use sqlite::{CommentInsert, SqliteStorage};
