mod redb_storage;
mod traits;

pub use redb_storage::{RedbStorage, CURRENT_SCHEMA_VERSION};
pub use traits::{EntryStore, LinkRepository};
