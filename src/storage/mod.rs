//! String key-value slots that outlive a session, in the shape of the
//! browser `localStorage` API.
mod error;
mod file;
mod memory;

pub use error::{StorageError, StorageResult};
pub use file::FileStorage;
pub use memory::InMemoryStorage;

/// A key-value store of strings.
pub trait LocalStorage: Send + Sync {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;
    /// Removing a missing key succeeds.
    fn remove_item(&self, key: &str) -> StorageResult<()>;
}
