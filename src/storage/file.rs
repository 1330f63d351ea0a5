use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::error::{StorageError, StorageResult};
use super::LocalStorage;

type Items = BTreeMap<String, String>;

/// Storage persisted as one JSON object in a file.
///
/// The file and its parent directories are created on the first write; a
/// missing or empty file reads as empty storage.
#[derive(Clone)]
pub struct FileStorage {
    path: Arc<PathBuf>,
    // Serializes read-modify-write cycles between clones.
    lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorage").field("path", &self.path).finish()
    }
}

impl FileStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Arc::new(path.as_ref().to_path_buf()),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<Items> {
        let contents = match fs::read_to_string(&*self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Items::new()),
            Err(err) => {
                return Err(StorageError::Io(format!(
                    "Failed to read {}: {err}",
                    self.path.display()
                )))
            }
        };
        if contents.trim().is_empty() {
            return Ok(Items::new());
        }
        serde_json::from_str(&contents).map_err(|err| {
            StorageError::Corrupt(format!("{}: {err}", self.path.display()))
        })
    }

    fn store(&self, items: &Items) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                StorageError::Io(format!("Failed to create {}: {err}", parent.display()))
            })?;
        }
        let serialized = serde_json::to_string_pretty(items)
            .map_err(|err| StorageError::Corrupt(err.to_string()))?;
        fs::write(&*self.path, serialized).map_err(|err| {
            StorageError::Io(format!("Failed to write {}: {err}", self.path.display()))
        })
    }
}

impl LocalStorage for FileStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.lock().unwrap();
        Ok(self.load()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.lock.lock().unwrap();
        let mut items = self.load()?;
        items.insert(key.to_string(), value.to_string());
        self.store(&items)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        let _guard = self.lock.lock().unwrap();
        let mut items = self.load()?;
        if items.remove(key).is_some() {
            self.store(&items)?;
        }
        Ok(())
    }
}
