use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::error::StorageResult;
use super::LocalStorage;

/// Process-local storage; contents vanish with the process.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStorage {
    items: Arc<Mutex<BTreeMap<String, String>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LocalStorage for InMemoryStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.items.lock().unwrap().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.items
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.items.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let storage = InMemoryStorage::new();
        assert_eq!(storage.get_item("user").unwrap(), None);
        storage.set_item("user", "{}").unwrap();
        storage.set_item("user", "{\"id\":1}").unwrap();
        assert_eq!(storage.get_item("user").unwrap().as_deref(), Some("{\"id\":1}"));
        storage.remove_item("user").unwrap();
        storage.remove_item("user").unwrap();
        assert!(storage.is_empty());
    }
}
