use async_trait::async_trait;
use std::{collections::HashMap, sync::Mutex};

use super::{ObjectRef, ObjectStore, StoreError};

/// In-process store keyed by `(container, key)`.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<ObjectRef, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, object: ObjectRef, body: impl Into<Vec<u8>>) {
        self.lock().insert(object, body.into());
    }

    /// Snapshot of one object, if present.
    pub fn object(&self, object: &ObjectRef) -> Option<Vec<u8>> {
        self.lock().get(object).cloned()
    }

    /// All keys stored under `container`, sorted.
    pub fn keys(&self, container: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .lock()
            .keys()
            .filter(|o| o.container == container)
            .map(|o| o.key.clone())
            .collect();
        keys.sort();
        keys
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ObjectRef, Vec<u8>>> {
        // a poisoned map is still a valid map
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, object: &ObjectRef) -> Result<Vec<u8>, StoreError> {
        self.lock()
            .get(object)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(object.clone()))
    }

    async fn put(&self, object: &ObjectRef, body: Vec<u8>) -> Result<(), StoreError> {
        self.lock().insert(object.clone(), body);
        Ok(())
    }
}
