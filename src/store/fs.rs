use async_trait::async_trait;
use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};
use tokio::fs;
use tracing::debug;

use super::{ObjectRef, ObjectStore, StoreError};

/// Local directory standing in for an object store: `<root>/<container>/<key>`.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an object to a path under the root, refusing anything that
    /// could escape it.
    pub fn path_for(&self, object: &ObjectRef) -> Result<PathBuf, StoreError> {
        let mut path = self.root.clone();
        for part in [object.container.as_str(), object.key.as_str()] {
            let rel = Path::new(part);
            let clean = !part.is_empty()
                && rel.components().all(|c| matches!(c, Component::Normal(_)));
            if !clean {
                return Err(StoreError::InvalidKey {
                    key: part.to_string(),
                });
            }
            path.push(rel);
        }
        Ok(path)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, object: &ObjectRef) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(object)?;
        match fs::read(&path).await {
            Ok(bytes) => {
                debug!(path = %path.display(), bytes = bytes.len(), "read object");
                Ok(bytes)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(object.clone())),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    async fn put(&self, object: &ObjectRef, body: Vec<u8>) -> Result<(), StoreError> {
        let path = self.path_for(object)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        fs::write(&path, &body)
            .await
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), bytes = body.len(), "wrote object");
        Ok(())
    }
}
