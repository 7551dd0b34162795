// src/store/mod.rs

//! Object storage the converter reads its input from and writes Parquet to.
//!
//! - `fs`: a local directory tree, one sub-directory per container.
//! - `memory`: a process-local map, used by tests and embedders.

mod fs;
mod memory;

pub use fs::FsObjectStore;
pub use memory::MemoryObjectStore;

use async_trait::async_trait;
use std::{fmt, path::PathBuf};
use thiserror::Error;

/// Address of one stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub container: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(container: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.key)
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("object {0} not found")]
    NotFound(ObjectRef),

    #[error("key {key:?} is not a valid relative object path")]
    InvalidKey { key: String },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store rejected the request: {0}")]
    Rejected(String),
}

/// Whole-object GET/PUT. Calls are awaited one at a time by the handler; no
/// implementation retries.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, object: &ObjectRef) -> Result<Vec<u8>, StoreError>;

    async fn put(&self, object: &ObjectRef, body: Vec<u8>) -> Result<(), StoreError>;
}
