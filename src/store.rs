//! Persistence collaborator: last-known documents and their fingerprints.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::StoreError;
use crate::fingerprint::Fingerprint;
use crate::types::ResourceKind;

/// Last successfully submitted state of one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResource {
    pub kind: ResourceKind,
    pub id: String,
    /// Outbound payload as last sent.
    pub document: Document,
    pub fingerprint: Fingerprint,
}

/// Storage for [`StoredResource`] records, keyed by kind and id.
pub trait StateStore {
    fn load(&self, kind: ResourceKind, id: &str) -> Result<Option<StoredResource>, StoreError>;
    fn save(&mut self, record: StoredResource) -> Result<(), StoreError>;
    fn remove(&mut self, kind: ResourceKind, id: &str) -> Result<(), StoreError>;
}

/// In-memory store; state is lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<(ResourceKind, String), StoredResource>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl StateStore for MemoryStore {
    fn load(&self, kind: ResourceKind, id: &str) -> Result<Option<StoredResource>, StoreError> {
        Ok(self.records.get(&(kind, id.to_string())).cloned())
    }

    fn save(&mut self, record: StoredResource) -> Result<(), StoreError> {
        self.records.insert((record.kind, record.id.clone()), record);
        Ok(())
    }

    fn remove(&mut self, kind: ResourceKind, id: &str) -> Result<(), StoreError> {
        self.records.remove(&(kind, id.to_string()));
        Ok(())
    }
}

/// Directory-backed store: one `<kind>/<hex id>.json` file per resource.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// File for one resource. The id is hex-encoded, so distinct ids never
    /// share a file and no id can leave the kind directory.
    fn path_for(&self, kind: ResourceKind, id: &str) -> PathBuf {
        self.root
            .join(kind.as_str())
            .join(format!("{}.json", hex::encode(id.as_bytes())))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl StateStore for FileStore {
    fn load(&self, kind: ResourceKind, id: &str) -> Result<Option<StoredResource>, StoreError> {
        let path = self.path_for(kind, id);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(io_error(&path))?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StoreError::Corrupt { path, source })
    }

    fn save(&mut self, record: StoredResource) -> Result<(), StoreError> {
        let path = self.path_for(record.kind, &record.id);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(io_error(dir))?;
        }
        let content = serde_json::to_string_pretty(&record)
            .map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?;
        std::fs::write(&path, content).map_err(io_error(&path))
    }

    fn remove(&mut self, kind: ResourceKind, id: &str) -> Result<(), StoreError> {
        let path = self.path_for(kind, id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}
