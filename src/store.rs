//! Where package bytes come from.
//!
//! The extractor never decides how packages are stored. A [`PackageStore`]
//! turns a reference id into a [`ReadAt`] source, or reports that the id
//! does not exist.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::io::{LocalFileReader, MemoryReader, ReadAt};

#[async_trait]
pub trait PackageStore: Send + Sync {
    type Reader: ReadAt + 'static;

    /// Open the stored file for `id`, or `None` if no such file exists.
    async fn open(&self, id: &str) -> Result<Option<Self::Reader>>;
}

/// Packages stored as files below a root directory; ids are relative paths.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve `id` below the root, refusing anything that could escape it.
    fn resolve(&self, id: &str) -> Option<PathBuf> {
        let relative = Path::new(id);
        let contained = !id.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        contained.then(|| self.root.join(relative))
    }
}

#[async_trait]
impl PackageStore for DirectoryStore {
    type Reader = LocalFileReader;

    async fn open(&self, id: &str) -> Result<Option<Self::Reader>> {
        let Some(path) = self.resolve(id) else {
            return Ok(None);
        };

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(LocalFileReader::new(&path)?)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Packages held in memory, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: HashMap<String, Arc<[u8]>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.files.insert(id.into(), bytes.into());
    }
}

#[async_trait]
impl PackageStore for MemoryStore {
    type Reader = MemoryReader;

    async fn open(&self, id: &str) -> Result<Option<Self::Reader>> {
        Ok(self.files.get(id).cloned().map(MemoryReader::new))
    }
}
