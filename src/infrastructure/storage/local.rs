use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::errors::AppError;
use crate::infrastructure::storage::MediaStorage;

/// Flat on-disk storage: every upload lives directly under `root` as
/// `{id}{extension}`, no sidecar metadata.
pub struct LocalDiskStorage {
    root: PathBuf,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalDiskStorage { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl MediaStorage for LocalDiskStorage {
    async fn persist(&self, source: &Path, stored_name: &str) -> Result<PathBuf, AppError> {
        let destination = self.root.join(stored_name);
        tokio::fs::copy(source, &destination).await?;
        Ok(destination)
    }
}
