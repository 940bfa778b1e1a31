use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::errors::AppError;

pub mod local;

/// Where uploaded bytes end up. The upload use case only ever talks to
/// this trait, so a bucket-backed implementation can be swapped in
/// without touching callers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Persists a staged upload under `stored_name`, returning the final path.
    async fn persist(&self, source: &Path, stored_name: &str) -> Result<PathBuf, AppError>;
}
