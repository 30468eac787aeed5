//! Port interfaces for the generation domain

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::generation::{GenerationError, TargetLanguage};

/// Access to the directory generated bindings are written to
#[async_trait]
pub trait OutputService: Send + Sync {
    /// Create `path` and every missing ancestor; succeeds if it already exists
    async fn ensure_directory(&self, path: &Path) -> Result<(), GenerationError>;

    /// Every generated source file for `target` below `dir`, in sorted order
    async fn list_artifacts(
        &self,
        dir: &Path,
        target: TargetLanguage,
    ) -> Result<Vec<PathBuf>, GenerationError>;
}
