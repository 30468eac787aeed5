//! Filesystem-based output directory management

use async_trait::async_trait;
use glob::Pattern;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;

use crate::generation::{GenerationError, OutputService, TargetLanguage};

/// Output service backed by the local filesystem
pub struct FileSystemOutputService;

impl FileSystemOutputService {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FileSystemOutputService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputService for FileSystemOutputService {
    async fn ensure_directory(&self, path: &Path) -> Result<(), GenerationError> {
        fs::create_dir_all(path)
            .await
            .map_err(|source| GenerationError::OutputDirectory {
                path: path.to_path_buf(),
                source,
            })
    }

    async fn list_artifacts(
        &self,
        dir: &Path,
        target: TargetLanguage,
    ) -> Result<Vec<PathBuf>, GenerationError> {
        if !fs::try_exists(dir).await? {
            return Ok(Vec::new());
        }

        let Some(dir_str) = dir.to_str() else {
            return Err(GenerationError::InvalidConfiguration(format!(
                "output directory {} is not valid UTF-8",
                dir.display()
            )));
        };
        let pattern = format!(
            "{}/**/*.{}",
            Pattern::escape(dir_str.trim_end_matches('/')),
            target.file_extension()
        );

        let entries = glob::glob(&pattern).map_err(|e| GenerationError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;

        let mut artifacts = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| GenerationError::IoError(e.into_error()))?;
            if path.is_file() {
                artifacts.push(path);
            }
        }
        Ok(artifacts)
    }
}

/// Resolves `output_dir` against `project_root` and creates it
pub async fn ensure_output_dir(
    output: &dyn OutputService,
    output_dir: &Path,
    project_root: &Path,
) -> Result<PathBuf, GenerationError> {
    let absolute = project_root.join(output_dir);
    output.ensure_directory(&absolute).await?;
    Ok(absolute)
}

/// Latest modification time among `paths`, `None` for an empty slice
pub async fn newest_modification(paths: &[PathBuf]) -> Result<Option<SystemTime>, GenerationError> {
    let mut newest = None;
    for path in paths {
        let modified = fs::metadata(path).await?.modified()?;
        newest = newest.max(Some(modified));
    }
    Ok(newest)
}
