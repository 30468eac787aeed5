//! User-facing plugin options, as written in `tx3.toml` or assembled by a caller

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::generation::{FreshnessPolicy, TargetLanguage};

/// Errors raised while loading options from disk
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Partially specified options. Only `input_files` is required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PluginOptions {
    /// tx3 files or glob patterns, relative to the project root
    pub input_files: Vec<String>,
    /// Path to the `tx3-bindgen` executable
    pub bindgen_path: Option<String>,
    /// Output directory for generated bindings (relative to the project root)
    pub output_dir: Option<PathBuf>,
    /// Extra arguments appended after every generated flag
    pub bindgen_args: Option<Vec<String>>,
    pub target: Option<TargetLanguage>,
    /// TRP endpoint baked into the generated bindings
    pub trp_endpoint: Option<String>,
    pub trp_headers: Option<BTreeMap<String, String>>,
    pub env_args: Option<BTreeMap<String, String>>,
    pub freshness: Option<FreshnessPolicy>,
    /// Import namespace mapped to the output directory
    pub alias: Option<String>,
}

impl PluginOptions {
    pub fn new<I, S>(input_files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input_files: input_files.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub async fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %path.display(), "Loaded tx3 plugin options");
        Self::from_toml_str(&content)
    }
}
