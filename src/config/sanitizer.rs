//! Option sanitizer: fills every default and expands input patterns

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::PluginOptions;
use crate::generation::inputs::{absolute_pattern, expand_patterns};
use crate::generation::{FreshnessPolicy, GenerationError, TargetLanguage};

/// Generator looked up on `PATH` when no explicit path is configured
pub const DEFAULT_BINDGEN_PATH: &str = "tx3-bindgen";
pub const DEFAULT_OUTPUT_DIR: &str = "node_modules/.tx3";
pub const DEFAULT_TRP_ENDPOINT: &str = "http://localhost:3000";
pub const DEFAULT_ALIAS: &str = "@tx3";

/// Fully defaulted configuration shared by every generation run
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub project_root: PathBuf,
    pub bindgen_path: String,
    /// Patterns as written by the user, kept for error messages
    pub input_patterns: Vec<String>,
    /// Patterns made absolute against `project_root`
    pub absolute_patterns: Vec<String>,
    pub input_files: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub bindgen_args: Vec<String>,
    pub target: TargetLanguage,
    pub trp_endpoint: String,
    pub trp_headers: BTreeMap<String, String>,
    pub env_args: BTreeMap<String, String>,
    pub freshness: FreshnessPolicy,
    pub alias: String,
}

/// Normalizes `options` into a [`GenerationConfig`] rooted at `project_root`.
///
/// Nothing beyond defaulting happens here: an unreachable generator or
/// endpoint only fails when it is used, and an empty input set is rejected by
/// the coordinator when generation is attempted.
pub fn sanitize_options(
    options: PluginOptions,
    project_root: &Path,
) -> Result<GenerationConfig, GenerationError> {
    let absolute_patterns = options
        .input_files
        .iter()
        .map(|pattern| absolute_pattern(pattern, project_root))
        .collect::<Result<Vec<_>, _>>()?;
    let input_files = expand_patterns(&absolute_patterns)?;

    let output_dir = project_root.join(
        options
            .output_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
    );

    Ok(GenerationConfig {
        project_root: project_root.to_path_buf(),
        bindgen_path: options
            .bindgen_path
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BINDGEN_PATH.to_string()),
        input_patterns: options.input_files,
        absolute_patterns,
        input_files,
        output_dir,
        bindgen_args: options.bindgen_args.unwrap_or_default(),
        target: options.target.unwrap_or_default(),
        trp_endpoint: options
            .trp_endpoint
            .unwrap_or_else(|| DEFAULT_TRP_ENDPOINT.to_string()),
        trp_headers: options.trp_headers.unwrap_or_default(),
        env_args: options.env_args.unwrap_or_default(),
        freshness: options.freshness.unwrap_or_default(),
        alias: options.alias.unwrap_or_else(|| DEFAULT_ALIAS.to_string()),
    })
}
