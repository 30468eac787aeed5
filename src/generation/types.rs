//! Core types for the generation domain

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Binding languages understood by `tx3-bindgen`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetLanguage {
    #[default]
    TypeScript,
    Rust,
    Python,
    Go,
}

impl TargetLanguage {
    /// Value passed to the generator's `-t` flag
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetLanguage::TypeScript => "typescript",
            TargetLanguage::Rust => "rust",
            TargetLanguage::Python => "python",
            TargetLanguage::Go => "go",
        }
    }

    /// Extension of the source files the generator emits for this language
    pub fn file_extension(&self) -> &'static str {
        match self {
            TargetLanguage::TypeScript => "ts",
            TargetLanguage::Rust => "rs",
            TargetLanguage::Python => "py",
            TargetLanguage::Go => "go",
        }
    }

    pub fn all() -> Vec<TargetLanguage> {
        vec![
            TargetLanguage::TypeScript,
            TargetLanguage::Rust,
            TargetLanguage::Python,
            TargetLanguage::Go,
        ]
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetLanguage {
    type Err = crate::generation::GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "typescript" | "ts" => Ok(TargetLanguage::TypeScript),
            "rust" | "rs" => Ok(TargetLanguage::Rust),
            "python" | "py" => Ok(TargetLanguage::Python),
            "go" | "golang" => Ok(TargetLanguage::Go),
            _ => Err(crate::generation::GenerationError::InvalidLanguage(
                s.to_string(),
            )),
        }
    }
}

/// How `ensure_fresh` decides that generated bindings need rebuilding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FreshnessPolicy {
    /// Stale only when the output directory holds no artifact at all
    #[default]
    Presence,
    /// Also stale when any input file is newer than the newest artifact
    ModifiedTime,
}

impl FromStr for FreshnessPolicy {
    type Err = crate::generation::GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "presence" => Ok(FreshnessPolicy::Presence),
            "modified-time" | "mtime" => Ok(FreshnessPolicy::ModifiedTime),
            _ => Err(crate::generation::GenerationError::InvalidConfiguration(
                format!("unknown freshness policy '{s}'"),
            )),
        }
    }
}

/// What a coordinator call actually did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The generator ran `runs` times (more than once when requests piled up mid-run)
    Generated { runs: usize },
    /// Another run was in flight; it will pick this request up
    Coalesced,
    /// Bindings were already fresh
    Skipped,
}

impl GenerationOutcome {
    pub fn ran(&self) -> bool {
        matches!(self, GenerationOutcome::Generated { .. })
    }
}
