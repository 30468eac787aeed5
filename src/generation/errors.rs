//! Error types for the generation domain

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while producing bindings
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("No tx3 input files matched the configured patterns: {}", .patterns.join(", "))]
    NoInputFiles { patterns: Vec<String> },

    #[error("Invalid input pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Invalid target language: {0}")]
    InvalidLanguage(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Failed to launch binding generator '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Binding generator failed ({status}): {command}")]
    GeneratorFailed {
        command: String,
        status: String,
        exit_code: Option<i32>,
    },

    /// The run another caller performed on this request's behalf failed
    #[error("Queued binding generation failed: {message}")]
    QueuedRunFailed { message: String },

    #[error("Failed to create output directory {}: {source}", .path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl GenerationError {
    /// Errors caused by the user's configuration rather than the generator or the filesystem
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            GenerationError::NoInputFiles { .. }
                | GenerationError::InvalidPattern { .. }
                | GenerationError::InvalidLanguage(_)
                | GenerationError::InvalidConfiguration(_)
        )
    }
}
