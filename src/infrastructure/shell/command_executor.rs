//! Command executor for running the binding generator
//!
//! The generator is spawned directly (no shell) with the host's stdout and
//! stderr inherited, so its diagnostics land in the build tool's own log.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::generation::{GenerationError, GenerationRequest};

/// Trait for executing generator invocations
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `request` in `working_dir` and wait for it to exit
    async fn execute(
        &self,
        request: &GenerationRequest,
        working_dir: &Path,
    ) -> Result<CommandStatus, GenerationError>;
}

/// Exit status of a finished invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
}

impl CommandStatus {
    pub fn success() -> Self {
        Self { exit_code: Some(0) }
    }

    pub fn failure(exit_code: i32) -> Self {
        Self {
            exit_code: Some(exit_code),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn describe(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Default executor using tokio::process
pub struct ProcessCommandExecutor;

impl ProcessCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProcessCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandExecutor for ProcessCommandExecutor {
    async fn execute(
        &self,
        request: &GenerationRequest,
        working_dir: &Path,
    ) -> Result<CommandStatus, GenerationError> {
        let status = Command::new(request.program())
            .args(request.args())
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| GenerationError::Spawn {
                program: request.program().to_string_lossy().into_owned(),
                source,
            })?;

        Ok(CommandStatus {
            exit_code: status.code(),
        })
    }
}
