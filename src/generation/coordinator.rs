//! Generation coordinator - decides when bindings are (re)generated

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::MutexGuard;
use tracing::{debug, error, info};

use crate::config::GenerationConfig;
use crate::generation::inputs::expand_patterns;
use crate::generation::{
    FreshnessPolicy, GenerationError, GenerationGuard, GenerationOutcome, GenerationRequest,
    OutputService,
};
use crate::infrastructure::output::{
    FileSystemOutputService, ensure_output_dir, newest_modification,
};
use crate::infrastructure::shell::{CommandExecutor, ProcessCommandExecutor};

/// Runs the binding generator for one plugin configuration
pub struct GenerationCoordinator {
    config: Arc<GenerationConfig>,
    executor: Arc<dyn CommandExecutor>,
    output: Arc<dyn OutputService>,
    guard: Arc<GenerationGuard>,
}

impl GenerationCoordinator {
    pub fn new(
        config: GenerationConfig,
        executor: Arc<dyn CommandExecutor>,
        output: Arc<dyn OutputService>,
    ) -> Self {
        let guard = GenerationGuard::for_output_dir(&config.output_dir);
        Self {
            config: Arc::new(config),
            executor,
            output,
            guard,
        }
    }

    /// Coordinator spawning the real generator and writing to the local filesystem
    pub fn with_defaults(config: GenerationConfig) -> Self {
        Self::new(
            config,
            Arc::new(ProcessCommandExecutor::new()),
            Arc::new(FileSystemOutputService::new()),
        )
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Always generates, waiting for any run already writing to the output directory
    pub async fn ensure_generated(&self) -> Result<GenerationOutcome, GenerationError> {
        self.validate()?;
        let permit = self.guard.acquire().await;
        let runs = self.run_exclusive(permit).await?;
        Ok(GenerationOutcome::Generated { runs })
    }

    /// Generates only when the freshness policy reports stale bindings.
    ///
    /// Guards builds that skipped the start hook from shipping without
    /// bindings. Under the default policy this only detects total absence.
    pub async fn ensure_fresh(&self) -> Result<GenerationOutcome, GenerationError> {
        if self.is_fresh().await? {
            debug!(
                output_dir = %self.config.output_dir.display(),
                "tx3 bindings are fresh"
            );
            return Ok(GenerationOutcome::Skipped);
        }

        info!(
            output_dir = %self.config.output_dir.display(),
            "tx3 bindings missing or stale, generating"
        );
        self.ensure_generated().await
    }

    /// Entry point for watch layers.
    ///
    /// When a run is already in flight the request is folded into a single
    /// follow-up run performed by the current holder. The caller then waits
    /// for that run and gets `Coalesced`, or `QueuedRunFailed` if it failed.
    pub async fn regenerate(&self) -> Result<GenerationOutcome, GenerationError> {
        self.validate()?;

        if let Ok(permit) = self.guard.try_acquire() {
            let runs = self.run_exclusive(permit).await?;
            return Ok(GenerationOutcome::Generated { runs });
        }

        let ticket = self.guard.request_follow_up();

        // the holder may have released between the first attempt and the flag
        if let Ok(permit) = self.guard.try_acquire() {
            let runs = self.run_exclusive(permit).await?;
            return Ok(GenerationOutcome::Generated { runs });
        }

        debug!(
            output_dir = %self.config.output_dir.display(),
            ticket,
            "Generation in flight, queued follow-up run"
        );
        let record = self.guard.wait_for_run(ticket).await;
        match record.error {
            None => Ok(GenerationOutcome::Coalesced),
            Some(message) => Err(GenerationError::QueuedRunFailed { message }),
        }
    }

    /// Whether the output directory satisfies the configured freshness policy
    pub async fn is_fresh(&self) -> Result<bool, GenerationError> {
        let artifacts = self
            .output
            .list_artifacts(&self.config.output_dir, self.config.target)
            .await?;

        if artifacts.is_empty() {
            return Ok(false);
        }

        match self.config.freshness {
            FreshnessPolicy::Presence => Ok(true),
            FreshnessPolicy::ModifiedTime => {
                let inputs = expand_patterns(&self.config.absolute_patterns)?;
                let newest_artifact = newest_modification(&artifacts).await?;
                let newest_input = newest_modification(&inputs).await?;
                Ok(match (newest_input, newest_artifact) {
                    (Some(input), Some(artifact)) => input <= artifact,
                    _ => true,
                })
            }
        }
    }

    /// Re-resolves the input patterns against the filesystem as it is now
    fn resolve_inputs(&self) -> Result<Vec<PathBuf>, GenerationError> {
        let inputs = expand_patterns(&self.config.absolute_patterns)?;
        if inputs.is_empty() {
            error!(
                patterns = ?self.config.input_patterns,
                "No tx3 input files found"
            );
            return Err(GenerationError::NoInputFiles {
                patterns: self.config.input_patterns.clone(),
            });
        }
        Ok(inputs)
    }

    fn validate(&self) -> Result<(), GenerationError> {
        self.resolve_inputs().map(drop)
    }

    /// Runs until no follow-up is pending, then releases the directory.
    ///
    /// A failed run does not end the loop while a follow-up is pending; the
    /// result of the last run is returned.
    async fn run_exclusive(
        &self,
        mut permit: MutexGuard<'_, ()>,
    ) -> Result<usize, GenerationError> {
        let mut runs = 0;
        loop {
            let result = loop {
                let seq = self.guard.begin_run();
                let result = self.generate_once().await;
                runs += 1;
                self.guard
                    .finish_run(seq, result.as_ref().err().map(ToString::to_string));

                if !self.guard.has_follow_up() {
                    break result;
                }
                if let Err(e) = &result {
                    debug!(error = %e, "Generation failed, running queued follow-up");
                }
            };

            drop(permit);
            if !self.guard.has_follow_up() {
                return result.map(|()| runs);
            }
            match self.guard.try_acquire() {
                Ok(next) => permit = next,
                // whoever holds it now will see the flag
                Err(_) => return result.map(|()| runs),
            }
        }
    }

    async fn generate_once(&self) -> Result<(), GenerationError> {
        let inputs = self.resolve_inputs()?;
        ensure_output_dir(
            self.output.as_ref(),
            &self.config.output_dir,
            &self.config.project_root,
        )
        .await?;

        let request = GenerationRequest::from_config(&self.config, &inputs);
        info!(command = %request, "Generating tx3 bindings");

        let status = self
            .executor
            .execute(&request, &self.config.project_root)
            .await
            .inspect_err(|e| {
                error!(command = %request, error = %e, "Failed to launch tx3-bindgen");
            })?;

        if !status.is_success() {
            error!(
                command = %request,
                status = %status.describe(),
                "Failed to generate tx3 bindings"
            );
            return Err(GenerationError::GeneratorFailed {
                command: request.to_string(),
                status: status.describe(),
                exit_code: status.exit_code,
            });
        }

        info!(
            output_dir = %self.config.output_dir.display(),
            "Generated tx3 bindings"
        );
        Ok(())
    }
}
