//! The tx3 bundler plugin

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::bundler::{
    BuildPlugin, DevServer, DevServerError, DevSession, ResolveConfig, merge_aliases,
};
use crate::config::{PluginOptions, sanitize_options};
use crate::generation::inputs::expand_patterns;
use crate::generation::{GenerationCoordinator, GenerationError, GenerationOutcome};

pub struct Tx3Plugin {
    coordinator: Arc<GenerationCoordinator>,
}

impl Tx3Plugin {
    pub const NAME: &'static str = "tx3";

    /// Sanitizes `options` against `project_root` and wires the default generator
    pub fn new(options: PluginOptions, project_root: &Path) -> Result<Self, GenerationError> {
        let config = sanitize_options(options, project_root)?;
        Ok(Self::from_coordinator(Arc::new(
            GenerationCoordinator::with_defaults(config),
        )))
    }

    pub fn from_coordinator(coordinator: Arc<GenerationCoordinator>) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &Arc<GenerationCoordinator> {
        &self.coordinator
    }

    pub async fn regenerate_bindings(&self) -> Result<GenerationOutcome, GenerationError> {
        self.coordinator.regenerate().await
    }

    /// Re-resolves the input patterns, picking up files created since startup
    pub fn files_to_watch(&self) -> Result<Vec<PathBuf>, GenerationError> {
        expand_patterns(&self.coordinator.config().absolute_patterns)
    }

    /// Registers the inputs with `server` and starts reacting to its change events
    pub async fn configure_server(
        &self,
        server: Arc<dyn DevServer>,
    ) -> Result<DevSession, DevServerError> {
        let files = self.files_to_watch()?;
        DevSession::start(self.coordinator.clone(), server, files).await
    }
}

#[async_trait]
impl BuildPlugin for Tx3Plugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn config(&self, resolve: &ResolveConfig) -> ResolveConfig {
        let config = self.coordinator.config();
        ResolveConfig::new(merge_aliases(
            &resolve.alias,
            &config.alias,
            &config.output_dir,
        ))
    }

    async fn build_start(&self) -> Result<(), GenerationError> {
        let outcome = self.coordinator.ensure_generated().await?;
        debug!(?outcome, "tx3 build start complete");
        Ok(())
    }

    async fn build_end(&self) -> Result<(), GenerationError> {
        let outcome = self.coordinator.ensure_fresh().await?;
        debug!(?outcome, "tx3 build end complete");
        Ok(())
    }
}
