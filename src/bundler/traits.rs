//! Port interfaces between the tx3 plugin and a bundler

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::bundler::ResolveConfig;
use crate::generation::GenerationError;

/// Build lifecycle hooks a bundler calls on its plugins
#[async_trait]
pub trait BuildPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the module-resolution config with this plugin's additions merged in
    fn config(&self, resolve: &ResolveConfig) -> ResolveConfig;

    /// Called before the build; an error aborts it
    async fn build_start(&self) -> Result<(), GenerationError>;

    /// Called once the build finished
    async fn build_end(&self) -> Result<(), GenerationError>;
}

/// Filesystem notifications delivered by a dev server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Changed(PathBuf),
    Added(PathBuf),
    Removed(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &PathBuf {
        match self {
            WatchEvent::Changed(path) | WatchEvent::Added(path) | WatchEvent::Removed(path) => path,
        }
    }
}

/// Messages broadcast to connected dev clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HmrMessage {
    FullReload,
    Error { message: String },
}

#[derive(Error, Debug)]
pub enum DevServerError {
    #[error("Failed to start file watcher: {0}")]
    Watcher(String),

    #[error("Failed to watch {}: {message}", .path.display())]
    Watch { path: PathBuf, message: String },

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),
}

/// The hooks a development server exposes to plugins
#[async_trait]
pub trait DevServer: Send + Sync {
    /// Adds absolute paths to the server's file watcher
    async fn watch(&self, paths: &[PathBuf]) -> Result<(), DevServerError>;

    /// Opens a new event stream; dropping the receiver unsubscribes
    fn subscribe(&self) -> mpsc::UnboundedReceiver<WatchEvent>;

    /// Drops every cached module so the next request re-reads from disk
    async fn invalidate_all(&self);

    async fn send(&self, message: HmrMessage);
}
