//! tx3 Pipeline Library
//!
//! Generates tx3 protocol bindings as part of a web build (build hooks, import
//! alias, dev-server watch and reload) and resolves transactions against a
//! TRP endpoint.

pub mod bundler;
pub mod config;
pub mod generation;
pub mod infrastructure;
pub mod trp;

// Re-exports
pub use bundler::{BuildPlugin, DevServer, DevSession, Tx3Plugin};
pub use config::{GenerationConfig, PluginOptions, sanitize_options};
pub use generation::{GenerationCoordinator, GenerationError, GenerationOutcome, TargetLanguage};
pub use trp::{ClientOptions, ProtoTx, TrpClient, TrpError, TxEnvelope};
