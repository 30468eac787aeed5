//! Transaction Resolution Protocol client
//!
//! Sends a compiled tx3 template and its arguments to a resolver over
//! JSON-RPC and returns the concrete transaction.

pub mod client;
pub mod error;
pub mod types;

pub use client::*;
pub use error::*;
pub use types::{ArgValue, Args, ProtoTx, RpcError, TirEnvelope, TxEnvelope};
