//! TRP client errors

use reqwest::StatusCode;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::trp::RpcError;

#[derive(Error, Debug)]
pub enum TrpError {
    #[error("Invalid TRP endpoint '{endpoint}': {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    #[error("Invalid TRP header '{name}': {message}")]
    InvalidHeader { name: String, message: String },

    /// The server answered with a non-success HTTP status
    #[error("Failed to resolve transaction: {status}")]
    Transport { status: StatusCode },

    #[error("TRP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server reported a JSON-RPC error
    #[error("{message}")]
    Rpc {
        message: String,
        code: Option<i64>,
        #[source]
        cause: RpcCause,
    },

    #[error("Malformed TRP response: {0}")]
    Malformed(String),

    #[error("Failed to encode TRP request: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to decode transaction bytes: {0}")]
    Decode(String),
}

impl TrpError {
    /// The `data` attached to a JSON-RPC error
    pub fn rpc_cause(&self) -> Option<&Value> {
        match self {
            TrpError::Rpc { cause, .. } => Some(&cause.0),
            _ => None,
        }
    }
}

impl From<RpcError> for TrpError {
    fn from(error: RpcError) -> Self {
        TrpError::Rpc {
            message: error.message,
            code: error.code,
            cause: RpcCause(error.data.unwrap_or(Value::Null)),
        }
    }
}

/// Server-provided details of a JSON-RPC error
#[derive(Debug, Clone, PartialEq)]
pub struct RpcCause(pub Value);

impl fmt::Display for RpcCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for RpcCause {}
