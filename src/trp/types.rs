//! TRP payload types

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;

use crate::trp::TrpError;

/// Argument value accepted by `trp.resolve`
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    /// Sent as a lowercase hex string
    Bytes(Vec<u8>),
}

impl Serialize for ArgValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ArgValue::Null => serializer.serialize_unit(),
            ArgValue::Bool(b) => serializer.serialize_bool(*b),
            ArgValue::Number(n) => n.serialize(serializer),
            ArgValue::String(s) => serializer.serialize_str(s),
            ArgValue::Bytes(bytes) => serializer.serialize_str(&hex::encode(bytes)),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::String(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::String(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Number(value.into())
    }
}

impl From<u64> for ArgValue {
    fn from(value: u64) -> Self {
        ArgValue::Number(value.into())
    }
}

impl From<Vec<u8>> for ArgValue {
    fn from(value: Vec<u8>) -> Self {
        ArgValue::Bytes(value)
    }
}

impl TryFrom<Value> for ArgValue {
    type Error = Value;

    /// Arrays and objects have no argument representation and are handed back
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(ArgValue::Null),
            Value::Bool(b) => Ok(ArgValue::Bool(b)),
            Value::Number(n) => Ok(ArgValue::Number(n)),
            Value::String(s) => Ok(ArgValue::String(s)),
            other => Err(other),
        }
    }
}

pub type Args = BTreeMap<String, ArgValue>;

/// Compiled tx3 program; bytecode is forwarded as-is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TirEnvelope {
    pub version: String,
    pub bytecode: String,
    pub encoding: String,
}

/// A transaction template plus the arguments to resolve it with
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtoTx {
    pub tir: TirEnvelope,
    pub args: Args,
}

impl ProtoTx {
    pub fn new(tir: TirEnvelope) -> Self {
        Self {
            tir,
            args: Args::new(),
        }
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }
}

/// A resolved transaction as returned by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxEnvelope {
    pub tx: String,
    pub bytes: String,
    pub encoding: String,
}

impl TxEnvelope {
    /// Decodes `bytes` according to `encoding` (`hex` or `base64`)
    pub fn decode_bytes(&self) -> Result<Vec<u8>, TrpError> {
        match self.encoding.as_str() {
            "hex" => hex::decode(&self.bytes).map_err(|e| TrpError::Decode(e.to_string())),
            "base64" => STANDARD
                .decode(&self.bytes)
                .map_err(|e| TrpError::Decode(e.to_string())),
            other => Err(TrpError::Decode(format!("unsupported encoding '{other}'"))),
        }
    }
}

/// Error object of a JSON-RPC response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResolveParams<'a> {
    pub tir: &'a TirEnvelope,
    pub args: &'a Args,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<&'a Args>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: ResolveParams<'a>,
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JsonRpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}
