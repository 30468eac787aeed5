//! JSON-RPC client for `trp.resolve`

use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::trp::types::{JsonRpcRequest, JsonRpcResponse, ResolveParams};
use crate::trp::{Args, ProtoTx, TrpError, TxEnvelope};

/// Connection settings for a [`TrpClient`]
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    endpoint: String,
    headers: BTreeMap<String, String>,
    env_args: Option<Args>,
}

impl ClientOptions {
    pub fn new<S: Into<String>>(endpoint: S) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Adds a header sent with every request; overrides `Content-Type` if named so
    pub fn header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Environment arguments forwarded as `params.env`
    pub fn env_args(mut self, env_args: Args) -> Self {
        self.env_args = Some(env_args);
        self
    }

    pub fn build(self) -> Result<TrpClient, TrpError> {
        TrpClient::new(self)
    }
}

/// Stateless resolver client; safe to share between tasks
#[derive(Debug, Clone)]
pub struct TrpClient {
    http: Client,
    endpoint: Url,
    headers: HeaderMap,
    env_args: Option<Args>,
}

impl TrpClient {
    pub fn new(options: ClientOptions) -> Result<Self, TrpError> {
        let endpoint =
            Url::parse(&options.endpoint).map_err(|e| TrpError::InvalidEndpoint {
                endpoint: options.endpoint.clone(),
                message: e.to_string(),
            })?;

        let mut headers = HeaderMap::new();
        for (name, value) in &options.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| TrpError::InvalidHeader {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| TrpError::InvalidHeader {
                name: name.clone(),
                message: e.to_string(),
            })?;
            headers.insert(header_name, header_value);
        }

        // every call opens its own connection
        let http = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self {
            http,
            endpoint,
            headers,
            env_args: options.env_args,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Resolves `proto_tx` into a concrete transaction.
    ///
    /// A JSON-RPC error wins over any `result`, even when the HTTP status was
    /// successful. Nothing is retried.
    pub async fn resolve(&self, proto_tx: &ProtoTx) -> Result<TxEnvelope, TrpError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method: "trp.resolve",
            params: ResolveParams {
                tir: &proto_tx.tir,
                args: &proto_tx.args,
                env: self.env_args.as_ref(),
            },
            id: Uuid::new_v4().to_string(),
        };
        let body = serde_json::to_vec(&request)?;

        debug!(
            endpoint = %self.endpoint,
            id = %request.id,
            args = proto_tx.args.len(),
            "Sending trp.resolve"
        );

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .headers(self.headers.clone())
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(endpoint = %self.endpoint, %status, "TRP endpoint rejected request");
            return Err(TrpError::Transport { status });
        }

        let bytes = response.bytes().await?;
        let response: JsonRpcResponse = serde_json::from_slice(&bytes)
            .map_err(|e| TrpError::Malformed(e.to_string()))?;

        match response {
            JsonRpcResponse {
                error: Some(error), ..
            } => {
                warn!(code = ?error.code, message = %error.message, "trp.resolve returned an error");
                Err(error.into())
            }
            JsonRpcResponse {
                error: None,
                result: Some(result),
            } => serde_json::from_value(result).map_err(|e| TrpError::Malformed(e.to_string())),
            JsonRpcResponse {
                error: None,
                result: None,
            } => Err(TrpError::Malformed(
                "response carries neither result nor error".to_string(),
            )),
        }
    }
}
