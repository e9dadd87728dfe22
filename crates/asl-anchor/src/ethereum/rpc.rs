use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{AnchorError, AnchorResult};

/// One JSON-RPC endpoint.
#[async_trait]
pub trait JsonRpcTransport: Send + Sync {
    /// The endpoint's origin, safe to log and to put in errors.
    fn endpoint(&self) -> &str;

    /// Send one request and return its `result`. A `null` result is returned
    /// as [`Value::Null`]; interpreting it is up to the caller.
    async fn request(&self, method: &str, params: Value) -> AnchorResult<Value>;
}

/// Opens transports for endpoint URLs.
pub trait RpcConnector: Send + Sync {
    fn connect(&self, url: &str) -> AnchorResult<Arc<dyn JsonRpcTransport>>;
}

/// JSON-RPC 2.0 over HTTP POST.
pub struct HttpRpcTransport {
    client: Client,
    url: String,
    origin: String,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

impl HttpRpcTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> AnchorResult<Self> {
        let url = url.into();
        let origin = redact_endpoint(&url);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .use_rustls_tls()
            .build()
            .map_err(|e| AnchorError::InvalidConfig(format!("http client for {origin}: {e}")))?;
        Ok(Self {
            client,
            url,
            origin,
            next_id: AtomicU64::new(1),
        })
    }

    fn rpc_error(&self, method: &str, message: impl Into<String>) -> AnchorError {
        AnchorError::Rpc {
            endpoint: self.origin.clone(),
            method: method.to_string(),
            message: message.into(),
        }
    }
}

/// Reduce an endpoint url to `scheme://host[:port]`.
///
/// Hosted providers put API keys in the path, query or userinfo, so only the
/// origin may appear in logs and errors.
pub(crate) fn redact_endpoint(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => {
            let origin = parsed.origin();
            if origin.is_tuple() {
                origin.ascii_serialization()
            } else {
                format!("{}://<redacted>", parsed.scheme())
            }
        }
        Err(_) => "<invalid url>".to_string(),
    }
}

/// Network errors can echo credentials embedded in the url; keep only the class.
fn describe_network_error(error: &reqwest::Error) -> &'static str {
    if error.is_connect() {
        "connection refused or unreachable"
    } else if error.is_timeout() {
        "request timed out"
    } else if error.is_decode() || error.is_body() {
        "unreadable response body"
    } else {
        "network error"
    }
}

#[async_trait]
impl JsonRpcTransport for HttpRpcTransport {
    fn endpoint(&self) -> &str {
        &self.origin
    }

    async fn request(&self, method: &str, params: Value) -> AnchorResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(endpoint = %self.origin, method, id, "json-rpc request");

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.rpc_error(method, describe_network_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.rpc_error(method, format!("http status {status}")));
        }

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| AnchorError::MalformedResponse {
                method: method.to_string(),
                reason: describe_network_error(&e).to_string(),
            })?;

        if let Some(err) = parsed.error {
            return Err(self.rpc_error(method, format!("{} (code {})", err.message, err.code)));
        }
        Ok(parsed.result.unwrap_or(Value::Null))
    }
}

/// Connects to endpoints with [`HttpRpcTransport`].
#[derive(Clone, Copy, Debug)]
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl RpcConnector for HttpConnector {
    fn connect(&self, url: &str) -> AnchorResult<Arc<dyn JsonRpcTransport>> {
        Ok(Arc::new(HttpRpcTransport::new(url, self.timeout)?))
    }
}
