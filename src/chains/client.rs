use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::models::{BridgeError, Result, RpcFailure};

/// One JSON-RPC call against one endpoint. Retry and failover live above this.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(
        &self,
        endpoint: &str,
        method: &str,
        params: &serde_json::Value,
    ) -> std::result::Result<serde_json::Value, RpcFailure>;
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a serde_json::Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<serde_json::Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// JSON-RPC over HTTP POST.
pub struct HttpTransport {
    http_client: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            next_id: AtomicU64::new(1),
        })
    }
}

fn classify(err: reqwest::Error) -> RpcFailure {
    if err.is_timeout() {
        RpcFailure::Timeout
    } else {
        RpcFailure::Transport(err.to_string())
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn call(
        &self,
        endpoint: &str,
        method: &str,
        params: &serde_json::Value,
    ) -> std::result::Result<serde_json::Value, RpcFailure> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .http_client
            .post(endpoint)
            .json(&request)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcFailure::Status(status.as_u16()));
        }

        let rpc_response: RpcResponse = response
            .json()
            .await
            .map_err(|e| if e.is_timeout() { RpcFailure::Timeout } else { RpcFailure::Malformed(e.to_string()) })?;

        if let Some(error) = rpc_response.error {
            return Err(RpcFailure::JsonRpc {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response
            .result
            .ok_or_else(|| RpcFailure::Malformed("response has neither result nor error".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answers one request with `status_line` and `body`.
    async fn respond_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });

        format!("http://{}", addr)
    }

    async fn call(status_line: &'static str, body: &'static str) -> std::result::Result<serde_json::Value, RpcFailure> {
        let endpoint = respond_once(status_line, body).await;
        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        transport.call(&endpoint, "eth_chainId", &json!([])).await
    }

    #[tokio::test]
    async fn test_result_is_returned() {
        let result = call("200 OK", r#"{"jsonrpc":"2.0","id":1,"result":"0x38"}"#).await;
        assert_eq!(result, Ok(json!("0x38")));
    }

    #[tokio::test]
    async fn test_rpc_error_is_classified() {
        let result = call(
            "200 OK",
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"nonce too low"}}"#,
        )
        .await;
        assert_eq!(
            result,
            Err(RpcFailure::JsonRpc {
                code: -32000,
                message: "nonce too low".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_http_status_is_classified() {
        assert_eq!(call("503 Service Unavailable", "{}").await, Err(RpcFailure::Status(503)));
    }

    #[tokio::test]
    async fn test_missing_result_is_malformed() {
        assert!(matches!(
            call("200 OK", r#"{"jsonrpc":"2.0","id":1}"#).await,
            Err(RpcFailure::Malformed(_))
        ));
        assert!(matches!(call("200 OK", "not json").await, Err(RpcFailure::Malformed(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let result = transport.call(&endpoint, "eth_chainId", &json!([])).await;
        assert!(matches!(result, Err(RpcFailure::Transport(_))));
    }
}
