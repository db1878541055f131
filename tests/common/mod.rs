#![allow(dead_code)]

use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};
use ethers::utils::keccak256;
use evm_bridge_wallet::{
    bridge::QuoteService,
    chains::{RetryConfig, RpcTransport},
    models::{Quote, QuoteRequest, QuoteTransaction, Result, RpcFailure},
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub const BRIDGE_CONTRACT: &str = "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE";

#[derive(Debug, Clone)]
pub struct Call {
    pub endpoint: String,
    pub method: String,
    pub params: Value,
}

/// JSON-RPC fake answering by method name. Endpoints marked down fail every
/// call with a timeout. Unscripted sends answer with the keccak of the raw tx.
pub struct ScriptedTransport {
    answers: Mutex<HashMap<String, std::result::Result<Value, RpcFailure>>>,
    down: Mutex<Vec<String>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    /// Nonce 3, 1 gwei gas price, 100 BNB balance.
    pub fn funded() -> Self {
        let transport = Self {
            answers: Mutex::new(HashMap::new()),
            down: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        };
        transport.answer("eth_getTransactionCount", json!("0x3"));
        transport.answer("eth_gasPrice", json!("0x3b9aca00"));
        transport.answer("eth_getBalance", json!("0x56bc75e2d63100000"));
        transport
    }

    pub fn answer(&self, method: &str, value: Value) {
        self.answers.lock().unwrap().insert(method.to_string(), Ok(value));
    }

    pub fn fail(&self, method: &str, failure: RpcFailure) {
        self.answers.lock().unwrap().insert(method.to_string(), Err(failure));
    }

    pub fn take_down(&self, endpoint: &str) {
        self.down.lock().unwrap().push(endpoint.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls().iter().filter(|c| c.method == method).count()
    }

    pub fn count_at(&self, endpoint: &str, method: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.endpoint == endpoint && c.method == method)
            .count()
    }

    pub fn sent_raw(&self) -> Vec<Bytes> {
        self.calls()
            .iter()
            .filter(|c| c.method == "eth_sendRawTransaction")
            .filter_map(|c| c.params[0].as_str().and_then(|s| Bytes::from_str(s).ok()))
            .collect()
    }
}

#[async_trait]
impl RpcTransport for ScriptedTransport {
    async fn call(
        &self,
        endpoint: &str,
        method: &str,
        params: &Value,
    ) -> std::result::Result<Value, RpcFailure> {
        self.calls.lock().unwrap().push(Call {
            endpoint: endpoint.to_string(),
            method: method.to_string(),
            params: params.clone(),
        });

        if self.down.lock().unwrap().iter().any(|d| d == endpoint) {
            return Err(RpcFailure::Timeout);
        }

        if let Some(answer) = self.answers.lock().unwrap().get(method) {
            return answer.clone();
        }

        match method {
            "eth_sendRawTransaction" => {
                let raw = Bytes::from_str(params[0].as_str().unwrap_or_default())
                    .map_err(|e| RpcFailure::Malformed(e.to_string()))?;
                Ok(json!(format!("{:?}", H256::from(keccak256(&raw)))))
            }
            _ => Err(RpcFailure::JsonRpc {
                code: -32601,
                message: format!("method {} not scripted", method),
            }),
        }
    }
}

type Responder = Box<dyn Fn(&QuoteRequest) -> Result<Quote> + Send + Sync>;

/// Aggregator fake that records every request.
pub struct RecordingQuoteService {
    respond: Responder,
    requests: Mutex<Vec<QuoteRequest>>,
}

impl RecordingQuoteService {
    pub fn new(respond: impl Fn(&QuoteRequest) -> Result<Quote> + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Echoes the request back as a native-value route on BSC.
    pub fn echoing() -> Self {
        Self::new(|request| {
            let value = U256::from_dec_str(&request.from_amount).unwrap();
            Ok(native_quote(&request.from_address, value))
        })
    }

    pub fn requests(&self) -> Vec<QuoteRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuoteService for RecordingQuoteService {
    async fn fetch_quote(&self, request: &QuoteRequest) -> Result<Quote> {
        self.requests.lock().unwrap().push(request.clone());
        (self.respond)(request)
    }
}

pub fn native_quote(from: &str, value: U256) -> Quote {
    Quote {
        tool_name: "Stargate".to_string(),
        estimated_duration_seconds: 45.0,
        source_amount: value.to_string(),
        destination_amount: value.to_string(),
        transaction_request: QuoteTransaction {
            to: Address::from_str(BRIDGE_CONTRACT).unwrap(),
            data: Bytes::from(vec![0x4e, 0x71, 0xd9, 0x2d]),
            value,
            gas_limit: U256::from(250_000),
            gas_price: Some(U256::from(1_000_000_000u64)),
            chain_id: Some(56),
            from: Some(Address::from_str(from).unwrap()),
        },
    }
}

pub fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
        backoff_multiplier: 2.0,
    }
}

/// Serves exactly one HTTP response, then returns the raw request it saw.
pub async fn serve_once(
    status_line: &'static str,
    body: &'static str,
) -> (String, tokio::task::JoinHandle<String>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
            if request.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        String::from_utf8_lossy(&request).into_owned()
    });

    (format!("http://{}", addr), handle)
}
