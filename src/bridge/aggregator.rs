use async_trait::async_trait;
use ethers::types::{Address, Bytes, U256};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::{
    chains::evm::parse_quantity,
    config::AggregatorSettings,
    models::{BridgeError, Quote, QuoteRequest, QuoteTransaction, Result},
};

/// Source of bridge routes. Quote requests are never retried by callers:
/// each call may produce a different route.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteService: Send + Sync {
    async fn fetch_quote(&self, request: &QuoteRequest) -> Result<Quote>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifiQuote {
    tool: Option<String>,
    tool_details: Option<LifiToolDetails>,
    estimate: LifiEstimate,
    transaction_request: Option<LifiTransactionRequest>,
}

#[derive(Deserialize)]
struct LifiToolDetails {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifiEstimate {
    execution_duration: Option<f64>,
    from_amount: Option<String>,
    to_amount: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifiTransactionRequest {
    to: String,
    data: String,
    value: Option<String>,
    gas_limit: Option<String>,
    gas_price: Option<String>,
    chain_id: Option<u64>,
    from: Option<String>,
}

/// LI.FI `/quote` client.
pub struct LifiClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl LifiClient {
    pub fn new(settings: &AggregatorSettings) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| BridgeError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl QuoteService for LifiClient {
    async fn fetch_quote(&self, request: &QuoteRequest) -> Result<Quote> {
        let url = format!("{}/quote", self.base_url);
        debug!(url = %url, from_chain = request.from_chain, to_chain = request.to_chain, "Requesting quote");

        let response = self
            .http_client
            .get(&url)
            .query(request)
            .send()
            .await
            .map_err(|e| BridgeError::Quote {
                status: None,
                body: format!("request to {} failed: {}", url, e),
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| BridgeError::Quote {
            status: Some(status),
            body: format!("failed to read response body: {}", e),
        })?;

        if !(200..300).contains(&status) {
            return Err(BridgeError::Quote {
                status: Some(status),
                body,
            });
        }

        let quote = parse_quote(status, &body)?;
        info!(
            tool = %quote.tool_name,
            duration_seconds = quote.estimated_duration_seconds,
            to_amount = %quote.destination_amount,
            "Quote received"
        );
        Ok(quote)
    }
}

/// Turns a successful aggregator response body into a [`Quote`]. Anything the
/// bridge flow cannot sign is reported as a quote error with the upstream status.
pub fn parse_quote(status: u16, body: &str) -> Result<Quote> {
    let malformed = |reason: String| BridgeError::Quote {
        status: Some(status),
        body: format!("malformed quote: {}", reason),
    };

    let raw: LifiQuote = serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;
    let tx = raw
        .transaction_request
        .ok_or_else(|| malformed("missing transactionRequest".to_string()))?;

    let quantity = |field: &str, value: Option<&String>| -> Result<Option<U256>> {
        value
            .map(|v| parse_quantity(v).map_err(|e| malformed(format!("{}: {}", field, e))))
            .transpose()
    };

    let gas_limit = quantity("gasLimit", tx.gas_limit.as_ref())?
        .ok_or_else(|| malformed("missing transactionRequest.gasLimit".to_string()))?;

    let transaction_request = QuoteTransaction {
        to: Address::from_str(&tx.to).map_err(|e| malformed(format!("to: {}", e)))?,
        data: Bytes::from_str(&tx.data).map_err(|e| malformed(format!("data: {}", e)))?,
        value: quantity("value", tx.value.as_ref())?.unwrap_or_default(),
        gas_limit,
        gas_price: quantity("gasPrice", tx.gas_price.as_ref())?,
        chain_id: tx.chain_id,
        from: tx
            .from
            .as_deref()
            .map(Address::from_str)
            .transpose()
            .map_err(|e| malformed(format!("from: {}", e)))?,
    };

    Ok(Quote {
        tool_name: raw
            .tool_details
            .map(|d| d.name)
            .or(raw.tool)
            .unwrap_or_else(|| "unknown".to_string()),
        estimated_duration_seconds: raw.estimate.execution_duration.unwrap_or_default(),
        source_amount: raw.estimate.from_amount.unwrap_or_default(),
        destination_amount: raw.estimate.to_amount,
        transaction_request,
    })
}
