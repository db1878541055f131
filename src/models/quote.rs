use ethers::types::{Address, Bytes, U256};
use serde::Serialize;

/// Parameters sent to the aggregator. Serialized as the query string, so the
/// field names are part of the wire format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub from_chain: u64,
    pub to_chain: u64,
    pub from_token: String,
    pub to_token: String,
    /// Integer amount in the source token's smallest unit.
    pub from_amount: String,
    pub from_address: String,
    pub integrator: String,
    pub fee: f64,
}

/// A route offered by the aggregator. Valid for a short, aggregator-defined
/// window; consumed by a single bridge run and never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub tool_name: String,
    pub estimated_duration_seconds: f64,
    pub source_amount: String,
    pub destination_amount: String,
    pub transaction_request: QuoteTransaction,
}

/// Unsigned transaction carried by a [`Quote`].
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteTransaction {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: U256,
    pub gas_price: Option<U256>,
    pub chain_id: Option<u64>,
    pub from: Option<Address>,
}
