use ethers::types::{Address, Bytes, H256, U256};
use serde_json::json;
use std::str::FromStr;
use tracing::debug;

use crate::{
    chains::{
        registry::ChainConfig,
        resilience::{ResilientRpcClient, RpcRole},
    },
    models::{BridgeError, Result, RpcFailure},
};

/// ERC-20 `decimals()` selector.
const DECIMALS_SELECTOR: &str = "0x313ce567";

/// Typed EVM calls over a [`ResilientRpcClient`].
pub struct EvmClient {
    rpc: ResilientRpcClient,
}

impl EvmClient {
    pub fn new(rpc: ResilientRpcClient) -> Self {
        Self { rpc }
    }

    pub fn chain(&self) -> &'static ChainConfig {
        self.rpc.chain()
    }

    pub fn role(&self) -> RpcRole {
        self.rpc.role()
    }

    /// Reads `decimals()` from an ERC-20 contract.
    pub async fn token_decimals(&self, token: Address) -> Result<u8> {
        let chain = self.chain().alias();
        let bytes = self
            .rpc
            .request_with(
                "eth_call",
                json!([{ "to": token, "data": DECIMALS_SELECTOR }, "latest"]),
                parse_bytes,
            )
            .await?;

        let decimal_error = |reason: String| BridgeError::DecimalResolution {
            token: format!("{:?}", token),
            chain: chain.to_string(),
            reason,
        };

        if bytes.len() < 32 {
            return Err(decimal_error(
                "empty answer, the address is not an ERC-20 contract on this chain".to_string(),
            ));
        }

        let value = U256::from_big_endian(&bytes[..32]);
        // uint8 in the ABI, and nothing above 77 fits a U256 amount anyway
        if value > U256::from(77u8) {
            return Err(decimal_error(format!("implausible decimals value {}", value)));
        }

        let decimals = value.as_u32() as u8;
        debug!(chain, token = ?token, decimals, "Resolved token decimals");
        Ok(decimals)
    }

    pub async fn transaction_count(&self, address: Address) -> Result<U256> {
        self.rpc
            .request_with("eth_getTransactionCount", json!([address, "pending"]), parse_quantity_value)
            .await
    }

    pub async fn gas_price(&self) -> Result<U256> {
        self.rpc.request_with("eth_gasPrice", json!([]), parse_quantity_value).await
    }

    pub async fn balance(&self, address: Address) -> Result<U256> {
        self.rpc
            .request_with("eth_getBalance", json!([address, "latest"]), parse_quantity_value)
            .await
    }

    /// Broadcasts a signed transaction exactly once.
    pub async fn send_raw_transaction(&self, raw: &Bytes) -> Result<H256> {
        let result = self
            .rpc
            .submit("eth_sendRawTransaction", json!([raw]))
            .await?;

        // The node accepted the transaction at this point, so a hash we cannot
        // parse must not be reported as a failed send.
        match result.as_str().map(H256::from_str) {
            Some(Ok(hash)) => Ok(hash),
            _ => Ok(H256::from(ethers::utils::keccak256(raw))),
        }
    }
}

/// Parses an Ethereum quantity given either as `0x` hex or as a decimal string.
pub fn parse_quantity(raw: &str) -> std::result::Result<U256, String> {
    let raw = raw.trim();
    if let Some(hex_digits) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        if hex_digits.is_empty() {
            return Ok(U256::zero());
        }
        U256::from_str_radix(hex_digits, 16).map_err(|e| format!("invalid hex quantity {:?}: {}", raw, e))
    } else {
        U256::from_dec_str(raw).map_err(|e| format!("invalid decimal quantity {:?}: {}", raw, e))
    }
}

fn parse_quantity_value(value: &serde_json::Value) -> std::result::Result<U256, RpcFailure> {
    let parsed = match value {
        serde_json::Value::String(s) => parse_quantity(s),
        serde_json::Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| format!("non-integer quantity {}", n)),
        other => Err(format!("expected a quantity, got {}", other)),
    };

    parsed.map_err(RpcFailure::Malformed)
}

fn parse_bytes(value: &serde_json::Value) -> std::result::Result<Bytes, RpcFailure> {
    let raw = value
        .as_str()
        .ok_or_else(|| RpcFailure::Malformed(format!("expected hex data, got {}", value)))?;
    Bytes::from_str(raw).map_err(|e| RpcFailure::Malformed(format!("invalid hex data {:?}: {}", raw, e)))
}
