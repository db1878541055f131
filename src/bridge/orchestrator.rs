use ethers::signers::Signer;
use ethers::types::{transaction::eip2718::TypedTransaction, Address, Bytes, TransactionRequest, H256};
use ethers::utils::{keccak256, to_checksum};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    bridge::{aggregator::QuoteService, amount::HumanAmount},
    chains::{
        client::RpcTransport,
        evm::EvmClient,
        registry::{ChainConfig, ChainRegistry, ExplorerKind},
        resilience::{ResilientRpcClient, RetryConfig, RpcRole},
    },
    config::Settings,
    models::{BridgeError, Quote, QuoteRequest, Result},
    wallet::{Wallet, WalletStore},
};

/// Placeholder many aggregators use for the chain's native asset.
const NATIVE_PLACEHOLDER: &str = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee";

/// What the user asked for, exactly as typed.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeRequest {
    pub from_chain: String,
    pub to_chain: String,
    pub from_token: String,
    pub to_token: String,
    /// Human decimal amount of `from_token`, e.g. "1.5".
    pub amount: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    ValidateChains,
    ResolveDecimals,
    RequestQuote,
    Sign,
    Submit,
    Done,
    Failed,
}

impl BridgeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BridgeState::ValidateChains => "validate_chains",
            BridgeState::ResolveDecimals => "resolve_decimals",
            BridgeState::RequestQuote => "request_quote",
            BridgeState::Sign => "sign",
            BridgeState::Submit => "submit",
            BridgeState::Done => "done",
            BridgeState::Failed => "failed",
        }
    }
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeOutcome {
    pub transaction_hash: H256,
    pub explorer_url: String,
    pub from_chain: &'static str,
    pub to_chain: &'static str,
    pub tool_name: String,
    pub estimated_duration_seconds: f64,
    /// Amount sent, in the source token's smallest unit.
    pub from_amount: String,
    /// Aggregator's estimate, in the destination token's smallest unit.
    pub destination_amount: String,
}

#[derive(Debug, Clone)]
pub struct BridgeOptions {
    pub integrator: String,
    pub fee: f64,
    pub retry_config: RetryConfig,
}

impl BridgeOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            integrator: settings.aggregator.integrator.clone(),
            fee: settings.aggregator.fee,
            retry_config: settings.rpc.retry_config(),
        }
    }
}

enum TokenKind {
    Native,
    Contract(Address),
}

struct SignedTransaction {
    raw: Bytes,
    hash: H256,
}

/// Drives one transfer from validation to submission.
pub struct BridgeOrchestrator {
    wallet_store: Arc<dyn WalletStore>,
    quote_service: Arc<dyn QuoteService>,
    transport: Arc<dyn RpcTransport>,
    options: BridgeOptions,
}

impl BridgeOrchestrator {
    pub fn new(
        wallet_store: Arc<dyn WalletStore>,
        quote_service: Arc<dyn QuoteService>,
        transport: Arc<dyn RpcTransport>,
        options: BridgeOptions,
    ) -> Self {
        Self {
            wallet_store,
            quote_service,
            transport,
            options,
        }
    }

    /// Runs the whole flow once. Nothing here is retried as a unit: a failed
    /// run must be re-issued by the caller, which fetches a fresh quote.
    pub async fn bridge(&self, request: &BridgeRequest) -> Result<BridgeOutcome> {
        let mut state = BridgeState::ValidateChains;
        info!(
            from_chain = %request.from_chain,
            to_chain = %request.to_chain,
            from_token = %request.from_token,
            to_token = %request.to_token,
            amount = %request.amount,
            "Starting bridge"
        );

        let result = self.run(request, &mut state).await;
        if let Err(e) = &result {
            debug!(state = %state, error = %e, "Bridge failed");
            advance(&mut state, BridgeState::Failed);
        }
        result
    }

    async fn run(&self, request: &BridgeRequest, state: &mut BridgeState) -> Result<BridgeOutcome> {
        // Everything up to decimal resolution is local.
        let source = ChainRegistry::lookup(&request.from_chain)?;
        let destination = ChainRegistry::lookup(&request.to_chain)?;
        ensure_bridgeable(source)?;
        ensure_bridgeable(destination)?;
        if source.chain == destination.chain {
            return Err(BridgeError::InvalidInput(format!(
                "source and destination are both {}",
                source.alias()
            )));
        }

        let amount = HumanAmount::parse(&request.amount)?;
        let wallet = self.wallet_store.load()?;

        advance(state, BridgeState::ResolveDecimals);
        let decimals = self.resolve_decimals(source, &request.from_token).await?;
        let from_amount = amount.to_base_units(decimals)?;
        debug!(amount = %amount, decimals, base_units = %from_amount, "Scaled amount");

        advance(state, BridgeState::RequestQuote);
        let quote_request = QuoteRequest {
            from_chain: source.chain_id,
            to_chain: destination.chain_id,
            from_token: request.from_token.trim().to_string(),
            to_token: request.to_token.trim().to_string(),
            from_amount: from_amount.to_string(),
            from_address: wallet.address.clone(),
            integrator: self.options.integrator.clone(),
            fee: self.options.fee,
        };
        let quote = self.quote_service.fetch_quote(&quote_request).await?;

        advance(state, BridgeState::Sign);
        let writer = self.client(source, RpcRole::ReadWrite)?;
        let signed = self.sign(&writer, &wallet, &quote_request, &quote).await?;

        advance(state, BridgeState::Submit);
        let transaction_hash = writer.send_raw_transaction(&signed.raw).await?;
        if transaction_hash != signed.hash {
            warn!(
                node_hash = ?transaction_hash,
                local_hash = ?signed.hash,
                "Node reported a different transaction hash"
            );
        }

        let explorer_url =
            ChainRegistry::explorer_url(source, ExplorerKind::Transaction, &format!("{:?}", transaction_hash))?;

        advance(state, BridgeState::Done);
        info!(hash = ?transaction_hash, explorer = %explorer_url, "Bridge transaction submitted");

        Ok(BridgeOutcome {
            transaction_hash,
            explorer_url,
            from_chain: source.alias(),
            to_chain: destination.alias(),
            tool_name: quote.tool_name,
            estimated_duration_seconds: quote.estimated_duration_seconds,
            from_amount: quote_request.from_amount,
            destination_amount: quote.destination_amount,
        })
    }

    fn client(&self, chain: &'static ChainConfig, role: RpcRole) -> Result<EvmClient> {
        let rpc = ResilientRpcClient::for_chain(chain, role, self.transport.clone(), self.options.retry_config.clone())?;
        Ok(EvmClient::new(rpc))
    }

    /// Native assets take the registry's decimals. Contracts are asked. Any
    /// other identifier is refused rather than guessed.
    async fn resolve_decimals(&self, chain: &'static ChainConfig, token: &str) -> Result<u8> {
        match classify_token(chain, token)? {
            TokenKind::Native => Ok(chain.native_token.decimals),
            TokenKind::Contract(address) => self.client(chain, RpcRole::Read)?.token_decimals(address).await,
        }
    }

    async fn sign(
        &self,
        writer: &EvmClient,
        wallet: &Wallet,
        request: &QuoteRequest,
        quote: &Quote,
    ) -> Result<SignedTransaction> {
        let chain = writer.chain();
        let tx = &quote.transaction_request;

        let expected = Address::from_str(&request.from_address)
            .map_err(|e| BridgeError::Signing(format!("invalid sender {}: {}", request.from_address, e)))?;
        let signer = self.wallet_store.signing_account(wallet)?.with_chain_id(chain.chain_id);

        if signer.address() != expected {
            return Err(BridgeError::Signing(format!(
                "wallet key derives {}, quote was requested for {}",
                to_checksum(&signer.address(), None),
                request.from_address
            )));
        }
        if let Some(from) = tx.from {
            if from != expected {
                return Err(BridgeError::Signing(format!(
                    "quote transaction is from {}, not {}",
                    to_checksum(&from, None),
                    request.from_address
                )));
            }
        }
        if let Some(chain_id) = tx.chain_id {
            if chain_id != chain.chain_id {
                return Err(BridgeError::Signing(format!(
                    "quote transaction targets chain {}, expected {} ({})",
                    chain_id,
                    chain.chain_id,
                    chain.alias()
                )));
            }
        }

        let nonce = writer.transaction_count(expected).await?;
        let gas_price = match tx.gas_price {
            Some(price) => price,
            None => writer.gas_price().await?,
        };

        let required = tx
            .gas_limit
            .checked_mul(gas_price)
            .and_then(|fee| fee.checked_add(tx.value))
            .ok_or_else(|| BridgeError::Signing("transaction cost overflows".to_string()))?;
        let available = writer.balance(expected).await?;
        if available < required {
            return Err(BridgeError::InsufficientFunds {
                chain: chain.alias().to_string(),
                required: required.to_string(),
                available: available.to_string(),
            });
        }

        let typed: TypedTransaction = TransactionRequest::new()
            .from(expected)
            .to(tx.to)
            .data(tx.data.clone())
            .value(tx.value)
            .gas(tx.gas_limit)
            .gas_price(gas_price)
            .nonce(nonce)
            .chain_id(chain.chain_id)
            .into();

        let signature = signer
            .sign_transaction_sync(&typed)
            .map_err(|e| BridgeError::Signing(e.to_string()))?;
        let raw = typed.rlp_signed(&signature);
        let hash = H256::from(keccak256(&raw));

        debug!(nonce = %nonce, gas_price = %gas_price, gas_limit = %tx.gas_limit, hash = ?hash, "Signed transaction");
        Ok(SignedTransaction { raw, hash })
    }
}

fn advance(state: &mut BridgeState, next: BridgeState) {
    debug!(from = %state, to = %next, "Bridge state transition");
    *state = next;
}

fn ensure_bridgeable(chain: &ChainConfig) -> Result<()> {
    if chain.bridgeable {
        Ok(())
    } else {
        Err(BridgeError::ChainNotBridgeable {
            chain: chain.alias().to_string(),
            allowed: ChainRegistry::bridgeable_chains().join(", "),
        })
    }
}

fn classify_token(chain: &ChainConfig, token: &str) -> Result<TokenKind> {
    let token = token.trim();
    if token.eq_ignore_ascii_case(chain.native_token.symbol) || token.eq_ignore_ascii_case(NATIVE_PLACEHOLDER) {
        return Ok(TokenKind::Native);
    }

    let is_address = token.len() == 42
        && (token.starts_with("0x") || token.starts_with("0X"))
        && token[2..].chars().all(|c| c.is_ascii_hexdigit());

    if is_address {
        let address = Address::from_str(&token[2..]).map_err(|e| BridgeError::DecimalResolution {
            token: token.to_string(),
            chain: chain.alias().to_string(),
            reason: e.to_string(),
        })?;
        return Ok(if address.is_zero() {
            TokenKind::Native
        } else {
            TokenKind::Contract(address)
        });
    }

    Err(BridgeError::DecimalResolution {
        token: token.to_string(),
        chain: chain.alias().to_string(),
        reason: format!(
            "not the native symbol {} or a contract address",
            chain.native_token.symbol
        ),
    })
}
