use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single JSON-RPC call against a single endpoint.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RpcFailure {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("RPC error {code}: {message}")]
    JsonRpc { code: i64, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RpcFailure {
    /// Whether a write that failed this way may still have reached the node.
    pub fn outcome_unknown(&self) -> bool {
        match self {
            RpcFailure::Timeout | RpcFailure::Transport(_) | RpcFailure::Malformed(_) => true,
            RpcFailure::Status(code) => *code >= 500,
            RpcFailure::JsonRpc { .. } => false,
        }
    }
}

/// Last error seen on one endpoint before the client moved on.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointFailure {
    pub endpoint: String,
    pub attempts: u32,
    pub failure: RpcFailure,
}

impl fmt::Display for EndpointFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} attempts): {}", self.endpoint, self.attempts, self.failure)
    }
}

fn join_failures(failures: &[EndpointFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" with status {}", code),
        None => String::new(),
    }
}

fn outcome_label(outcome_unknown: &bool) -> &'static str {
    if *outcome_unknown {
        "outcome unknown, check the chain before retrying"
    } else {
        "rejected"
    }
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Unsupported chain: {identifier}. Supported chains: {supported}")]
    UnsupportedChain { identifier: String, supported: String },

    #[error("Chain {chain} is not enabled for bridging. Bridgeable chains: {allowed}")]
    ChainNotBridgeable { chain: String, allowed: String },

    #[error("No wallet found at {}. Run `evm-wallet setup` first", .path.display())]
    WalletNotFound { path: PathBuf },

    #[error("Wallet file {} is invalid: {reason}", .path.display())]
    CorruptWallet { path: PathBuf, reason: String },

    #[error("Wallet storage error at {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot resolve decimals for token {token} on {chain}: {reason}")]
    DecimalResolution { token: String, chain: String, reason: String },

    #[error("Quote request failed{}: {body}", status_suffix(.status))]
    Quote { status: Option<u16>, body: String },

    #[error("All RPC endpoints for {chain} failed: {}", join_failures(.failures))]
    NetworkExhausted { chain: String, failures: Vec<EndpointFailure> },

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Submission to {endpoint} failed ({}): {failure}", outcome_label(.outcome_unknown))]
    Submission {
        endpoint: String,
        failure: RpcFailure,
        outcome_unknown: bool,
    },

    #[error("Insufficient funds on {chain}: need {required} wei, have {available} wei")]
    InsufficientFunds { chain: String, required: String, available: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
