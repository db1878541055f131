use serde::{Deserialize, Serialize};

use crate::models::{BridgeError, Result};

/// Chains known to the wallet. Adding a chain means adding a variant and a
/// row in `CHAINS`; nothing else dispatches on chain identity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Chain {
    Bsc,
    OpBnb,
    BscTestnet,
    OpBnbTestnet,
}

impl Chain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Bsc => "bsc",
            Chain::OpBnb => "opbnb",
            Chain::BscTestnet => "bsc-testnet",
            Chain::OpBnbTestnet => "opbnb-testnet",
        }
    }

    /// Accepted spellings, matched case-insensitively. The first entry is canonical.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Chain::Bsc => &["bsc", "binance"],
            Chain::OpBnb => &["opbnb"],
            Chain::BscTestnet => &["bsc-testnet"],
            Chain::OpBnbTestnet => &["opbnb-testnet"],
        }
    }

    pub fn config(&self) -> &'static ChainConfig {
        CHAINS
            .iter()
            .find(|c| c.chain == *self)
            .unwrap_or_else(|| unreachable!("every Chain variant has a registry row"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeToken {
    pub symbol: &'static str,
    pub decimals: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Explorer {
    pub name: &'static str,
    pub url: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointCapability {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpcEndpoint {
    pub url: &'static str,
    pub capability: EndpointCapability,
}

impl RpcEndpoint {
    const fn read_write(url: &'static str) -> Self {
        Self {
            url,
            capability: EndpointCapability::ReadWrite,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub chain: Chain,
    pub chain_id: u64,
    pub display_name: &'static str,
    pub native_token: NativeToken,
    pub explorer: Explorer,
    /// Primary first. The order is a latency/cost preference and is preserved
    /// by every client built from it.
    pub rpc_endpoints: &'static [RpcEndpoint],
    pub bridgeable: bool,
}

impl ChainConfig {
    pub fn alias(&self) -> &'static str {
        self.chain.as_str()
    }
}

static CHAINS: [ChainConfig; 4] = [
    ChainConfig {
        chain: Chain::Bsc,
        chain_id: 56,
        display_name: "BNB Smart Chain",
        native_token: NativeToken { symbol: "BNB", decimals: 18 },
        explorer: Explorer { name: "BscScan", url: "https://bscscan.com" },
        rpc_endpoints: &[
            RpcEndpoint::read_write("https://binance.ankr.com"),
            RpcEndpoint::read_write("https://bsc-dataseed.binance.org"),
            RpcEndpoint::read_write("https://bsc.publicnode.com"),
        ],
        bridgeable: true,
    },
    ChainConfig {
        chain: Chain::OpBnb,
        chain_id: 204,
        display_name: "opBNB Mainnet",
        native_token: NativeToken { symbol: "BNB", decimals: 18 },
        explorer: Explorer { name: "opBNBScan", url: "https://opbnbscan.com" },
        rpc_endpoints: &[
            RpcEndpoint::read_write("https://opbnb-mainnet-rpc.bnbchain.org"),
            RpcEndpoint::read_write("https://opbnb.publicnode.com"),
        ],
        bridgeable: true,
    },
    ChainConfig {
        chain: Chain::BscTestnet,
        chain_id: 97,
        display_name: "BSC Testnet",
        native_token: NativeToken { symbol: "tBNB", decimals: 18 },
        explorer: Explorer { name: "BscScan Testnet", url: "https://testnet.bscscan.com" },
        rpc_endpoints: &[
            RpcEndpoint::read_write("https://bsc-testnet.publicnode.com"),
            RpcEndpoint::read_write("https://data-seed-prebsc-1-s1.binance.org:8545"),
        ],
        bridgeable: false,
    },
    ChainConfig {
        chain: Chain::OpBnbTestnet,
        chain_id: 5611,
        display_name: "opBNB Testnet",
        native_token: NativeToken { symbol: "tBNB", decimals: 18 },
        explorer: Explorer { name: "opBNBScan Testnet", url: "https://testnet.opbnbscan.com" },
        rpc_endpoints: &[RpcEndpoint::read_write("https://opbnb-testnet-rpc.bnbchain.org")],
        bridgeable: false,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorerKind {
    Transaction,
    Address,
}

impl ExplorerKind {
    fn path_segment(&self) -> &'static str {
        match self {
            ExplorerKind::Transaction => "tx",
            ExplorerKind::Address => "address",
        }
    }
}

/// Compiled-in chain table.
pub struct ChainRegistry;

impl ChainRegistry {
    /// Resolve an alias (case-insensitive) or a registered numeric chain id.
    ///
    /// Alias matches win over numeric matches. Integers that are not a
    /// registered chain id are rejected rather than passed through.
    pub fn lookup(name_or_id: &str) -> Result<&'static ChainConfig> {
        let needle = name_or_id.trim().to_lowercase();

        if let Some(config) = CHAINS
            .iter()
            .find(|c| c.chain.aliases().iter().any(|alias| *alias == needle))
        {
            return Ok(config);
        }

        if let Ok(id) = needle.parse::<u64>() {
            if let Some(config) = CHAINS.iter().find(|c| c.chain_id == id) {
                return Ok(config);
            }
        }

        Err(BridgeError::UnsupportedChain {
            identifier: name_or_id.to_string(),
            supported: Self::supported_chains().join(", "),
        })
    }

    pub fn supported_chains() -> Vec<&'static str> {
        CHAINS.iter().map(|c| c.alias()).collect()
    }

    pub fn bridgeable_chains() -> Vec<&'static str> {
        CHAINS.iter().filter(|c| c.bridgeable).map(|c| c.alias()).collect()
    }

    pub fn all() -> &'static [ChainConfig] {
        &CHAINS
    }

    pub fn explorer_url(chain: &ChainConfig, kind: ExplorerKind, value: &str) -> Result<String> {
        if value.trim().is_empty() {
            return Err(BridgeError::InvalidInput(format!(
                "explorer {} link needs a non-empty value",
                kind.path_segment()
            )));
        }

        Ok(format!("{}/{}/{}", chain.explorer.url, kind.path_segment(), value))
    }
}
