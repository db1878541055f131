pub mod client;
pub mod evm;
pub mod registry;
pub mod resilience;

pub use client::{HttpTransport, RpcTransport};
pub use evm::EvmClient;
pub use registry::{Chain, ChainConfig, ChainRegistry, ExplorerKind};
pub use resilience::{ResilientRpcClient, RetryConfig, RpcRole};
