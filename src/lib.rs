pub mod models;
pub mod config;
pub mod chains;
pub mod wallet;
pub mod bridge;

pub use models::{BridgeError, Result};
pub use config::Settings;
pub use chains::{Chain, ChainRegistry};
pub use wallet::{FileWalletStore, Wallet, WalletStore};
pub use bridge::{BridgeOrchestrator, BridgeOutcome, BridgeRequest};
