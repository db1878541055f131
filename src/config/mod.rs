pub mod rpc;
pub mod settings;

pub use rpc::RpcSettings;
pub use settings::{AggregatorSettings, AppSettings, Settings, WalletSettings};
