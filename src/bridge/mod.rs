pub mod aggregator;
pub mod amount;
pub mod orchestrator;

pub use aggregator::{LifiClient, QuoteService};
pub use amount::HumanAmount;
pub use orchestrator::{BridgeOptions, BridgeOrchestrator, BridgeOutcome, BridgeRequest, BridgeState};
