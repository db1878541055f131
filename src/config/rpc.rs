use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::chains::RetryConfig;

/// Network policy for chain RPC calls.
///
/// Retry settings apply to reads only; transaction submission is always a
/// single attempt regardless of these values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcSettings {
    pub timeout_seconds: u64,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_attempts: 3,
            base_delay_ms: 250,
            max_delay_ms: 5_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RpcSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_seconds == 0 {
            return Err("rpc.timeout_seconds must be positive".to_string());
        }
        if self.max_attempts == 0 {
            return Err("rpc.max_attempts must be at least 1".to_string());
        }
        if self.backoff_multiplier < 1.0 {
            return Err("rpc.backoff_multiplier must be at least 1.0".to_string());
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err("rpc.base_delay_ms must not exceed rpc.max_delay_ms".to_string());
        }
        Ok(())
    }
}
