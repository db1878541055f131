use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::{
    chains::{
        client::RpcTransport,
        registry::{ChainConfig, EndpointCapability},
    },
    models::{BridgeError, EndpointFailure, Result, RpcFailure},
};

/// Retry configuration for read calls. Writes are never retried.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts per endpoint before moving to the next one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

/// Retry with exponential backoff. Returns the last error together with the
/// number of attempts made.
pub async fn retry_with_backoff<F, T, Fut, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> std::result::Result<T, (E, u32)>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    info!("Operation {} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(e) if attempt >= max_attempts => {
                error!("Operation {} failed after {} attempts: {}", operation_name, attempt, e);
                return Err((e, attempt));
            }
            Err(e) => {
                warn!("Operation {} failed on attempt {}: {}", operation_name, attempt, e);
                sleep(calculate_delay(config, attempt)).await;
                attempt += 1;
            }
        }
    }
}

fn calculate_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let delay_ms = config.base_delay.as_millis() as f64
        * config.backoff_multiplier.powi((attempt - 1) as i32);

    let delay = Duration::from_millis(delay_ms as u64);

    if delay > config.max_delay {
        config.max_delay
    } else {
        delay
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcRole {
    Read,
    ReadWrite,
}

/// JSON-RPC client for one chain with ordered endpoint failover.
pub struct ResilientRpcClient {
    chain: &'static ChainConfig,
    role: RpcRole,
    endpoints: Vec<&'static str>,
    transport: Arc<dyn RpcTransport>,
    retry_config: RetryConfig,
}

impl ResilientRpcClient {
    pub fn for_chain(
        chain: &'static ChainConfig,
        role: RpcRole,
        transport: Arc<dyn RpcTransport>,
        retry_config: RetryConfig,
    ) -> Result<Self> {
        let endpoints: Vec<&'static str> = chain
            .rpc_endpoints
            .iter()
            .filter(|e| role == RpcRole::Read || e.capability == EndpointCapability::ReadWrite)
            .map(|e| e.url)
            .collect();

        if endpoints.is_empty() {
            return Err(BridgeError::Config(format!(
                "No {:?} RPC endpoints configured for {}",
                role,
                chain.alias()
            )));
        }

        debug!(
            chain = chain.alias(),
            role = ?role,
            primary = endpoints[0],
            fallbacks = endpoints.len() - 1,
            "Built RPC client"
        );

        Ok(Self {
            chain,
            role,
            endpoints,
            transport,
            retry_config,
        })
    }

    pub fn chain(&self) -> &'static ChainConfig {
        self.chain
    }

    pub fn role(&self) -> RpcRole {
        self.role
    }

    pub fn endpoints(&self) -> &[&'static str] {
        &self.endpoints
    }

    /// Read call: retried per endpoint, then failed over in order.
    pub async fn request(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        self.request_with(method, params, |value| Ok(value.clone())).await
    }

    /// Read call whose answer is decoded inside the retry loop. An endpoint
    /// that answers with something `parse` rejects counts as a failed attempt
    /// and is retried and failed over like a transport error.
    pub async fn request_with<T, P>(&self, method: &str, params: serde_json::Value, parse: P) -> Result<T>
    where
        P: Fn(&serde_json::Value) -> std::result::Result<T, RpcFailure>,
    {
        let mut failures = Vec::with_capacity(self.endpoints.len());

        for endpoint in &self.endpoints {
            let operation_name = format!("{} {} via {}", self.chain.alias(), method, endpoint);
            let outcome = retry_with_backoff(&self.retry_config, &operation_name, || {
                let call = self.transport.call(endpoint, method, &params);
                let parse = &parse;
                async move { call.await.and_then(|value| parse(&value)) }
            })
            .await;

            match outcome {
                Ok(value) => return Ok(value),
                Err((failure, attempts)) => {
                    warn!(
                        chain = self.chain.alias(),
                        endpoint = *endpoint,
                        "Endpoint exhausted, failing over"
                    );
                    failures.push(EndpointFailure {
                        endpoint: endpoint.to_string(),
                        attempts,
                        failure,
                    });
                }
            }
        }

        Err(BridgeError::NetworkExhausted {
            chain: self.chain.alias().to_string(),
            failures,
        })
    }

    /// Write call: one attempt against the primary endpoint, no retry and no
    /// failover. A resend is only safe once the caller has confirmed the first
    /// attempt did not land.
    pub async fn submit(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        let endpoint = self.endpoints[0];

        if self.role != RpcRole::ReadWrite {
            return Err(BridgeError::Submission {
                endpoint: endpoint.to_string(),
                failure: RpcFailure::Transport(format!(
                    "read-only client for {} cannot submit {}, nothing was sent",
                    self.chain.alias(),
                    method
                )),
                outcome_unknown: false,
            });
        }

        self.transport
            .call(endpoint, method, &params)
            .await
            .map_err(|failure| {
                debug!(chain = self.chain.alias(), endpoint, failure = %failure, "Submission failed");
                BridgeError::Submission {
                    endpoint: endpoint.to_string(),
                    outcome_unknown: failure.outcome_unknown(),
                    failure,
                }
            })
    }
}
