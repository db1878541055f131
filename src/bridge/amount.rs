use ethers::types::U256;

use crate::models::{BridgeError, Result};

/// A human-entered decimal amount, syntax-checked but not yet scaled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumanAmount {
    integer: String,
    fraction: String,
}

impl HumanAmount {
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| BridgeError::InvalidInput(format!("amount {:?} {}", raw, reason));
        let trimmed = raw.trim();

        let (integer, fraction) = match trimmed.split_once('.') {
            Some((integer, fraction)) => (integer, fraction),
            None => (trimmed, ""),
        };

        if integer.is_empty() && fraction.is_empty() {
            return Err(invalid("is empty"));
        }
        if !integer.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid("must be a plain positive decimal number"));
        }

        let amount = Self {
            integer: integer.trim_start_matches('0').to_string(),
            fraction: fraction.trim_end_matches('0').to_string(),
        };

        if amount.integer.is_empty() && amount.fraction.is_empty() {
            return Err(invalid("must be greater than zero"));
        }

        Ok(amount)
    }

    /// Exact conversion to the token's smallest unit. Refuses to round.
    pub fn to_base_units(&self, decimals: u8) -> Result<U256> {
        let decimals = decimals as usize;
        if self.fraction.len() > decimals {
            return Err(BridgeError::InvalidInput(format!(
                "amount has {} decimal places but the token only supports {}",
                self.fraction.len(),
                decimals
            )));
        }

        let digits = format!("{}{}{}", self.integer, self.fraction, "0".repeat(decimals - self.fraction.len()));
        U256::from_dec_str(&digits)
            .map_err(|_| BridgeError::InvalidInput(format!("amount {} is too large", self)))
    }
}

impl std::fmt::Display for HumanAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let integer = if self.integer.is_empty() { "0" } else { &self.integer };
        if self.fraction.is_empty() {
            write!(f, "{}", integer)
        } else {
            write!(f, "{}.{}", integer, self.fraction)
        }
    }
}
