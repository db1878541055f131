//! Local key custody.
//!
//! # Security
//! - Key material lives in a [`SecretString`] and is zeroized on drop
//! - `Debug` output and [`WalletInfo`] never include the key
//! - The key is exposed only to the store (when persisting) and to
//!   [`WalletStore::signing_account`] (when signing)

pub mod store;

use chrono::{SecondsFormat, Utc};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use ethers::utils::to_checksum;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::models::{BridgeError, Result};

pub use store::{FileWalletStore, WalletStore};

pub struct Wallet {
    /// Checksummed `0x` address.
    pub address: String,
    private_key: SecretString,
    /// RFC 3339 creation time.
    pub created_at: String,
}

/// The shareable part of a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    pub address: String,
    pub created_at: String,
}

impl Wallet {
    pub fn new(address: String, private_key: SecretString, created_at: String) -> Self {
        Self {
            address,
            private_key,
            created_at,
        }
    }

    /// Fresh secp256k1 keypair from the OS RNG. No I/O.
    pub fn generate() -> Self {
        let signer = LocalWallet::new(&mut rand::thread_rng());
        let private_key = SecretString::from(format!("0x{}", hex::encode(signer.signer().to_bytes())));

        Self {
            address: to_checksum(&signer.address(), None),
            private_key,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Hex key material. Use with extreme caution.
    pub fn private_key_material(&self) -> &SecretString {
        &self.private_key
    }

    pub fn info(&self) -> WalletInfo {
        WalletInfo {
            address: self.address.clone(),
            created_at: self.created_at.clone(),
        }
    }

    /// Parses the key material without checking it against `address`.
    pub(crate) fn derive_signer(&self) -> Result<LocalWallet> {
        LocalWallet::from_str(self.private_key.expose_secret())
            .map_err(|e| BridgeError::Signing(format!("invalid key material: {}", e)))
    }

    pub(crate) fn is_owned_by(&self, signer: &LocalWallet) -> Result<bool> {
        let stored = Address::from_str(&self.address)
            .map_err(|e| BridgeError::Signing(format!("invalid wallet address {}: {}", self.address, e)))?;
        Ok(signer.address() == stored)
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
