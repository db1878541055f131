use ethers::signers::LocalWallet;
use ethers::types::Address;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::models::{BridgeError, Result};
use crate::wallet::{Wallet, WalletInfo};

/// Persistence boundary for the single local wallet. An encrypted keystore or
/// a hardware signer can implement this without touching the bridge flow.
pub trait WalletStore: Send + Sync {
    /// Human-readable location, used in messages.
    fn location(&self) -> String;

    fn exists(&self) -> bool;

    fn save(&self, wallet: &Wallet) -> Result<()>;

    fn load(&self) -> Result<Wallet>;

    fn generate(&self) -> Wallet {
        Wallet::generate()
    }

    fn address(&self) -> Result<String> {
        Ok(self.load()?.address)
    }

    fn info(&self) -> Result<WalletInfo> {
        Ok(self.load()?.info())
    }

    /// Signer for one operation. A key that does not derive the stored
    /// address means the file was edited or mixed up, so it is reported as
    /// a corrupt wallet rather than a signing failure.
    fn signing_account(&self, wallet: &Wallet) -> Result<LocalWallet> {
        let signer = wallet.derive_signer()?;
        if !wallet.is_owned_by(&signer)? {
            return Err(BridgeError::CorruptWallet {
                path: PathBuf::from(self.location()),
                reason: format!("key material does not derive {}", wallet.address),
            });
        }
        Ok(signer)
    }
}

/// On-disk layout. Field names are part of the file format.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WalletFileOut<'a> {
    address: &'a str,
    private_key_material: &'a str,
    created_at: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletFileIn {
    address: Option<String>,
    #[serde(alias = "privateKey")]
    private_key_material: Option<String>,
    created_at: Option<String>,
}

/// JSON keystore at a fixed path, readable by the owner only.
#[derive(Debug, Clone)]
pub struct FileWalletStore {
    path: PathBuf,
}

impl FileWalletStore {
    pub const DEFAULT_FILE_NAME: &'static str = ".evm-wallet.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.evm-wallet.json`, or the working directory when no home is known.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::DEFAULT_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persistence_error(&self, source: io::Error) -> BridgeError {
        BridgeError::Persistence {
            path: self.path.clone(),
            source,
        }
    }

    fn corrupt(&self, reason: impl Into<String>) -> BridgeError {
        BridgeError::CorruptWallet {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    #[cfg(unix)]
    fn warn_if_exposed(&self) {
        use std::os::unix::fs::PermissionsExt;

        if let Ok(metadata) = fs::metadata(&self.path) {
            let mode = metadata.permissions().mode() & 0o777;
            if mode & 0o077 != 0 {
                warn!(
                    path = %self.path.display(),
                    mode = %format!("{:o}", mode),
                    "Wallet file is readable by other users; run chmod 600"
                );
            }
        }
    }

    #[cfg(not(unix))]
    fn warn_if_exposed(&self) {}
}

impl WalletStore for FileWalletStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Writes to a temp file in the target directory, restricts it to the
    /// owner, then renames it over the target. A failure at any step leaves
    /// no partial file behind.
    fn save(&self, wallet: &Wallet) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| self.persistence_error(e))?;

        let contents = Zeroizing::new(
            serde_json::to_string_pretty(&WalletFileOut {
                address: &wallet.address,
                private_key_material: wallet.private_key_material().expose_secret(),
                created_at: &wallet.created_at,
            })
            .map_err(|e| self.persistence_error(e.into()))?,
        );

        let mut tmp = tempfile::Builder::new()
            .prefix(".evm-wallet")
            .suffix(".tmp")
            .tempfile_in(&dir)
            .map_err(|e| self.persistence_error(e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|e| self.persistence_error(e))?;
        }

        tmp.write_all(contents.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| self.persistence_error(e))?;

        tmp.persist(&self.path)
            .map_err(|e| self.persistence_error(e.error))?;

        info!(address = %wallet.address, path = %self.path.display(), "Wallet saved");
        Ok(())
    }

    fn load(&self) -> Result<Wallet> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => Zeroizing::new(contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(BridgeError::WalletNotFound {
                    path: self.path.clone(),
                })
            }
            Err(e) => return Err(self.persistence_error(e)),
        };

        self.warn_if_exposed();

        let file: WalletFileIn = serde_json::from_str(&contents)
            .map_err(|e| self.corrupt(format!("not a wallet JSON object ({})", e)))?;

        let address = file
            .address
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| self.corrupt("missing address"))?;
        Address::from_str(&address).map_err(|_| self.corrupt(format!("malformed address {}", address)))?;

        let private_key = file
            .private_key_material
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from)
            .ok_or_else(|| self.corrupt("missing private key material"))?;

        Ok(Wallet::new(address, private_key, file.created_at.unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::signers::Signer;
    use tempfile::tempdir;

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = FileWalletStore::new(dir.path().join("wallet.json"));
        assert!(!store.exists());

        let wallet = store.generate();
        store.save(&wallet).unwrap();
        assert!(store.exists());

        let loaded = store.load().unwrap();
        assert_eq!(loaded.address, wallet.address);
        assert_eq!(loaded.created_at, wallet.created_at);
        assert_eq!(
            loaded.private_key_material().expose_secret(),
            wallet.private_key_material().expose_secret()
        );
        assert_eq!(store.address().unwrap(), wallet.address);
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        let store = FileWalletStore::new(&path);
        store.save(&store.generate()).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn test_save_creates_parent_and_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("wallet.json");
        let store = FileWalletStore::new(&path);
        store.save(&store.generate()).unwrap();

        let entries: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("wallet.json")]);
    }

    #[test]
    fn test_save_into_unwritable_location_is_persistence_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "file").unwrap();

        let store = FileWalletStore::new(blocker.join("wallet.json"));
        let err = store.save(&store.generate()).unwrap_err();
        assert!(matches!(err, BridgeError::Persistence { .. }));
    }

    #[test]
    fn test_missing_file_is_wallet_not_found() {
        let dir = tempdir().unwrap();
        let store = FileWalletStore::new(dir.path().join("absent.json"));

        assert!(matches!(store.load(), Err(BridgeError::WalletNotFound { .. })));
        assert!(matches!(store.address(), Err(BridgeError::WalletNotFound { .. })));
    }

    #[test]
    fn test_corrupt_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        let store = FileWalletStore::new(&path);

        for contents in [
            "not json",
            r#"{"privateKeyMaterial": "0x01"}"#,
            r#"{"address": "0x2B5AD5c4795c026514f8317c7a215E218DcCD6cF"}"#,
            r#"{"address": "", "privateKeyMaterial": "0x01"}"#,
            r#"{"address": "nope", "privateKeyMaterial": "0x01"}"#,
        ] {
            fs::write(&path, contents).unwrap();
            assert!(
                matches!(store.load(), Err(BridgeError::CorruptWallet { .. })),
                "{contents} should be corrupt"
            );
        }
    }

    #[test]
    fn test_accepts_legacy_private_key_field() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        let wallet = Wallet::generate();
        fs::write(
            &path,
            serde_json::json!({
                "address": wallet.address,
                "privateKey": wallet.private_key_material().expose_secret(),
                "createdAt": wallet.created_at,
            })
            .to_string(),
        )
        .unwrap();

        let store = FileWalletStore::new(&path);
        let loaded = store.load().unwrap();
        assert_eq!(
            store.signing_account(&loaded).unwrap().address(),
            wallet.derive_signer().unwrap().address()
        );
    }

    #[test]
    fn test_signing_account_rejects_mismatched_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        let wallet = Wallet::generate();
        let other = Wallet::generate();
        fs::write(
            &path,
            serde_json::json!({
                "address": other.address,
                "privateKeyMaterial": wallet.private_key_material().expose_secret(),
                "createdAt": wallet.created_at,
            })
            .to_string(),
        )
        .unwrap();

        let store = FileWalletStore::new(&path);
        let loaded = store.load().unwrap();
        assert!(matches!(
            store.signing_account(&loaded),
            Err(BridgeError::CorruptWallet { .. })
        ));
        assert_eq!(
            store.signing_account(&wallet).unwrap().address(),
            wallet.derive_signer().unwrap().address()
        );
    }

    #[test]
    fn test_info_omits_key_material() {
        let dir = tempdir().unwrap();
        let store = FileWalletStore::new(dir.path().join("wallet.json"));
        let wallet = store.generate();
        store.save(&wallet).unwrap();

        let info = serde_json::to_string(&store.info().unwrap()).unwrap();
        assert!(info.contains(&wallet.address));
        assert!(!info.contains(wallet.private_key_material().expose_secret().trim_start_matches("0x")));
    }
}
