use crate::core::MIN_TRANSACTION_FEE;
use crate::error::{LedgerError, Result};
use crate::storage::encrypted::MIN_KDF_ITERATIONS;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Defaults plus environment overrides, read once per process
pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(|| {
    Config::load(None).unwrap_or_else(|e| {
        log::warn!("Ignoring invalid environment configuration: {e}");
        Config::default()
    })
});

const DATA_DIR_KEY: &str = "LEDGER_DATA_DIR";
const WALLET_FILE_KEY: &str = "LEDGER_WALLET_FILE";
const MIN_FEE_KEY: &str = "LEDGER_MIN_FEE";
const KDF_ITERATIONS_KEY: &str = "LEDGER_KDF_ITERATIONS";
const PASSPHRASE_KEY: &str = "LEDGER_WALLET_PASSPHRASE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: String,
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Storage path of the encrypted wallet blob
    pub wallet_file: String,
    /// Lowest fee `create_transaction` accepts
    pub min_fee: u64,
    /// PBKDF2 rounds; not recorded in the blob, so changing it locks out
    /// existing wallet files
    pub kdf_iterations: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: "./data".to_string(),
            wallet: WalletConfig::default(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        WalletConfig {
            wallet_file: "wallet.dat".to_string(),
            min_fee: MIN_TRANSACTION_FEE,
            kdf_iterations: MIN_KDF_ITERATIONS,
        }
    }
}

impl Config {
    /// Optional TOML file, then environment overrides, then validation
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|e| {
                    LedgerError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                Self::from_toml_str(&text)?
            }
            None => Config::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Config> {
        toml::from_str(text).map_err(|e| LedgerError::Config(format!("invalid TOML: {e}")))
    }

    /// Apply `LEDGER_*` overrides looked up through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(DATA_DIR_KEY) {
            self.data_dir = dir;
        }
        if let Some(file) = lookup(WALLET_FILE_KEY) {
            self.wallet.wallet_file = file;
        }
        if let Some(fee) = lookup(MIN_FEE_KEY) {
            self.wallet.min_fee = parse_var(MIN_FEE_KEY, &fee)?;
        }
        if let Some(iterations) = lookup(KDF_ITERATIONS_KEY) {
            self.wallet.kdf_iterations = parse_var(KDF_ITERATIONS_KEY, &iterations)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.data_dir.is_empty() {
            return Err(LedgerError::Config("data_dir must be set".to_string()));
        }
        if self.wallet.wallet_file.is_empty() {
            return Err(LedgerError::Config("wallet_file must be set".to_string()));
        }
        if self.wallet.min_fee == 0 {
            return Err(LedgerError::Config("min_fee must be positive".to_string()));
        }
        if self.wallet.kdf_iterations < MIN_KDF_ITERATIONS {
            return Err(LedgerError::Config(format!(
                "kdf_iterations must be at least {MIN_KDF_ITERATIONS}"
            )));
        }
        Ok(())
    }

    pub fn get_data_dir(&self) -> &Path {
        Path::new(&self.data_dir)
    }
}

/// Wallet passphrase from the environment, if set
pub fn wallet_passphrase_from_env() -> Option<String> {
    env::var(PASSPHRASE_KEY).ok()
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| LedgerError::Config(format!("{key}={value}: {e}")))
}
