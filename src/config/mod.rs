//! Configuration management
//!
//! Settings come from an optional TOML file and `LEDGER_*` environment
//! variables.

pub mod settings;

pub use settings::{wallet_passphrase_from_env, Config, WalletConfig, GLOBAL_CONFIG};
