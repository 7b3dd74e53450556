//! Wallet management
//!
//! Key pairs and their addresses, UTXO-funded transaction assembly, and the
//! lock-guarded account set that is persisted encrypted.

pub mod account;
pub mod address;
pub mod builder;
pub mod wallets;

pub use account::Account;
pub use address::{
    convert_address, hash_pub_key, validate_address, PubKeyHash, ADDRESS_CHECK_SUM_LEN,
    PUB_KEY_HASH_LEN,
};
pub use builder::{select_utxos, TransactionBuilder, UtxoSelection};
pub use wallets::{Wallet, WALLET_FILE};
