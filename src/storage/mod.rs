//! Storage collaborators
//!
//! Byte storage for the encrypted wallet, the UTXO index the wallet spends
//! from, and the encryption used for wallet files.

pub mod encrypted;
pub mod kv_store;
pub mod utxo_set;

pub use encrypted::{decrypt_wallet_blob, encrypt_wallet_blob, EncryptedWalletData};
pub use kv_store::{MemoryStorage, SledStorage, Storage};
pub use utxo_set::{Utxo, UtxoIndex, UtxoSet};
