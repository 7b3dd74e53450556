//! # Ledger Core
//!
//! The data model and wallet side of my UTXO ledger, without consensus or
//! networking. When I come back to this code, here's the map:
//!
//! ## How the Code Is Organized
//! - `core/`: blocks, transactions, the binary codec and Merkle trees
//! - `crypto/`: P-256 keys and the low-S ECDSA engine with strict DER
//! - `wallet/`: addresses, accounts, the UTXO transaction builder and the
//!   locked `Wallet` facade
//! - `storage/`: storage and UTXO index collaborators, encrypted wallet blobs
//! - `config/`: TOML settings with `LEDGER_*` environment overrides
//! - `utils/`: hashing, Base58, timestamps and JSON helpers
//! - `cli/`: argument parsing for the binary
//!
//! ## Things to Remember
//! - Every transaction input signs `signature_hash`, which leaves out the
//!   scriptSigs. The transaction id is computed last and covers them.
//! - Validation returns a nested `ValidationError` naming the entity and rule
//!   that failed.
//! - Wallet files are `salt || nonce || AES-256-GCM ciphertext` and the KDF
//!   iteration count is not stored in them.

pub mod cli;
pub mod config;
pub mod core;
pub mod crypto;
pub mod error;
pub mod storage;
pub mod utils;
pub mod wallet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::{Config, WalletConfig, GLOBAL_CONFIG};
pub use core::{
    Block, Hash256, Header, MerkleProof, MerkleTree, Transaction, TxInput, TxOutput,
};
pub use crypto::{PrivateKey, PublicKey};
pub use error::{
    AddressError, CryptoError, FormatError, FundsError, LedgerError, Result, ValidationError,
};
pub use storage::{MemoryStorage, SledStorage, Storage, Utxo, UtxoIndex, UtxoSet};
pub use wallet::{
    convert_address, hash_pub_key, validate_address, Account, PubKeyHash, TransactionBuilder,
    Wallet, WALLET_FILE,
};
