//! Utility functions and helpers
//!
//! Hashing, Base58, timestamps, randomness and JSON helpers shared by the
//! ledger and wallet modules.

pub mod crypto;
pub mod serialization;

pub use crypto::{
    base58_decode, base58_encode, current_timestamp, double_sha256, random_bytes, sha256_digest,
};

pub use serialization::{deserialize, serialize};
