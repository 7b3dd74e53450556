//! Encryption at rest for wallet data
//!
//! A passphrase is stretched with PBKDF2-HMAC-SHA256 and the serialized
//! account set is sealed with AES-256-GCM. Blockchain data itself is public and
//! never encrypted.

pub mod cipher;
pub mod kdf;
pub mod wallet_encryption;

pub use cipher::{Aes256GcmCipher, EncryptionResult, SecureKey};
pub use kdf::{derive_key, MIN_KDF_ITERATIONS, SALT_LEN};
pub use wallet_encryption::{decrypt_wallet_blob, encrypt_wallet_blob, EncryptedWalletData};
