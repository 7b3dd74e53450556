//! Keys and the canonical signature engine

pub mod keys;
pub mod signature;

pub use keys::{PrivateKey, PublicKey, PRIVATE_KEY_LEN, PUBLIC_KEY_LEN};
