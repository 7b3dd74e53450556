// JSON helpers for the wallet plaintext and other serde payloads
use crate::error::{LedgerError, Result};
use serde::{de::DeserializeOwned, Serialize};

pub fn serialize<T: Serialize>(data: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(data)
        .map_err(|e| LedgerError::Serialization(format!("Serialization failed: {e}")))
}

pub fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| LedgerError::Serialization(format!("Deserialization failed: {e}")))
}
