use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Length in bytes of every block and transaction hash
pub const HASH_LEN: usize = 32;

/// A 32-byte SHA-256 hash (block hash, transaction hash, Merkle node)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash256([u8; HASH_LEN]);

impl Hash256 {
    pub const fn new(bytes: [u8; HASH_LEN]) -> Self {
        Hash256(bytes)
    }

    pub const fn zero() -> Self {
        Hash256([0u8; HASH_LEN])
    }

    /// Returns `None` unless `bytes` is exactly 32 bytes long
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; HASH_LEN] = bytes.try_into().ok()?;
        Some(Hash256(array))
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let bytes = HEXLOWER_PERMISSIVE.decode(hex.as_bytes()).ok()?;
        Self::from_slice(&bytes)
    }

    pub fn digest(data: &[u8]) -> Self {
        Hash256(crate::utils::sha256_digest(data))
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        HEXLOWER.encode(&self.0)
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; HASH_LEN]> for Hash256 {
    fn from(bytes: [u8; HASH_LEN]) -> Self {
        Hash256(bytes)
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self.to_hex())
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Hash256::from_hex(&hex)
            .ok_or_else(|| serde::de::Error::custom("expected 32 hex-encoded bytes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_requires_exact_length() {
        assert!(Hash256::from_slice(&[0u8; 31]).is_none());
        assert!(Hash256::from_slice(&[0u8; 33]).is_none());
        assert_eq!(Hash256::from_slice(&[7u8; 32]), Some(Hash256::new([7u8; 32])));
    }

    #[test]
    fn test_hex_round_trip() {
        let hash = Hash256::digest(b"ledger");
        assert_eq!(Hash256::from_hex(&hash.to_hex()), Some(hash));
        assert_eq!(Hash256::from_hex(&hash.to_hex().to_uppercase()), Some(hash));
        assert!(Hash256::from_hex("abcd").is_none());
    }

    #[test]
    fn test_json_form_is_hex_string() {
        let hash = Hash256::new([0xab; 32]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        let back: Hash256 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}
