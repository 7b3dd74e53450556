//! P-256 key material
//!
//! `PrivateKey` wraps a validated scalar. The underlying signing key wipes
//! itself on drop and `Debug` never prints it. `PublicKey` is always a valid
//! uncompressed SEC1 point (0x04 || X || Y).

use crate::error::CryptoError;
use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use p256::ecdsa::{SigningKey, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

pub const PRIVATE_KEY_LEN: usize = 32;
pub const PUBLIC_KEY_LEN: usize = 65;

const UNCOMPRESSED_TAG: u8 = 0x04;

#[derive(Clone)]
pub struct PrivateKey {
    key: SigningKey,
}

impl PrivateKey {
    pub fn generate() -> Self {
        PrivateKey {
            key: SigningKey::random(&mut rand::thread_rng()),
        }
    }

    /// Big-endian scalar; rejects zero and anything not below the curve order
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != PRIVATE_KEY_LEN {
            return Err(CryptoError::InvalidPrivateKey(format!(
                "expected {PRIVATE_KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let key = SigningKey::from_slice(bytes).map_err(|_| {
            CryptoError::InvalidPrivateKey("scalar is zero or not below the curve order".into())
        })?;
        Ok(PrivateKey { key })
    }

    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(
            HEXLOWER_PERMISSIVE
                .decode(hex.trim().as_bytes())
                .map_err(|e| CryptoError::InvalidPrivateKey(format!("invalid hex: {e}")))?,
        );
        Self::from_bytes(&bytes)
    }

    pub fn to_bytes(&self) -> Zeroizing<[u8; PRIVATE_KEY_LEN]> {
        let mut out = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
        out.copy_from_slice(&self.key.to_bytes());
        out
    }

    pub fn to_hex(&self) -> String {
        HEXLOWER.encode(self.to_bytes().as_slice())
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(self.key.verifying_key())
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.key
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.key.verifying_key() == other.key.verifying_key()
    }
}

impl Eq for PrivateKey {}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

impl Serialize for PrivateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let hex = Zeroizing::new(self.to_hex());
        serializer.serialize_str(&hex)
    }
}

impl<'de> Deserialize<'de> for PrivateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = Zeroizing::new(String::deserialize(deserializer)?);
        PrivateKey::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    /// Accepts only an uncompressed point that lies on the curve
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != PUBLIC_KEY_LEN {
            return Err(CryptoError::InvalidPublicKey(format!(
                "expected {PUBLIC_KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        if bytes[0] != UNCOMPRESSED_TAG {
            return Err(CryptoError::InvalidPublicKey(format!(
                "expected uncompressed tag 0x04, got {:#04x}",
                bytes[0]
            )));
        }
        VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|_| CryptoError::InvalidPublicKey("point is not on the curve".into()))?;
        let mut out = [0u8; PUBLIC_KEY_LEN];
        out.copy_from_slice(bytes);
        Ok(PublicKey(out))
    }

    fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        let mut out = [0u8; PUBLIC_KEY_LEN];
        out.copy_from_slice(point.as_bytes());
        PublicKey(out)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        HEXLOWER.encode(&self.0)
    }

    pub(crate) fn verifying_key(&self) -> Result<VerifyingKey, CryptoError> {
        VerifyingKey::from_sec1_bytes(&self.0)
            .map_err(|_| CryptoError::InvalidPublicKey("point is not on the curve".into()))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        let bytes = HEXLOWER_PERMISSIVE
            .decode(hex.as_bytes())
            .map_err(serde::de::Error::custom)?;
        PublicKey::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_round_trips_through_hex() {
        let key = PrivateKey::generate();
        let restored = PrivateKey::from_hex(&key.to_hex()).unwrap();
        assert_eq!(restored, key);
        assert_eq!(restored.public_key(), key.public_key());
    }

    #[test]
    fn test_public_key_is_uncompressed() {
        let public_key = PrivateKey::generate().public_key();
        assert_eq!(public_key.as_bytes().len(), PUBLIC_KEY_LEN);
        assert_eq!(public_key.as_bytes()[0], 0x04);
        assert_eq!(PublicKey::from_bytes(public_key.as_bytes()).unwrap(), public_key);
    }

    #[test]
    fn test_invalid_scalars_are_rejected() {
        assert!(matches!(
            PrivateKey::from_bytes(&[0u8; 32]),
            Err(CryptoError::InvalidPrivateKey(_))
        ));
        assert!(matches!(
            PrivateKey::from_bytes(&[0xff; 32]),
            Err(CryptoError::InvalidPrivateKey(_))
        ));
        assert!(matches!(
            PrivateKey::from_bytes(&[1u8; 31]),
            Err(CryptoError::InvalidPrivateKey(_))
        ));
        assert!(matches!(
            PrivateKey::from_hex("not hex"),
            Err(CryptoError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn test_off_curve_point_is_rejected() {
        let mut bytes = [0u8; PUBLIC_KEY_LEN];
        bytes[0] = 0x04;
        bytes[64] = 7;
        assert!(PublicKey::from_bytes(&bytes).is_err());

        let mut compressed_tag = *PrivateKey::generate().public_key().as_bytes();
        compressed_tag[0] = 0x02;
        assert!(PublicKey::from_bytes(&compressed_tag).is_err());
    }

    #[test]
    fn test_debug_hides_the_scalar() {
        let key = PrivateKey::generate();
        let printed = format!("{key:?}");
        assert!(!printed.contains(&key.to_hex()));
    }

    #[test]
    fn test_json_form() {
        let key = PrivateKey::generate();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", key.to_hex()));
        let back: PrivateKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
