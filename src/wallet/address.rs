use crate::crypto::PublicKey;
use crate::error::AddressError;
use crate::utils::{base58_decode, base58_encode, double_sha256, sha256_digest};
use data_encoding::HEXLOWER;
use std::fmt;

const VERSION: u8 = 0x00;
pub const ADDRESS_CHECK_SUM_LEN: usize = 4;
pub const PUB_KEY_HASH_LEN: usize = 20;
/// version + hash + checksum
const PAYLOAD_LEN: usize = 1 + PUB_KEY_HASH_LEN + ADDRESS_CHECK_SUM_LEN;

/// The 20-byte hash an output is locked to
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PubKeyHash([u8; PUB_KEY_HASH_LEN]);

impl PubKeyHash {
    /// Last 20 bytes of SHA-256 over the uncompressed public key
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let digest = sha256_digest(public_key.as_bytes());
        let mut out = [0u8; PUB_KEY_HASH_LEN];
        out.copy_from_slice(&digest[digest.len() - PUB_KEY_HASH_LEN..]);
        PubKeyHash(out)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; PUB_KEY_HASH_LEN] = bytes.try_into().ok()?;
        Some(PubKeyHash(array))
    }

    /// Decode a Base58Check address; the only external form accepted
    pub fn from_address(address: &str) -> Result<Self, AddressError> {
        let payload = base58_decode(address)?;
        if payload.len() != PAYLOAD_LEN {
            return Err(AddressError::InvalidLength(payload.len()));
        }
        let (body, actual_checksum) = payload.split_at(PAYLOAD_LEN - ADDRESS_CHECK_SUM_LEN);
        if actual_checksum != checksum(body) {
            return Err(AddressError::ChecksumMismatch);
        }
        if body[0] != VERSION {
            return Err(AddressError::UnsupportedVersion(body[0]));
        }
        let mut out = [0u8; PUB_KEY_HASH_LEN];
        out.copy_from_slice(&body[1..]);
        Ok(PubKeyHash(out))
    }

    pub fn to_address(&self) -> String {
        let mut payload = Vec::with_capacity(PAYLOAD_LEN);
        payload.push(VERSION);
        payload.extend_from_slice(&self.0);
        let checksum = checksum(payload.as_slice());
        payload.extend_from_slice(&checksum);
        // version + pub_key_hash + checksum
        base58_encode(payload.as_slice())
    }

    /// Raw hex of the hash, for logs and diagnostics only
    pub fn to_hex(&self) -> String {
        HEXLOWER.encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8; PUB_KEY_HASH_LEN] {
        &self.0
    }

    pub fn to_script(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl fmt::Display for PubKeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_address())
    }
}

impl fmt::Debug for PubKeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PubKeyHash({})", self.to_hex())
    }
}

pub fn hash_pub_key(public_key: &PublicKey) -> PubKeyHash {
    PubKeyHash::from_public_key(public_key)
}

fn checksum(payload: &[u8]) -> [u8; ADDRESS_CHECK_SUM_LEN] {
    let digest = double_sha256(payload);
    let mut out = [0u8; ADDRESS_CHECK_SUM_LEN];
    out.copy_from_slice(&digest[..ADDRESS_CHECK_SUM_LEN]);
    out
}

pub fn validate_address(address: &str) -> bool {
    PubKeyHash::from_address(address).is_ok()
}

/// Base58Check address for an output script, if it is a 20-byte hash
pub fn convert_address(script_pub_key: &[u8]) -> Option<String> {
    PubKeyHash::from_slice(script_pub_key).map(|hash| hash.to_address())
}
