use rand::RngCore;
use ring::digest::{Context, SHA256};

use crate::error::{AddressError, LedgerError, Result};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current time in whole seconds since the Unix epoch
pub fn current_timestamp() -> Result<u64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| LedgerError::Config(format!("System time error: {e}")))?;
    Ok(duration.as_secs())
}

pub fn sha256_digest(data: &[u8]) -> [u8; 32] {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    let mut out = [0u8; 32];
    out.copy_from_slice(digest.as_ref());
    out
}

/// SHA256(SHA256(data)), used for Base58Check checksums
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256_digest(&sha256_digest(data))
}

pub fn base58_encode(data: &[u8]) -> String {
    bs58::encode(data).into_string()
}

pub fn base58_decode(data: &str) -> std::result::Result<Vec<u8>, AddressError> {
    bs58::decode(data)
        .into_vec()
        .map_err(|e| AddressError::InvalidBase58(e.to_string()))
}

/// Fill a fresh buffer from the thread-local CSPRNG
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_encoding::HEXLOWER;

    #[test]
    fn test_sha256_empty_input() {
        assert_eq!(
            HEXLOWER.encode(&sha256_digest(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_base58_round_trip() {
        let data = [0u8, 1, 2, 3, 255];
        let encoded = base58_encode(&data);
        assert_eq!(base58_decode(&encoded).unwrap(), data);
        assert!(base58_decode("0OIl").is_err());
    }

    #[test]
    fn test_random_bytes_differ() {
        let a: [u8; 32] = random_bytes();
        let b: [u8; 32] = random_bytes();
        assert_ne!(a, b);
    }
}
