use crate::error::{CryptoError, Result};
use crate::storage::encrypted::cipher::{SecureKey, KEY_LEN};
use ring::pbkdf2;
use std::num::NonZeroU32;

/// Floor for PBKDF2 rounds
pub const MIN_KDF_ITERATIONS: u32 = 100_000;
pub const SALT_LEN: usize = 32;

/// PBKDF2-HMAC-SHA256 over the passphrase
pub fn derive_key(passphrase: &str, salt: &[u8], iterations: u32) -> Result<SecureKey> {
    if iterations < MIN_KDF_ITERATIONS {
        return Err(CryptoError::KeyDerivation(format!(
            "{iterations} iterations is below the minimum of {MIN_KDF_ITERATIONS}"
        ))
        .into());
    }
    let rounds = NonZeroU32::new(iterations)
        .ok_or_else(|| CryptoError::KeyDerivation("iterations must be non-zero".into()))?;

    let mut key = [0u8; KEY_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        rounds,
        salt,
        passphrase.as_bytes(),
        &mut key,
    );
    let secure = SecureKey::new(key);
    zeroize::Zeroize::zeroize(&mut key);
    Ok(secure)
}
