use crate::error::{FormatError, Result};
use crate::storage::encrypted::cipher::{Aes256GcmCipher, NONCE_LEN, TAG_LEN};
use crate::storage::encrypted::kdf::{derive_key, SALT_LEN};
use crate::utils::random_bytes;
use zeroize::Zeroizing;

/// Smallest blob that can hold an (empty) authenticated ciphertext
pub const MIN_BLOB_LEN: usize = SALT_LEN + NONCE_LEN + TAG_LEN;

/// On-disk layout: `salt(32) || nonce(12) || ciphertext`
///
/// The iteration count is not stored, so a wallet must be opened with the
/// same configuration it was saved with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedWalletData {
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
}

impl EncryptedWalletData {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SALT_LEN + NONCE_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    pub fn from_bytes(blob: &[u8]) -> Result<Self> {
        if blob.len() < MIN_BLOB_LEN {
            return Err(FormatError::Truncated {
                field: "wallet blob",
                needed: MIN_BLOB_LEN,
                remaining: blob.len(),
            }
            .into());
        }
        let (salt, rest) = blob.split_at(SALT_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
        let mut data = EncryptedWalletData {
            salt: [0u8; SALT_LEN],
            nonce: [0u8; NONCE_LEN],
            ciphertext: ciphertext.to_vec(),
        };
        data.salt.copy_from_slice(salt);
        data.nonce.copy_from_slice(nonce);
        Ok(data)
    }
}

/// Encrypt under a fresh salt and nonce
pub fn encrypt_wallet_blob(plaintext: &[u8], passphrase: &str, iterations: u32) -> Result<Vec<u8>> {
    let salt = random_bytes::<SALT_LEN>();
    let key = derive_key(passphrase, &salt, iterations)?;
    let result = Aes256GcmCipher::new(&key).encrypt(plaintext)?;
    Ok(EncryptedWalletData {
        salt,
        nonce: result.nonce,
        ciphertext: result.ciphertext,
    }
    .to_bytes())
}

/// Reverse of [`encrypt_wallet_blob`]; a wrong passphrase is an
/// authentication error, never garbage plaintext
pub fn decrypt_wallet_blob(
    blob: &[u8],
    passphrase: &str,
    iterations: u32,
) -> Result<Zeroizing<Vec<u8>>> {
    let data = EncryptedWalletData::from_bytes(blob)?;
    let key = derive_key(passphrase, &data.salt, iterations)?;
    Aes256GcmCipher::new(&key).decrypt(&data.ciphertext, &data.nonce)
}
