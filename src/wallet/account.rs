use crate::crypto::{PrivateKey, PublicKey};
use crate::error::{CryptoError, Result};
use crate::wallet::address::{hash_pub_key, PubKeyHash};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One key pair the wallet controls
///
/// `balance` is a local cache; the UTXO index holds the real figure.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    address: String,
    public_key: PublicKey,
    private_key: PrivateKey,
    balance: u64,
    nonce: u64,
}

impl Account {
    pub fn from_private_key(private_key: PrivateKey) -> Account {
        let public_key = private_key.public_key();
        Account {
            address: hash_pub_key(&public_key).to_address(),
            public_key,
            private_key,
            balance: 0,
            nonce: 0,
        }
    }

    pub fn generate() -> Account {
        Self::from_private_key(PrivateKey::generate())
    }

    pub fn get_address(&self) -> &str {
        self.address.as_str()
    }

    pub fn get_public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub(crate) fn get_private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn get_pub_key_hash(&self) -> PubKeyHash {
        hash_pub_key(&self.public_key)
    }

    pub fn get_balance(&self) -> u64 {
        self.balance
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }

    pub(crate) fn set_balance(&mut self, balance: u64) {
        self.balance = balance;
    }

    pub(crate) fn increment_nonce(&mut self) {
        self.nonce = self.nonce.saturating_add(1);
    }

    /// A stored account must still derive to the address and public key it
    /// was saved under
    pub(crate) fn check_consistency(&self) -> Result<()> {
        let derived = self.private_key.public_key();
        if derived != self.public_key {
            return Err(CryptoError::InvalidPublicKey(format!(
                "stored public key for {} does not match its private key",
                self.address
            ))
            .into());
        }
        if hash_pub_key(&derived).to_address() != self.address {
            return Err(CryptoError::InvalidPrivateKey(format!(
                "stored address {} does not match its key",
                self.address
            ))
            .into());
        }
        Ok(())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Account{{Address: {}, Balance: {}, Nonce: {}}}",
            self.address, self.balance, self.nonce
        )
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .field("public_key", &self.public_key)
            .field("private_key", &self.private_key)
            .field("balance", &self.balance)
            .field("nonce", &self.nonce)
            .finish()
    }
}
