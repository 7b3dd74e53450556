use crate::config::WalletConfig;
use crate::core::Transaction;
use crate::crypto::{PrivateKey, PublicKey, PUBLIC_KEY_LEN};
use crate::error::{CryptoError, LedgerError, Result};
use crate::storage::encrypted::{decrypt_wallet_blob, encrypt_wallet_blob};
use crate::storage::{Storage, UtxoIndex};
use crate::utils::{deserialize, serialize};
use crate::wallet::{Account, PubKeyHash, TransactionBuilder};
use log::{debug, info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

pub const WALLET_FILE: &str = "wallet.dat";

const STORE_VERSION: u32 = 1;

// Plaintext inside the encrypted blob
#[derive(Serialize, Deserialize)]
struct StoredWallet {
    version: u32,
    accounts: Vec<Account>,
}

#[derive(Default)]
struct WalletState {
    accounts: HashMap<String, Account>,
    // registration order; the first entry is the default account
    order: Vec<String>,
}

impl WalletState {
    fn insert(&mut self, account: Account) {
        let address = account.get_address().to_string();
        if self.accounts.insert(address.clone(), account).is_none() {
            self.order.push(address);
        }
    }

    fn get_mut(&mut self, address: &str) -> Result<&mut Account> {
        self.accounts
            .get_mut(address)
            .ok_or_else(|| LedgerError::AccountNotFound(address.to_string()))
    }
}

/// Account set guarded by one reader-writer lock, plus the collaborators
/// needed to fund and persist it
///
/// Every method takes the lock on its own. Nothing here holds it across
/// calls, so a sequence of calls can interleave with other threads.
pub struct Wallet {
    state: RwLock<WalletState>,
    utxo_index: Arc<dyn UtxoIndex>,
    storage: Arc<dyn Storage>,
    wallet_file: String,
    min_fee: u64,
    kdf_iterations: u32,
    passphrase: Zeroizing<String>,
}

impl Wallet {
    /// A fresh in-memory wallet holding one new default account
    ///
    /// Nothing is written until `save` is called.
    pub fn new(
        config: &WalletConfig,
        passphrase: &str,
        utxo_index: Arc<dyn UtxoIndex>,
        storage: Arc<dyn Storage>,
    ) -> Result<Wallet> {
        let wallet = Self::empty(config, passphrase, utxo_index, storage);
        wallet.create_account()?;
        Ok(wallet)
    }

    /// Load the wallet file, or bootstrap and persist a new one if the
    /// storage has nothing under `config.wallet_file`
    pub fn open(
        config: &WalletConfig,
        passphrase: &str,
        utxo_index: Arc<dyn UtxoIndex>,
        storage: Arc<dyn Storage>,
    ) -> Result<Wallet> {
        let wallet = Self::empty(config, passphrase, utxo_index, storage);
        match wallet.load() {
            Ok(()) => Ok(wallet),
            Err(LedgerError::NotFound(path)) => {
                info!("No wallet at {path}, creating a new one");
                wallet.create_account()?;
                wallet.save()?;
                Ok(wallet)
            }
            Err(e) => Err(e),
        }
    }

    fn empty(
        config: &WalletConfig,
        passphrase: &str,
        utxo_index: Arc<dyn UtxoIndex>,
        storage: Arc<dyn Storage>,
    ) -> Wallet {
        Wallet {
            state: RwLock::new(WalletState::default()),
            utxo_index,
            storage,
            wallet_file: config.wallet_file.clone(),
            min_fee: config.min_fee,
            kdf_iterations: config.kdf_iterations,
            passphrase: Zeroizing::new(passphrase.to_string()),
        }
    }

    /// Generate a key pair and register it. Returns the new address.
    pub fn create_account(&self) -> Result<String> {
        let account = Account::generate();
        let address = account.get_address().to_string();
        self.state.write().insert(account);
        info!("Created account {address}");
        Ok(address)
    }

    /// Register the account for a hex private key
    ///
    /// Importing a key that is already present returns the existing account
    /// untouched.
    pub fn import_private_key(&self, private_key_hex: &str) -> Result<Account> {
        let private_key = PrivateKey::from_hex(private_key_hex)?;
        let account = Account::from_private_key(private_key);

        let mut state = self.state.write();
        if let Some(existing) = state.accounts.get(account.get_address()) {
            debug!("Key for {} already imported", existing.get_address());
            return Ok(existing.clone());
        }
        info!("Imported account {}", account.get_address());
        state.insert(account.clone());
        Ok(account)
    }

    pub fn export_private_key(&self, address: &str) -> Result<String> {
        let state = self.state.read();
        state
            .accounts
            .get(address)
            .map(|account| account.get_private_key().to_hex())
            .ok_or_else(|| LedgerError::AccountNotFound(address.to_string()))
    }

    pub fn get_account(&self, address: &str) -> Result<Account> {
        self.state
            .read()
            .accounts
            .get(address)
            .cloned()
            .ok_or_else(|| LedgerError::AccountNotFound(address.to_string()))
    }

    /// All accounts in registration order
    pub fn get_all_accounts(&self) -> Vec<Account> {
        let state = self.state.read();
        state
            .order
            .iter()
            .filter_map(|address| state.accounts.get(address).cloned())
            .collect()
    }

    pub fn get_addresses(&self) -> Vec<String> {
        self.state.read().order.clone()
    }

    /// The first account ever registered
    pub fn get_default_account(&self) -> Option<Account> {
        let state = self.state.read();
        state
            .order
            .first()
            .and_then(|address| state.accounts.get(address).cloned())
    }

    pub fn update_balance(&self, address: &str, balance: u64) -> Result<()> {
        self.state.write().get_mut(address)?.set_balance(balance);
        Ok(())
    }

    /// Cached balance of a registered account
    pub fn get_balance(&self, address: &str) -> Result<u64> {
        self.state
            .read()
            .accounts
            .get(address)
            .map(Account::get_balance)
            .ok_or_else(|| LedgerError::AccountNotFound(address.to_string()))
    }

    /// Pull the balance from the UTXO index into the account cache
    pub fn refresh_balance(&self, address: &str) -> Result<u64> {
        if !self.state.read().accounts.contains_key(address) {
            return Err(LedgerError::AccountNotFound(address.to_string()));
        }
        let balance = self.utxo_index.get_balance(address);
        self.update_balance(address, balance)?;
        Ok(balance)
    }

    /// Build and sign a transfer of `amount` from one of our accounts
    ///
    /// The amount, fee and recipient are checked before anything else is
    /// looked up. The account lookup, UTXO selection and the nonce bump each
    /// take the lock separately, so this is not atomic with respect to
    /// concurrent imports or balance updates.
    pub fn create_transaction(
        &self,
        from_address: &str,
        to_address: &str,
        amount: u64,
        fee: u64,
    ) -> Result<Transaction> {
        let builder = TransactionBuilder::new(self.utxo_index.as_ref(), self.min_fee);
        let recipient = builder.check_request(to_address, amount, fee)?;
        let sender = self.get_account(from_address)?;

        let tx = builder.build(&sender, &recipient, amount, fee)?;

        // the account may have gone away while the lock was released
        self.state.write().get_mut(from_address)?.increment_nonce();
        info!(
            "Created transaction {} sending {amount} from {from_address} to {to_address} (fee {fee})",
            tx.get_hash()
        );
        Ok(tx)
    }

    /// Sign every input of `tx` with the key of `address`
    pub fn sign_transaction(&self, tx: &mut Transaction, address: &str) -> Result<()> {
        let account = self.get_account(address)?;
        tx.sign(account.get_private_key())
    }

    /// Structural checks, every signature, and for each input whose spent
    /// output the index knows, that the signing key owns it
    pub fn verify_transaction(&self, tx: &Transaction) -> Result<()> {
        tx.validate()?;
        tx.verify_signatures()?;

        for (index, input) in tx.get_inputs().iter().enumerate() {
            let Some(utxo) = self
                .utxo_index
                .get_utxo(&input.get_prev_tx_hash(), input.get_prev_tx_index())
            else {
                debug!(
                    "Input {index} spends {}:{} which the index does not know",
                    input.get_prev_tx_hash(),
                    input.get_prev_tx_index()
                );
                continue;
            };
            let owner = input
                .get_pub_key()
                .filter(|key| key.len() == PUBLIC_KEY_LEN)
                .and_then(|key| PublicKey::from_bytes(key).ok())
                .map(|key| PubKeyHash::from_public_key(&key));
            if owner.map(|hash| hash.to_script()) != Some(utxo.script_pub_key.clone()) {
                warn!("Input {index} of {} spends an output it does not own", tx.get_hash());
                return Err(CryptoError::ScriptMismatch { input: index }.into());
            }
        }
        Ok(())
    }

    /// Encrypt the account set under the wallet passphrase and write it out
    pub fn save(&self) -> Result<()> {
        let state = self.state.write();
        let stored = StoredWallet {
            version: STORE_VERSION,
            accounts: state
                .order
                .iter()
                .filter_map(|address| state.accounts.get(address).cloned())
                .collect(),
        };
        let plaintext = Zeroizing::new(serialize(&stored)?);
        let blob = encrypt_wallet_blob(&plaintext, &self.passphrase, self.kdf_iterations)?;
        self.storage.write(&self.wallet_file, &blob)?;
        info!(
            "Saved {} accounts to {}",
            stored.accounts.len(),
            self.wallet_file
        );
        Ok(())
    }

    /// Replace the in-memory accounts with the ones stored in the wallet file
    ///
    /// A wrong passphrase or a corrupted file is an error and leaves the
    /// current accounts in place.
    pub fn load(&self) -> Result<()> {
        let mut state = self.state.write();
        let blob = self.storage.read(&self.wallet_file)?;
        let plaintext = decrypt_wallet_blob(&blob, &self.passphrase, self.kdf_iterations)
            .map_err(|e| {
                warn!("Could not decrypt {}: {e}", self.wallet_file);
                e
            })?;
        let stored: StoredWallet = deserialize(&plaintext)?;
        if stored.version != STORE_VERSION {
            return Err(LedgerError::Serialization(format!(
                "unsupported wallet version {}",
                stored.version
            )));
        }

        let mut loaded = WalletState::default();
        for account in stored.accounts {
            account.check_consistency()?;
            loaded.insert(account);
        }
        info!(
            "Loaded {} accounts from {}",
            loaded.order.len(),
            self.wallet_file
        );
        *state = loaded;
        Ok(())
    }
}

impl fmt::Display for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Wallet{{Accounts: {}}}", self.state.read().order.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Hash256, TxOutput};
    use crate::error::FundsError;
    use crate::storage::{MemoryStorage, Utxo, UtxoSet};

    fn config() -> WalletConfig {
        WalletConfig::default()
    }

    fn wallet_with(utxos: Arc<UtxoSet>, storage: Arc<MemoryStorage>) -> Wallet {
        Wallet::new(&config(), "passphrase", utxos, storage).unwrap()
    }

    fn fresh_wallet() -> (Wallet, Arc<UtxoSet>) {
        let utxos = Arc::new(UtxoSet::new());
        let wallet = wallet_with(utxos.clone(), Arc::new(MemoryStorage::new()));
        (wallet, utxos)
    }

    fn fund(utxos: &UtxoSet, address: &str, value: u64) -> Hash256 {
        let owner = PubKeyHash::from_address(address).unwrap();
        let tx_hash = Hash256::digest(address.as_bytes());
        utxos.add_utxo(Utxo::new(tx_hash, 0, value, owner.to_script(), false, 1));
        tx_hash
    }

    #[test]
    fn test_new_wallet_has_default_account() {
        let (wallet, _) = fresh_wallet();
        let default = wallet.get_default_account().unwrap();
        wallet.create_account().unwrap();
        assert_eq!(wallet.get_all_accounts().len(), 2);
        assert_eq!(wallet.get_default_account().unwrap(), default);
        assert_eq!(wallet.get_addresses()[0], default.get_address());
        assert_eq!(wallet.to_string(), "Wallet{Accounts: 2}");
    }

    #[test]
    fn test_import_is_idempotent() {
        let (wallet, _) = fresh_wallet();
        let key = PrivateKey::generate();
        let first = wallet.import_private_key(&key.to_hex()).unwrap();
        wallet.update_balance(first.get_address(), 77).unwrap();

        let second = wallet.import_private_key(&key.to_hex()).unwrap();
        assert_eq!(second.get_balance(), 77);
        assert_eq!(wallet.get_all_accounts().len(), 2);
        assert_eq!(
            wallet.export_private_key(first.get_address()).unwrap(),
            key.to_hex()
        );
    }

    #[test]
    fn test_import_rejects_bad_keys() {
        let (wallet, _) = fresh_wallet();
        assert!(matches!(
            wallet.import_private_key("not hex"),
            Err(LedgerError::Crypto(CryptoError::InvalidPrivateKey(_)))
        ));
        assert!(wallet.import_private_key(&"00".repeat(32)).is_err());
    }

    #[test]
    fn test_unknown_account() {
        let (wallet, _) = fresh_wallet();
        let stranger = Account::generate();
        let address = stranger.get_address();
        assert!(matches!(
            wallet.update_balance(address, 1),
            Err(LedgerError::AccountNotFound(_))
        ));
        assert!(matches!(
            wallet.get_balance(address),
            Err(LedgerError::AccountNotFound(_))
        ));
        assert!(wallet.export_private_key(address).is_err());
    }

    #[test]
    fn test_refresh_balance_reads_the_index() {
        let (wallet, utxos) = fresh_wallet();
        let address = wallet.get_default_account().unwrap().get_address().to_string();
        fund(&utxos, &address, 4200);
        assert_eq!(wallet.refresh_balance(&address).unwrap(), 4200);
        assert_eq!(wallet.get_balance(&address).unwrap(), 4200);
    }

    #[test]
    fn test_create_transaction_bumps_nonce() {
        let (wallet, utxos) = fresh_wallet();
        let sender = wallet.get_default_account().unwrap();
        fund(&utxos, sender.get_address(), 5000);
        let recipient = Account::generate();

        let tx = wallet
            .create_transaction(sender.get_address(), recipient.get_address(), 1000, 546)
            .unwrap();
        let values: Vec<u64> = tx.get_outputs().iter().map(TxOutput::get_value).collect();
        assert_eq!(values, vec![1000, 3454]);
        assert!(wallet.verify_transaction(&tx).is_ok());
        assert_eq!(
            wallet.get_account(sender.get_address()).unwrap().get_nonce(),
            1
        );
    }

    #[test]
    fn test_fee_checked_before_account_lookup() {
        let (wallet, _) = fresh_wallet();
        let stranger = Account::generate();
        let err = wallet
            .create_transaction(stranger.get_address(), stranger.get_address(), 10, 1)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Funds(FundsError::FeeTooLow { .. })));

        let err = wallet
            .create_transaction(stranger.get_address(), stranger.get_address(), 10, 546)
            .unwrap_err();
        assert!(matches!(err, LedgerError::AccountNotFound(_)));
    }

    #[test]
    fn test_verify_rejects_foreign_utxo() {
        let (wallet, utxos) = fresh_wallet();
        let owner = wallet.create_account().unwrap();
        let thief = wallet.get_default_account().unwrap();
        let recipient = Account::generate();
        fund(&utxos, &owner, 5000);

        let mut tx = wallet
            .create_transaction(&owner, recipient.get_address(), 1000, 546)
            .unwrap();
        wallet.sign_transaction(&mut tx, thief.get_address()).unwrap();
        assert!(tx.verify_signatures().is_ok());
        assert!(matches!(
            wallet.verify_transaction(&tx),
            Err(LedgerError::Crypto(CryptoError::ScriptMismatch { input: 0 }))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let utxos = Arc::new(UtxoSet::new());
        let storage = Arc::new(MemoryStorage::new());
        let wallet = wallet_with(utxos.clone(), storage.clone());
        let second = wallet.create_account().unwrap();
        wallet.update_balance(&second, 9).unwrap();
        wallet.save().unwrap();
        assert!(storage.contains(WALLET_FILE));

        let reopened = Wallet::open(&config(), "passphrase", utxos.clone(), storage.clone()).unwrap();
        assert_eq!(reopened.get_all_accounts(), wallet.get_all_accounts());
        assert_eq!(reopened.get_balance(&second).unwrap(), 9);

        let err = Wallet::open(&config(), "wrong", utxos, storage).err().unwrap();
        assert!(matches!(
            err,
            LedgerError::Crypto(CryptoError::Authentication)
        ));
    }

    #[test]
    fn test_failed_load_keeps_accounts() {
        let storage = Arc::new(MemoryStorage::new());
        storage.write(WALLET_FILE, &[0u8; 10]).unwrap();
        let wallet = wallet_with(Arc::new(UtxoSet::new()), storage);
        let before = wallet.get_all_accounts();
        assert!(matches!(wallet.load(), Err(LedgerError::Format(_))));
        assert_eq!(wallet.get_all_accounts(), before);
    }

    #[test]
    fn test_open_bootstraps_and_persists() {
        let storage = Arc::new(MemoryStorage::new());
        let wallet = Wallet::open(
            &config(),
            "passphrase",
            Arc::new(UtxoSet::new()),
            storage.clone(),
        )
        .unwrap();
        assert_eq!(wallet.get_all_accounts().len(), 1);
        assert!(storage.contains(WALLET_FILE));
    }
}
