use crate::core::{Block, Hash256, Transaction};
use crate::error::Result;
use crate::wallet::convert_address;
use data_encoding::HEXLOWER;
use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// An unspent output and where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub tx_hash: Hash256,
    pub tx_index: u32,
    pub value: u64,
    pub script_pub_key: Vec<u8>,
    /// Base58Check address for 20-byte scripts, raw hex otherwise
    pub address: String,
    pub is_coinbase: bool,
    pub height: u64,
}

impl Utxo {
    pub fn new(
        tx_hash: Hash256,
        tx_index: u32,
        value: u64,
        script_pub_key: Vec<u8>,
        is_coinbase: bool,
        height: u64,
    ) -> Utxo {
        let address = script_address(&script_pub_key);
        Utxo {
            tx_hash,
            tx_index,
            value,
            script_pub_key,
            address,
            is_coinbase,
            height,
        }
    }
}

/// What the wallet needs from a UTXO index
pub trait UtxoIndex: Send + Sync {
    fn get_utxo(&self, tx_hash: &Hash256, tx_index: u32) -> Option<Utxo>;
    /// UTXOs owned by `address`, oldest first
    fn get_address_utxos(&self, address: &str) -> Vec<Utxo>;
    fn get_balance(&self, address: &str) -> u64;
    fn add_utxo(&self, utxo: Utxo);
}

type OutPoint = (Hash256, u32);

#[derive(Default)]
struct UtxoState {
    next_seq: u64,
    // insertion sequence -> utxo, so address queries come back in arrival order
    by_seq: BTreeMap<u64, Utxo>,
    seq_of: HashMap<OutPoint, u64>,
    balances: HashMap<String, u64>,
}

impl UtxoState {
    fn add(&mut self, utxo: Utxo) {
        self.remove(&utxo.tx_hash, utxo.tx_index);
        let balance = self.balances.entry(utxo.address.clone()).or_insert(0);
        *balance = balance.saturating_add(utxo.value);

        let seq = self.next_seq;
        self.next_seq += 1;
        self.seq_of.insert((utxo.tx_hash, utxo.tx_index), seq);
        self.by_seq.insert(seq, utxo);
    }

    fn remove(&mut self, tx_hash: &Hash256, tx_index: u32) -> Option<Utxo> {
        let seq = self.seq_of.remove(&(*tx_hash, tx_index))?;
        let utxo = self.by_seq.remove(&seq)?;
        if let Some(balance) = self.balances.get_mut(&utxo.address) {
            *balance = balance.saturating_sub(utxo.value);
            if *balance == 0 {
                self.balances.remove(&utxo.address);
            }
        }
        Some(utxo)
    }

    fn apply(&mut self, tx: &Transaction, height: u64) {
        for input in tx.get_inputs() {
            if self
                .remove(&input.get_prev_tx_hash(), input.get_prev_tx_index())
                .is_none()
            {
                debug!(
                    "Input {}:{} was not in the UTXO set",
                    input.get_prev_tx_hash(),
                    input.get_prev_tx_index()
                );
            }
        }
        for (index, output) in tx.get_outputs().iter().enumerate() {
            self.add(Utxo::new(
                tx.get_hash(),
                index as u32,
                output.get_value(),
                output.get_script_pub_key().to_vec(),
                tx.is_coinbase(),
                height,
            ));
        }
    }
}

/// In-memory UTXO index
#[derive(Default)]
pub struct UtxoSet {
    state: RwLock<UtxoState>,
}

impl UtxoSet {
    pub fn new() -> UtxoSet {
        Self::default()
    }

    pub fn remove_utxo(&self, tx_hash: &Hash256, tx_index: u32) -> Option<Utxo> {
        self.state.write().remove(tx_hash, tx_index)
    }

    /// Spend every input and add every output of the block's transactions
    pub fn process_block(&self, block: &Block) -> Result<()> {
        let mut state = self.state.write();
        for tx in block.get_transactions() {
            state.apply(tx, block.get_height());
        }
        debug!(
            "Applied block at height {} ({} transactions)",
            block.get_height(),
            block.get_transactions().len()
        );
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.state.read().by_seq.len()
    }
}

impl UtxoIndex for UtxoSet {
    fn get_utxo(&self, tx_hash: &Hash256, tx_index: u32) -> Option<Utxo> {
        let state = self.state.read();
        let seq = state.seq_of.get(&(*tx_hash, tx_index))?;
        state.by_seq.get(seq).cloned()
    }

    fn get_address_utxos(&self, address: &str) -> Vec<Utxo> {
        self.state
            .read()
            .by_seq
            .values()
            .filter(|utxo| utxo.address == address)
            .cloned()
            .collect()
    }

    fn get_balance(&self, address: &str) -> u64 {
        self.state.read().balances.get(address).copied().unwrap_or(0)
    }

    fn add_utxo(&self, utxo: Utxo) {
        self.state.write().add(utxo);
    }
}

fn script_address(script_pub_key: &[u8]) -> String {
    convert_address(script_pub_key).unwrap_or_else(|| HEXLOWER.encode(script_pub_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{TxInput, TxOutput, DEFAULT_SEQUENCE};

    const OWNER: [u8; 20] = [0x42; 20];

    fn owner_address() -> String {
        convert_address(&OWNER).unwrap()
    }

    #[test]
    fn test_add_and_query() {
        let set = UtxoSet::new();
        let first = Utxo::new(Hash256::digest(b"a"), 0, 700, OWNER.to_vec(), false, 1);
        let second = Utxo::new(Hash256::digest(b"b"), 1, 300, OWNER.to_vec(), false, 2);
        set.add_utxo(first.clone());
        set.add_utxo(second.clone());

        assert_eq!(first.address, owner_address());
        assert_eq!(set.get_balance(&owner_address()), 1000);
        assert_eq!(set.get_address_utxos(&owner_address()), vec![first.clone(), second]);
        assert_eq!(set.get_utxo(&first.tx_hash, 0), Some(first));
        assert_eq!(set.get_utxo(&Hash256::digest(b"a"), 9), None);
    }

    #[test]
    fn test_remove_updates_balance() {
        let set = UtxoSet::new();
        let utxo = Utxo::new(Hash256::digest(b"a"), 0, 700, OWNER.to_vec(), false, 1);
        set.add_utxo(utxo.clone());
        assert_eq!(set.remove_utxo(&utxo.tx_hash, 0), Some(utxo));
        assert_eq!(set.get_balance(&owner_address()), 0);
        assert!(set.get_address_utxos(&owner_address()).is_empty());
        assert_eq!(set.remove_utxo(&Hash256::digest(b"a"), 0), None);
    }

    #[test]
    fn test_process_block_spends_and_creates() {
        let set = UtxoSet::new();
        let mut genesis = Block::with_timestamp(Hash256::zero(), 0, 1, 1_700_000_000);
        let coinbase = Transaction::new_coinbase(&OWNER, 5000);
        genesis.add_transaction(coinbase.clone());
        set.process_block(&genesis).unwrap();
        assert_eq!(set.get_balance(&owner_address()), 5000);
        assert!(set.get_utxo(&coinbase.get_hash(), 0).unwrap().is_coinbase);

        let mut next = Block::with_timestamp(genesis.calculate_hash(), 1, 1, 1_700_000_600);
        next.add_transaction(Transaction::new(
            vec![TxInput::new(coinbase.get_hash(), 0, DEFAULT_SEQUENCE)],
            vec![
                TxOutput::new(1000, vec![0x07; 20]),
                TxOutput::new(3454, OWNER.to_vec()),
            ],
            0,
            546,
        ));
        set.process_block(&next).unwrap();

        assert_eq!(set.get_utxo(&coinbase.get_hash(), 0), None);
        assert_eq!(set.get_balance(&owner_address()), 3454);
        assert_eq!(set.count(), 2);
    }

    #[test]
    fn test_non_standard_script_is_keyed_by_hex() {
        let utxo = Utxo::new(Hash256::digest(b"x"), 0, 1, vec![0xab, 0xcd], false, 0);
        assert_eq!(utxo.address, "abcd");
    }
}
