//! UTXO transaction assembly
//!
//! Coins are selected greedily in the order the index returns them, change
//! goes back to the sender only when it is non-zero, every input is signed
//! and the hash is computed last.

use crate::core::monetary::{meets_fee_floor, DEFAULT_SEQUENCE};
use crate::core::{Transaction, TxInput, TxOutput};
use crate::error::{FundsError, LedgerError, Result};
use crate::storage::{Utxo, UtxoIndex};
use crate::wallet::{Account, PubKeyHash};
use log::debug;

/// UTXOs picked to fund a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtxoSelection {
    pub utxos: Vec<Utxo>,
    pub total: u64,
}

/// Take UTXOs in order until `target` is covered
pub fn select_utxos(available: &[Utxo], target: u64) -> Result<UtxoSelection> {
    let mut selected = Vec::new();
    let mut total: u64 = 0;
    for utxo in available {
        if total >= target {
            break;
        }
        total = total.checked_add(utxo.value).ok_or(FundsError::Overflow)?;
        selected.push(utxo.clone());
    }

    if total < target {
        let available_total = available
            .iter()
            .fold(0u64, |acc, utxo| acc.saturating_add(utxo.value));
        return Err(FundsError::InsufficientFunds {
            required: target,
            available: available_total,
        }
        .into());
    }

    Ok(UtxoSelection {
        utxos: selected,
        total,
    })
}

pub struct TransactionBuilder<'a> {
    utxo_index: &'a dyn UtxoIndex,
    min_fee: u64,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(utxo_index: &'a dyn UtxoIndex, min_fee: u64) -> Self {
        TransactionBuilder {
            utxo_index,
            min_fee,
        }
    }

    /// Checks that need nothing but the request itself. Returns the
    /// recipient's hash.
    pub fn check_request(&self, to_address: &str, amount: u64, fee: u64) -> Result<PubKeyHash> {
        if amount == 0 {
            return Err(FundsError::ZeroAmount.into());
        }
        if !meets_fee_floor(fee, self.min_fee) {
            return Err(FundsError::FeeTooLow {
                fee,
                minimum: self.min_fee,
            }
            .into());
        }
        PubKeyHash::from_address(to_address).map_err(LedgerError::InvalidRecipientAddress)
    }

    /// Select, assemble and sign a transfer from `sender`
    pub fn build(
        &self,
        sender: &Account,
        recipient: &PubKeyHash,
        amount: u64,
        fee: u64,
    ) -> Result<Transaction> {
        let utxos = self.utxo_index.get_address_utxos(sender.get_address());
        if utxos.is_empty() {
            return Err(FundsError::NoUtxos(sender.get_address().to_string()).into());
        }

        let needed = amount.checked_add(fee).ok_or(FundsError::Overflow)?;
        let selection = select_utxos(&utxos, needed)?;
        debug!(
            "Selected {} of {} UTXOs ({} for {} needed)",
            selection.utxos.len(),
            utxos.len(),
            selection.total,
            needed
        );

        // the public key stands in for the scriptSig until signing replaces it
        let placeholder = sender.get_public_key().as_bytes().to_vec();
        let inputs = selection
            .utxos
            .iter()
            .map(|utxo| {
                TxInput::new(utxo.tx_hash, utxo.tx_index, DEFAULT_SEQUENCE)
                    .with_script_sig(placeholder.clone())
            })
            .collect();

        let mut outputs = vec![TxOutput::new(amount, recipient.to_script())];
        let change = selection.total - needed;
        if change > 0 {
            outputs.push(TxOutput::new(change, sender.get_pub_key_hash().to_script()));
        }

        let mut tx = Transaction::new(inputs, outputs, 0, fee);
        tx.sign(sender.get_private_key())?;
        Ok(tx)
    }
}
