// Transactions follow the UTXO model: each input spends an output of an
// earlier transaction and each output locks value to a script.
// A transaction's hash is always the last thing computed, after signing.

use crate::core::codec::{Reader, Writer};
use crate::core::monetary::CURRENT_VERSION;
use crate::core::Hash256;
use crate::crypto::signature::{self, MIN_DER_LEN};
use crate::crypto::{PrivateKey, PublicKey, PUBLIC_KEY_LEN};
use crate::error::{CryptoError, FormatError, Result, ValidationError};
use crate::utils::sha256_digest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// prev hash + index + scriptSig length + sequence
pub const TX_INPUT_MIN_LEN: usize = 32 + 4 + 4 + 4;
/// value + scriptPubKey length
pub const TX_OUTPUT_MIN_LEN: usize = 8 + 4;
/// version + both counts + lock time + fee + hash
pub const TRANSACTION_MIN_LEN: usize = 4 + 4 + 4 + 8 + 8 + 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    prev_tx_hash: Hash256,
    prev_tx_index: u32,
    script_sig: Vec<u8>, // public key followed by the DER signature once signed
    sequence: u32,
}

impl TxInput {
    pub fn new(prev_tx_hash: Hash256, prev_tx_index: u32, sequence: u32) -> TxInput {
        TxInput {
            prev_tx_hash,
            prev_tx_index,
            script_sig: vec![],
            sequence,
        }
    }

    pub fn with_script_sig(mut self, script_sig: Vec<u8>) -> TxInput {
        self.script_sig = script_sig;
        self
    }

    pub fn get_prev_tx_hash(&self) -> Hash256 {
        self.prev_tx_hash
    }

    pub fn get_prev_tx_index(&self) -> u32 {
        self.prev_tx_index
    }

    pub fn get_script_sig(&self) -> &[u8] {
        self.script_sig.as_slice()
    }

    pub fn get_sequence(&self) -> u32 {
        self.sequence
    }

    pub(crate) fn set_script_sig(&mut self, script_sig: Vec<u8>) {
        self.script_sig = script_sig;
    }

    /// The public key half of a signed scriptSig
    pub fn get_pub_key(&self) -> Option<&[u8]> {
        self.script_sig.get(..PUBLIC_KEY_LEN)
    }

    /// The only input rule is a 32-byte previous hash, which `Hash256`
    /// already guarantees. An all-zero hash is a valid reference.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        Ok(())
    }

    pub(crate) fn write_to(&self, writer: &mut Writer) -> std::result::Result<(), FormatError> {
        writer.put_hash(&self.prev_tx_hash);
        writer.put_u32(self.prev_tx_index);
        writer.put_var_bytes("script_sig", &self.script_sig)?;
        writer.put_u32(self.sequence);
        Ok(())
    }

    pub(crate) fn read_from(reader: &mut Reader<'_>) -> std::result::Result<Self, FormatError> {
        Ok(TxInput {
            prev_tx_hash: reader.read_hash("prev_tx_hash")?,
            prev_tx_index: reader.read_u32("prev_tx_index")?,
            script_sig: reader.read_var_bytes("script_sig")?,
            sequence: reader.read_u32("sequence")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    value: u64,
    script_pub_key: Vec<u8>, // the 20-byte public key hash of the owner
}

impl TxOutput {
    pub fn new(value: u64, script_pub_key: Vec<u8>) -> TxOutput {
        TxOutput {
            value,
            script_pub_key,
        }
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn get_script_pub_key(&self) -> &[u8] {
        self.script_pub_key.as_slice()
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.value == 0 {
            return Err(ValidationError::ZeroOutputValue);
        }
        if self.script_pub_key.is_empty() {
            return Err(ValidationError::EmptyScriptPubKey);
        }
        Ok(())
    }

    pub(crate) fn write_to(&self, writer: &mut Writer) -> std::result::Result<(), FormatError> {
        writer.put_u64(self.value);
        writer.put_var_bytes("script_pub_key", &self.script_pub_key)
    }

    pub(crate) fn read_from(reader: &mut Reader<'_>) -> std::result::Result<Self, FormatError> {
        Ok(TxOutput {
            value: reader.read_u64("value")?,
            script_pub_key: reader.read_var_bytes("script_pub_key")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    version: u32,
    inputs: Vec<TxInput>,
    outputs: Vec<TxOutput>,
    lock_time: u64,
    fee: u64,
    hash: Hash256,
}

impl Transaction {
    /// Assemble a transaction and compute its hash from the current contents
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>, lock_time: u64, fee: u64) -> Self {
        let mut tx = Transaction {
            version: CURRENT_VERSION,
            inputs,
            outputs,
            lock_time,
            fee,
            hash: Hash256::zero(),
        };
        tx.update_hash();
        tx
    }

    /// Rebuild a transaction exactly as it was stored, hash included
    pub fn from_parts(
        version: u32,
        inputs: Vec<TxInput>,
        outputs: Vec<TxOutput>,
        lock_time: u64,
        fee: u64,
        hash: Hash256,
    ) -> Self {
        Transaction {
            version,
            inputs,
            outputs,
            lock_time,
            fee,
            hash,
        }
    }

    /// A coinbase has no inputs and creates `value` out of nothing
    pub fn new_coinbase(to: &[u8], value: u64) -> Self {
        Self::new(vec![], vec![TxOutput::new(value, to.to_vec())], 0, 0)
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn get_version(&self) -> u32 {
        self.version
    }

    pub fn get_inputs(&self) -> &[TxInput] {
        self.inputs.as_slice()
    }

    pub fn get_outputs(&self) -> &[TxOutput] {
        self.outputs.as_slice()
    }

    pub fn get_lock_time(&self) -> u64 {
        self.lock_time
    }

    pub fn get_fee(&self) -> u64 {
        self.fee
    }

    pub fn get_hash(&self) -> Hash256 {
        self.hash
    }

    pub fn get_output_total(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.value))
    }

    /// The digest every input signs. scriptSigs are left out so that
    /// signing one input does not invalidate the others.
    pub fn signature_hash(&self) -> Hash256 {
        Hash256::new(sha256_digest(&self.preimage(false)))
    }

    /// The transaction id, covering every field including the scriptSigs
    pub fn calculate_hash(&self) -> Hash256 {
        Hash256::new(sha256_digest(&self.preimage(true)))
    }

    pub(crate) fn update_hash(&mut self) {
        self.hash = self.calculate_hash();
    }

    // Every integer goes in at full width. Lengths are u64 so nothing here
    // can fail or truncate.
    fn preimage(&self, with_script_sig: bool) -> Vec<u8> {
        let mut data = Vec::with_capacity(
            TRANSACTION_MIN_LEN + self.inputs.len() * 80 + self.outputs.len() * 40,
        );
        data.extend_from_slice(&self.version.to_be_bytes());
        data.extend_from_slice(&(self.inputs.len() as u64).to_be_bytes());
        for input in &self.inputs {
            data.extend_from_slice(input.prev_tx_hash.as_bytes());
            data.extend_from_slice(&input.prev_tx_index.to_be_bytes());
            if with_script_sig {
                data.extend_from_slice(&(input.script_sig.len() as u64).to_be_bytes());
                data.extend_from_slice(&input.script_sig);
            }
            data.extend_from_slice(&input.sequence.to_be_bytes());
        }
        data.extend_from_slice(&(self.outputs.len() as u64).to_be_bytes());
        for output in &self.outputs {
            data.extend_from_slice(&output.value.to_be_bytes());
            data.extend_from_slice(&(output.script_pub_key.len() as u64).to_be_bytes());
            data.extend_from_slice(&output.script_pub_key);
        }
        data.extend_from_slice(&self.lock_time.to_be_bytes());
        data.extend_from_slice(&self.fee.to_be_bytes());
        data
    }

    /// Sign every input with `key` and recompute the hash
    ///
    /// Each scriptSig becomes `public key (65 bytes) || DER signature`.
    pub fn sign(&mut self, key: &PrivateKey) -> Result<()> {
        let digest = self.signature_hash();
        let public_key = key.public_key();
        for input in self.inputs.iter_mut() {
            let der = signature::sign(digest.as_bytes(), key)?;
            let mut script_sig = Vec::with_capacity(PUBLIC_KEY_LEN + der.len());
            script_sig.extend_from_slice(public_key.as_bytes());
            script_sig.extend_from_slice(&der);
            input.set_script_sig(script_sig);
        }
        self.update_hash();
        Ok(())
    }

    /// Check the signature carried by every input
    pub fn verify_signatures(&self) -> Result<()> {
        let digest = self.signature_hash();
        for (index, input) in self.inputs.iter().enumerate() {
            Self::verify_input(index, input, &digest).map_err(|source| {
                log::warn!("Rejected signature on input {index} of {}", self.hash);
                CryptoError::Input {
                    index,
                    source: Box::new(source),
                }
            })?;
        }
        Ok(())
    }

    fn verify_input(
        index: usize,
        input: &TxInput,
        digest: &Hash256,
    ) -> std::result::Result<(), CryptoError> {
        let script_sig = input.get_script_sig();
        if script_sig.len() < PUBLIC_KEY_LEN + MIN_DER_LEN {
            return Err(CryptoError::ScriptSigTooShort {
                input: index,
                len: script_sig.len(),
            });
        }
        let (key_bytes, der) = script_sig.split_at(PUBLIC_KEY_LEN);
        let public_key = PublicKey::from_bytes(key_bytes)?;
        signature::verify(digest.as_bytes(), der, &public_key)
    }

    /// Structural validation; the first failing rule is reported with the
    /// index of the input or output that broke it
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.version == 0 {
            return Err(ValidationError::TransactionVersion(self.version));
        }

        let computed = self.calculate_hash();
        if computed != self.hash {
            return Err(ValidationError::HashMismatch {
                stored: self.hash,
                computed,
            });
        }

        if self.outputs.is_empty() {
            return Err(ValidationError::MissingOutputs {
                coinbase: self.is_coinbase(),
            });
        }

        for (index, input) in self.inputs.iter().enumerate() {
            input.validate().map_err(|source| ValidationError::Input {
                index,
                source: Box::new(source),
            })?;
        }

        for (index, output) in self.outputs.iter().enumerate() {
            output.validate().map_err(|source| ValidationError::Output {
                index,
                source: Box::new(source),
            })?;
        }

        Ok(())
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::with_capacity(TRANSACTION_MIN_LEN);
        self.write_to(&mut writer)?;
        Ok(writer.into_bytes())
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        let mut reader = Reader::new(bytes);
        let tx = Self::read_from(&mut reader)?;
        reader.finish()?;
        Ok(tx)
    }

    pub(crate) fn write_to(&self, writer: &mut Writer) -> std::result::Result<(), FormatError> {
        writer.put_u32(self.version);
        writer.put_len("input_count", self.inputs.len())?;
        for input in &self.inputs {
            input.write_to(writer)?;
        }
        writer.put_len("output_count", self.outputs.len())?;
        for output in &self.outputs {
            output.write_to(writer)?;
        }
        writer.put_u64(self.lock_time);
        writer.put_u64(self.fee);
        writer.put_hash(&self.hash);
        Ok(())
    }

    pub(crate) fn read_from(reader: &mut Reader<'_>) -> std::result::Result<Self, FormatError> {
        let version = reader.read_u32("version")?;

        let input_count = reader.read_count("input_count", TX_INPUT_MIN_LEN)?;
        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            inputs.push(TxInput::read_from(reader)?);
        }

        let output_count = reader.read_count("output_count", TX_OUTPUT_MIN_LEN)?;
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            outputs.push(TxOutput::read_from(reader)?);
        }

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time: reader.read_u64("lock_time")?,
            fee: reader.read_u64("fee")?,
            hash: reader.read_hash("hash")?,
        })
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Transaction {} (version {}, fee {}, lock time {})",
            self.hash, self.version, self.fee, self.lock_time
        )?;
        if self.is_coinbase() {
            writeln!(f, "  coinbase")?;
        }
        for (i, input) in self.inputs.iter().enumerate() {
            writeln!(
                f,
                "  in  #{i}: {}:{} seq {:#x} ({} byte scriptSig)",
                input.prev_tx_hash,
                input.prev_tx_index,
                input.sequence,
                input.script_sig.len()
            )?;
        }
        for (i, output) in self.outputs.iter().enumerate() {
            writeln!(
                f,
                "  out #{i}: {} -> {}",
                output.value,
                data_encoding::HEXLOWER.encode(&output.script_pub_key)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::monetary::DEFAULT_SEQUENCE;
    use crate::error::LedgerError;

    fn spend(key: &PrivateKey) -> Transaction {
        let input = TxInput::new(Hash256::digest(b"funding"), 0, DEFAULT_SEQUENCE);
        let outputs = vec![
            TxOutput::new(1000, vec![0x11; 20]),
            TxOutput::new(3454, vec![0x22; 20]),
        ];
        let mut tx = Transaction::new(vec![input], outputs, 0, 546);
        tx.sign(key).unwrap();
        tx
    }

    #[test]
    fn test_coinbase_is_valid() {
        let tx = Transaction::new_coinbase(&[0xab; 20], 1000);
        assert!(tx.is_coinbase());
        assert!(tx.validate().is_ok());
        assert_eq!(tx.get_hash(), tx.calculate_hash());
    }

    #[test]
    fn test_zero_value_output_is_rejected() {
        assert_eq!(
            TxOutput::new(0, vec![1]).validate(),
            Err(ValidationError::ZeroOutputValue)
        );
        assert_eq!(
            TxOutput::new(5, vec![]).validate(),
            Err(ValidationError::EmptyScriptPubKey)
        );
        assert!(TxOutput::new(5, vec![1]).validate().is_ok());

        let tx = Transaction::new(vec![], vec![TxOutput::new(0, vec![1])], 0, 0);
        let err = tx.validate().unwrap_err();
        assert_eq!(err.root_cause(), &ValidationError::ZeroOutputValue);
        assert!(matches!(err, ValidationError::Output { index: 0, .. }));
    }

    #[test]
    fn test_outputs_required() {
        let coinbase = Transaction::new(vec![], vec![], 0, 0);
        assert_eq!(
            coinbase.validate(),
            Err(ValidationError::MissingOutputs { coinbase: true })
        );
        let input = TxInput::new(Hash256::digest(b"x"), 0, DEFAULT_SEQUENCE);
        let spend = Transaction::new(vec![input], vec![], 0, 0);
        assert_eq!(
            spend.validate(),
            Err(ValidationError::MissingOutputs { coinbase: false })
        );
    }

    #[test]
    fn test_zero_prev_hash_is_a_valid_reference() {
        let input = TxInput::new(Hash256::zero(), 0, DEFAULT_SEQUENCE);
        assert!(input.validate().is_ok());
        let tx = Transaction::new(vec![input], vec![TxOutput::new(1, vec![1])], 0, 0);
        assert!(tx.validate().is_ok());

        let decoded = Transaction::deserialize(&tx.serialize().unwrap()).unwrap();
        assert!(decoded.validate().is_ok());
    }

    #[test]
    fn test_tampered_fields_break_the_hash() {
        let mut tx = Transaction::new_coinbase(&[0xab; 20], 1000);
        tx.fee = 1;
        assert!(matches!(
            tx.validate(),
            Err(ValidationError::HashMismatch { .. })
        ));
    }

    #[test]
    fn test_preimage_uses_full_width_integers() {
        // indexes that agree in their low byte must still sign differently
        let a = Transaction::new(
            vec![TxInput::new(Hash256::digest(b"p"), 1, DEFAULT_SEQUENCE)],
            vec![TxOutput::new(1, vec![1])],
            0,
            0,
        );
        let b = Transaction::new(
            vec![TxInput::new(Hash256::digest(b"p"), 257, DEFAULT_SEQUENCE)],
            vec![TxOutput::new(1, vec![1])],
            0,
            0,
        );
        assert_ne!(a.signature_hash(), b.signature_hash());
    }

    #[test]
    fn test_signed_transaction_verifies() {
        let key = PrivateKey::generate();
        let tx = spend(&key);
        assert!(tx.validate().is_ok());
        assert!(tx.verify_signatures().is_ok());
        assert_eq!(
            tx.get_inputs()[0].get_pub_key(),
            Some(&key.public_key().as_bytes()[..])
        );
    }

    #[test]
    fn test_modified_output_invalidates_signature() {
        let key = PrivateKey::generate();
        let mut tx = spend(&key);
        tx.outputs[0].value = 2000;
        tx.update_hash();
        let err = tx.verify_signatures().unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Crypto(CryptoError::Input { index: 0, .. })
        ));
    }

    #[test]
    fn test_short_script_sig_is_rejected() {
        let input = TxInput::new(Hash256::digest(b"p"), 0, DEFAULT_SEQUENCE)
            .with_script_sig(vec![4; 10]);
        let tx = Transaction::new(vec![input], vec![TxOutput::new(1, vec![1])], 0, 0);
        match tx.verify_signatures() {
            Err(LedgerError::Crypto(CryptoError::Input { source, .. })) => {
                assert_eq!(*source, CryptoError::ScriptSigTooShort { input: 0, len: 10 })
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_binary_round_trip() {
        let key = PrivateKey::generate();
        let tx = spend(&key);
        let bytes = tx.serialize().unwrap();
        let decoded = Transaction::deserialize(&bytes).unwrap();
        assert_eq!(decoded, tx);
        assert!(decoded.verify_signatures().is_ok());
    }

    #[test]
    fn test_decode_rejects_short_and_trailing_input() {
        let tx = Transaction::new_coinbase(&[0xab; 20], 1000);
        let bytes = tx.serialize().unwrap();

        for cut in [0, 3, TRANSACTION_MIN_LEN - 1, bytes.len() - 1] {
            assert!(matches!(
                Transaction::deserialize(&bytes[..cut]),
                Err(LedgerError::Format(_))
            ));
        }

        let mut padded = bytes.clone();
        padded.push(0);
        assert!(matches!(
            Transaction::deserialize(&padded),
            Err(LedgerError::Format(FormatError::TrailingBytes(1)))
        ));
    }

    #[test]
    fn test_decode_rejects_oversized_script_length() {
        let tx = Transaction::new_coinbase(&[0xab; 20], 1000);
        let mut bytes = tx.serialize().unwrap();
        // version(4) + input count(4) + output count(4) + value(8), then the script length
        bytes[20..24].copy_from_slice(&u32::MAX.to_be_bytes());
        assert!(matches!(
            Transaction::deserialize(&bytes),
            Err(LedgerError::Format(FormatError::LengthOverrun {
                field: "script_pub_key",
                ..
            }))
        ));
    }
}
