use crate::core::codec::{Reader, Writer};
use crate::core::monetary::CURRENT_VERSION;
use crate::core::transaction::TRANSACTION_MIN_LEN;
use crate::core::{Hash256, MerkleProof, MerkleTree, Transaction};
use crate::error::{FormatError, Result, ValidationError};
use crate::utils::{current_timestamp, sha256_digest};
use data_encoding::HEXLOWER;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Encoded header size: version, two hashes and four u64 fields
pub const HEADER_LEN: usize = 4 + 32 + 32 + 8 + 8 + 8 + 8;
/// Header plus the transaction count
pub const BLOCK_MIN_LEN: usize = HEADER_LEN + 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub version: u32,
    pub prev_block_hash: Hash256,
    pub merkle_root: Hash256,
    /// Seconds since the Unix epoch
    pub timestamp: u64,
    pub difficulty: u64,
    pub nonce: u64,
    pub height: u64,
}

impl Header {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.version == 0 {
            return Err(ValidationError::HeaderVersion(self.version));
        }
        if self.timestamp == 0 {
            return Err(ValidationError::HeaderTimestamp);
        }
        if self.difficulty == 0 {
            return Err(ValidationError::HeaderDifficulty);
        }
        Ok(())
    }

    /// SHA-256 of the 100-byte encoded header
    pub fn hash(&self) -> Hash256 {
        Hash256::new(sha256_digest(&self.to_bytes()))
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut writer = Writer::with_capacity(HEADER_LEN);
        self.write_to(&mut writer);
        let mut out = [0u8; HEADER_LEN];
        out.copy_from_slice(&writer.into_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Header> {
        let mut reader = Reader::new(bytes);
        let header = Self::read_from(&mut reader)?;
        reader.finish()?;
        Ok(header)
    }

    fn write_to(&self, writer: &mut Writer) {
        writer.put_u32(self.version);
        writer.put_hash(&self.prev_block_hash);
        writer.put_hash(&self.merkle_root);
        writer.put_u64(self.timestamp);
        writer.put_u64(self.difficulty);
        writer.put_u64(self.nonce);
        writer.put_u64(self.height);
    }

    fn read_from(reader: &mut Reader<'_>) -> std::result::Result<Header, FormatError> {
        Ok(Header {
            version: reader.read_u32("version")?,
            prev_block_hash: reader.read_hash("prev_block_hash")?,
            merkle_root: reader.read_hash("merkle_root")?,
            timestamp: reader.read_u64("timestamp")?,
            difficulty: reader.read_u64("difficulty")?,
            nonce: reader.read_u64("nonce")?,
            height: reader.read_u64("height")?,
        })
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Header{{Version: {}, Height: {}, Difficulty: {}, Nonce: {}}}",
            self.version, self.height, self.difficulty, self.nonce
        )
    }
}

/// A header plus its transactions in canonical (insertion) order
///
/// Blocks have no internal locking. Whoever assembles a block must not share
/// it across threads until it is complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    header: Header,
    transactions: Vec<Transaction>,
}

impl Block {
    /// An empty block stamped with the current time
    pub fn new(prev_block_hash: Hash256, height: u64, difficulty: u64) -> Result<Block> {
        Ok(Self::with_timestamp(
            prev_block_hash,
            height,
            difficulty,
            current_timestamp()?,
        ))
    }

    pub fn with_timestamp(
        prev_block_hash: Hash256,
        height: u64,
        difficulty: u64,
        timestamp: u64,
    ) -> Block {
        Block {
            header: Header {
                version: CURRENT_VERSION,
                prev_block_hash,
                merkle_root: MerkleTree::calculate_merkle_root(&[]),
                timestamp,
                difficulty,
                nonce: 0,
                height,
            },
            transactions: vec![],
        }
    }

    /// Reassemble a block without touching its header
    pub fn from_parts(header: Header, transactions: Vec<Transaction>) -> Block {
        Block {
            header,
            transactions,
        }
    }

    /// Append a transaction and recompute the Merkle root
    pub fn add_transaction(&mut self, transaction: Transaction) {
        self.transactions.push(transaction);
        self.header.merkle_root = self.calculate_merkle_root();
    }

    pub fn get_header(&self) -> &Header {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_height(&self) -> u64 {
        self.header.height
    }

    pub fn get_merkle_root(&self) -> Hash256 {
        self.header.merkle_root
    }

    pub fn calculate_merkle_root(&self) -> Hash256 {
        let hashes: Vec<Hash256> = self.transactions.iter().map(|tx| tx.get_hash()).collect();
        MerkleTree::calculate_merkle_root(&hashes)
    }

    /// Block hash: SHA-256 over the encoded header
    pub fn calculate_hash(&self) -> Hash256 {
        self.header.hash()
    }

    pub fn hex_hash(&self) -> String {
        HEXLOWER.encode(self.calculate_hash().as_bytes())
    }

    pub fn verify_merkle_root(&self) -> bool {
        MerkleTree::verify_transactions(&self.transactions, &self.header.merkle_root)
    }

    /// Generate a Merkle proof for a transaction in this block
    pub fn generate_merkle_proof(&self, transaction_index: usize) -> Result<MerkleProof> {
        MerkleTree::new(&self.transactions).generate_proof(transaction_index)
    }

    /// Verify a Merkle proof against this block's Merkle root
    pub fn verify_merkle_proof(&self, proof: &MerkleProof) -> bool {
        proof.merkle_root == self.header.merkle_root && MerkleTree::verify_proof(proof)
    }

    /// Header rules, then the Merkle commitment, then every transaction
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        self.header
            .validate()
            .map_err(|e| ValidationError::Header(Box::new(e)))?;

        let actual = self.calculate_merkle_root();
        if actual != self.header.merkle_root {
            return Err(ValidationError::MerkleRootMismatch {
                expected: self.header.merkle_root,
                actual,
            });
        }

        for (index, tx) in self.transactions.iter().enumerate() {
            tx.validate().map_err(|source| ValidationError::Transaction {
                index,
                source: Box::new(source),
            })?;
        }
        Ok(())
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::with_capacity(BLOCK_MIN_LEN);
        self.header.write_to(&mut writer);
        writer.put_len("transaction_count", self.transactions.len())?;
        for tx in &self.transactions {
            let mut tx_writer = Writer::with_capacity(TRANSACTION_MIN_LEN);
            tx.write_to(&mut tx_writer)?;
            writer.put_var_bytes("transaction", &tx_writer.into_bytes())?;
        }
        Ok(writer.into_bytes())
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        let mut reader = Reader::new(bytes);
        let header = Header::read_from(&mut reader)?;

        let count = reader.read_count("transaction_count", 4 + TRANSACTION_MIN_LEN)?;
        let mut transactions = Vec::with_capacity(count);
        for _ in 0..count {
            let mut tx_reader = reader.read_sub_message("transaction")?;
            transactions.push(Transaction::read_from(&mut tx_reader)?);
            tx_reader.finish()?;
        }
        reader.finish()?;

        debug!(
            "Decoded block at height {} with {} transactions",
            header.height,
            transactions.len()
        );
        Ok(Block {
            header,
            transactions,
        })
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Block {}", self.hex_hash())?;
        writeln!(f, "  {}", self.header)?;
        writeln!(f, "  Previous: {}", self.header.prev_block_hash)?;
        writeln!(f, "  Merkle root: {}", self.header.merkle_root)?;
        writeln!(f, "  Timestamp: {}", self.header.timestamp)?;
        writeln!(f, "  Transactions: {}", self.transactions.len())?;
        for tx in &self.transactions {
            write!(f, "{tx}")?;
        }
        Ok(())
    }
}
