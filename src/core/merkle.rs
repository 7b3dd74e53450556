use crate::core::{Hash256, Transaction};
use crate::error::{LedgerError, Result};
use crate::utils::sha256_digest;
use serde::{Deserialize, Serialize};

/// Merkle tree over an ordered list of transaction hashes
///
/// Levels are kept bottom-up so inclusion proofs can be produced without
/// walking a node graph. Construction is iterative; each level with an odd
/// count pairs its last hash with itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerkleTree {
    levels: Vec<Vec<Hash256>>,
}

/// Merkle proof for transaction verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Transaction hash being proven
    pub transaction_hash: Hash256,
    /// Merkle root hash
    pub merkle_root: Hash256,
    /// Sibling hashes from the leaf level up
    pub proof_path: Vec<ProofElement>,
    /// Index of the transaction in the block
    pub transaction_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofElement {
    pub hash: Hash256,
    /// true if the sibling sits on the right
    pub is_right: bool,
}

impl MerkleTree {
    pub fn new(transactions: &[Transaction]) -> Self {
        let hashes: Vec<Hash256> = transactions.iter().map(|tx| tx.get_hash()).collect();
        Self::from_hashes(&hashes)
    }

    pub fn from_hashes(hashes: &[Hash256]) -> Self {
        let mut levels = vec![hashes.to_vec()];
        let mut current = hashes.to_vec();
        while current.len() > 1 {
            Self::fold_level(&mut current);
            levels.push(current.clone());
        }
        MerkleTree { levels }
    }

    pub fn get_root_hash(&self) -> Hash256 {
        match self.levels.last().and_then(|level| level.first()) {
            Some(root) => *root,
            None => Self::empty_root(),
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.leaf_count() == 0
    }

    /// Generate a Merkle proof for the transaction at `transaction_index`
    pub fn generate_proof(&self, transaction_index: usize) -> Result<MerkleProof> {
        let leaves = self.levels.first().map(Vec::as_slice).unwrap_or(&[]);
        let transaction_hash = *leaves.get(transaction_index).ok_or_else(|| {
            LedgerError::NotFound(format!(
                "transaction index {transaction_index} out of bounds ({} leaves)",
                leaves.len()
            ))
        })?;

        let mut proof_path = Vec::new();
        let mut index = transaction_index;
        // the root level has no siblings
        for level in &self.levels[..self.levels.len() - 1] {
            let (sibling, is_right) = if index % 2 == 0 {
                (level.get(index + 1).unwrap_or(&level[index]), true)
            } else {
                (&level[index - 1], false)
            };
            proof_path.push(ProofElement {
                hash: *sibling,
                is_right,
            });
            index /= 2;
        }

        Ok(MerkleProof {
            transaction_hash,
            merkle_root: self.get_root_hash(),
            proof_path,
            transaction_index,
        })
    }

    pub fn verify_proof(proof: &MerkleProof) -> bool {
        let mut current = proof.transaction_hash;
        for element in &proof.proof_path {
            current = if element.is_right {
                Self::hash_pair(&current, &element.hash)
            } else {
                Self::hash_pair(&element.hash, &current)
            };
        }
        current == proof.merkle_root
    }

    /// Root of a list of transaction hashes without keeping the tree
    ///
    /// No leaves gives SHA-256 of the empty string and a single leaf is its
    /// own root.
    pub fn calculate_merkle_root(transaction_hashes: &[Hash256]) -> Hash256 {
        if transaction_hashes.is_empty() {
            return Self::empty_root();
        }
        let mut level = transaction_hashes.to_vec();
        while level.len() > 1 {
            Self::fold_level(&mut level);
        }
        level[0]
    }

    /// Verify that a list of transactions produces the expected Merkle root
    pub fn verify_transactions(transactions: &[Transaction], expected_root: &Hash256) -> bool {
        let hashes: Vec<Hash256> = transactions.iter().map(|tx| tx.get_hash()).collect();
        Self::calculate_merkle_root(&hashes) == *expected_root
    }

    /// Replaces `level` with its parent level, in place
    fn fold_level(level: &mut Vec<Hash256>) {
        if level.len() % 2 != 0 {
            let last = level[level.len() - 1];
            level.push(last);
        }
        let parents = level.len() / 2;
        for i in 0..parents {
            level[i] = Self::hash_pair(&level[2 * i], &level[2 * i + 1]);
        }
        level.truncate(parents);
    }

    fn hash_pair(left: &Hash256, right: &Hash256) -> Hash256 {
        let mut combined = [0u8; 64];
        combined[..32].copy_from_slice(left.as_bytes());
        combined[32..].copy_from_slice(right.as_bytes());
        Hash256::new(sha256_digest(&combined))
    }

    fn empty_root() -> Hash256 {
        Hash256::new(sha256_digest(&[]))
    }
}
