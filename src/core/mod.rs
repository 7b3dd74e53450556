//! Ledger data model
//!
//! Blocks, transactions, their binary encoding and validation rules, and the
//! Merkle commitment that ties a header to its transactions.

pub mod block;
pub mod codec;
pub mod merkle;
pub mod monetary;
pub mod transaction;
pub mod types;

pub use block::{Block, Header, BLOCK_MIN_LEN, HEADER_LEN};
pub use merkle::{MerkleProof, MerkleTree, ProofElement};
pub use monetary::{DEFAULT_SEQUENCE, DUST_THRESHOLD, MIN_TRANSACTION_FEE};
pub use transaction::{Transaction, TxInput, TxOutput};
pub use types::{Hash256, HASH_LEN};
