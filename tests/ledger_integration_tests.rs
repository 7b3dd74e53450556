//! Ledger integration tests
//!
//! Drive the data model through its public API: encode, decode, validate and
//! check signatures the way a node receiving bytes from a peer would.

use ledger_core::core::{Hash256, MerkleTree, TxInput, TxOutput, DEFAULT_SEQUENCE};
use ledger_core::crypto::signature::{self, CURVE_ORDER};
use ledger_core::error::{CryptoError, FormatError, LedgerError, ValidationError};
use ledger_core::{hash_pub_key, Block, PrivateKey, Transaction};

fn signed_spend(key: &PrivateKey, value: u64) -> Transaction {
    let owner = hash_pub_key(&key.public_key()).to_script();
    let input = TxInput::new(Hash256::digest(b"funding"), 0, DEFAULT_SEQUENCE);
    let mut tx = Transaction::new(vec![input], vec![TxOutput::new(value, owner)], 0, 546);
    tx.sign(key).unwrap();
    tx
}

fn sample_block() -> Block {
    let key = PrivateKey::generate();
    let miner = hash_pub_key(&key.public_key()).to_script();
    let mut block = Block::with_timestamp(Hash256::digest(b"parent"), 7, 1000, 1_700_000_000);
    block.add_transaction(Transaction::new_coinbase(&miner, 5000));
    block.add_transaction(signed_spend(&key, 1200));
    block
}

#[test]
fn test_block_survives_the_wire() {
    let block = sample_block();
    let bytes = block.serialize().unwrap();
    let decoded = Block::deserialize(&bytes).unwrap();

    assert_eq!(decoded, block);
    assert_eq!(decoded.calculate_hash(), block.calculate_hash());
    assert!(decoded.validate().is_ok());
    for tx in decoded.get_transactions() {
        assert!(tx.verify_signatures().is_ok());
    }
}

#[test]
fn test_truncated_block_is_a_format_error() {
    let bytes = sample_block().serialize().unwrap();
    for cut in [0, 50, 99, 103, bytes.len() - 1] {
        let err = Block::deserialize(&bytes[..cut]).unwrap_err();
        assert!(
            matches!(err, LedgerError::Format(_)),
            "cut at {cut} gave {err:?}"
        );
    }

    let mut padded = bytes.clone();
    padded.push(0);
    assert_eq!(
        Block::deserialize(&padded).unwrap_err(),
        LedgerError::Format(FormatError::TrailingBytes(1))
    );
}

#[test]
fn test_merkle_vectors() {
    let a = Hash256::digest(b"a");
    let b = Hash256::digest(b"b");
    let c = Hash256::digest(b"c");
    let pair = |l: &Hash256, r: &Hash256| {
        Hash256::digest(&[&l.as_bytes()[..], &r.as_bytes()[..]].concat())
    };

    assert_eq!(MerkleTree::calculate_merkle_root(&[]), Hash256::digest(b""));
    assert_eq!(MerkleTree::calculate_merkle_root(&[a]), a);
    assert_eq!(MerkleTree::calculate_merkle_root(&[a, b]), pair(&a, &b));
    assert_eq!(
        MerkleTree::calculate_merkle_root(&[a, b, c]),
        pair(&pair(&a, &b), &pair(&c, &c))
    );
    assert_ne!(
        MerkleTree::calculate_merkle_root(&[b, a]),
        MerkleTree::calculate_merkle_root(&[a, b])
    );
}

#[test]
fn test_merkle_proof_for_block_transaction() {
    let block = sample_block();
    let proof = block.generate_merkle_proof(1).unwrap();
    assert_eq!(proof.transaction_hash, block.get_transactions()[1].get_hash());
    assert!(block.verify_merkle_proof(&proof));

    let other = sample_block();
    assert!(!other.verify_merkle_proof(&proof));
}

#[test]
fn test_corrupted_merkle_root_is_rejected() {
    let mut block = sample_block();
    let actual = block.get_merkle_root();
    block.header_mut().merkle_root = Hash256::digest(b"forged");

    assert_eq!(
        block.validate(),
        Err(ValidationError::MerkleRootMismatch {
            expected: Hash256::digest(b"forged"),
            actual,
        })
    );
}

#[test]
fn test_zero_value_output_is_located() {
    let mut block = Block::with_timestamp(Hash256::zero(), 1, 1, 1);
    block.add_transaction(Transaction::new_coinbase(&[0x01; 20], 50));
    block.add_transaction(Transaction::new_coinbase(&[0x02; 20], 0));

    let err = block.validate().unwrap_err();
    match &err {
        ValidationError::Transaction { index, source } => {
            assert_eq!(*index, 1);
            assert!(matches!(
                source.as_ref(),
                ValidationError::Output { index: 0, .. }
            ));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(err.root_cause(), &ValidationError::ZeroOutputValue);
}

#[test]
fn test_high_s_signature_is_refused() {
    let key = PrivateKey::generate();
    let digest = Hash256::digest(b"message");
    let der = signature::sign(digest.as_bytes(), &key).unwrap();
    assert!(signature::verify(digest.as_bytes(), &der, &key.public_key()).is_ok());

    let (r, s) = signature::decode_der(&der).unwrap();
    let high = signature::encode_der(&r, &(&*CURVE_ORDER - &s)).unwrap();
    assert_eq!(
        signature::verify(digest.as_bytes(), &high, &key.public_key()),
        Err(CryptoError::NonCanonicalSignature)
    );
}

#[test]
fn test_tampered_transaction_bytes_are_caught() {
    let key = PrivateKey::generate();
    let tx = signed_spend(&key, 900);
    let mut bytes = tx.serialize().unwrap();
    // the output value sits after the input section; bump its lowest byte
    let value_pos = bytes.len() - 32 - 8 - 8 - 20 - 4 - 1;
    bytes[value_pos] ^= 0x01;

    let decoded = Transaction::deserialize(&bytes).unwrap();
    assert!(matches!(
        decoded.validate(),
        Err(ValidationError::HashMismatch { .. })
    ));
    assert!(matches!(
        decoded.verify_signatures(),
        Err(LedgerError::Crypto(CryptoError::Input { index: 0, .. }))
    ));
}
