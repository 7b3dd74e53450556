//! Error handling for the ledger core
//!
//! Every failure is an explicit value. Errors coming from wire bytes, addresses,
//! signatures or passphrases are always recoverable; nothing in here panics.

use std::fmt;

use crate::core::Hash256;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Top-level error returned by the public API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Truncated or malformed binary data
    Format(FormatError),
    /// Semantic rule violation in a block or transaction
    Validation(ValidationError),
    /// Signature, key or encryption failure
    Crypto(CryptoError),
    /// Balance or fee problems while building a transaction
    Funds(FundsError),
    /// Malformed address text
    Address(AddressError),
    /// The wallet has no account for this address
    AccountNotFound(String),
    /// The recipient of a transfer could not be decoded
    InvalidRecipientAddress(AddressError),
    /// The storage collaborator has nothing under this path
    NotFound(String),
    /// Storage backend errors
    Storage(String),
    /// JSON encoding/decoding errors
    Serialization(String),
    /// File I/O errors
    Io(String),
    /// Configuration errors
    Config(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Format(e) => write!(f, "Format error: {e}"),
            LedgerError::Validation(e) => write!(f, "Validation error: {e}"),
            LedgerError::Crypto(e) => write!(f, "Cryptographic error: {e}"),
            LedgerError::Funds(e) => write!(f, "Funds error: {e}"),
            LedgerError::Address(e) => write!(f, "Address error: {e}"),
            LedgerError::AccountNotFound(addr) => write!(f, "Account not found: {addr}"),
            LedgerError::InvalidRecipientAddress(e) => {
                write!(f, "Invalid recipient address: {e}")
            }
            LedgerError::NotFound(path) => write!(f, "Not found: {path}"),
            LedgerError::Storage(msg) => write!(f, "Storage error: {msg}"),
            LedgerError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            LedgerError::Io(msg) => write!(f, "I/O error: {msg}"),
            LedgerError::Config(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LedgerError::Format(e) => Some(e),
            LedgerError::Validation(e) => Some(e),
            LedgerError::Crypto(e) => Some(e),
            LedgerError::Funds(e) => Some(e),
            LedgerError::Address(e) | LedgerError::InvalidRecipientAddress(e) => Some(e),
            _ => None,
        }
    }
}

/// Binary decoding failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Fewer bytes remain than a fixed-size field needs
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },
    /// A length prefix points past the end of the buffer
    LengthOverrun {
        field: &'static str,
        declared: u64,
        remaining: usize,
    },
    /// Bytes left over after a complete message was decoded
    TrailingBytes(usize),
    /// A field too long for its `u32` length prefix
    TooLong { field: &'static str, len: usize },
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::Truncated {
                field,
                needed,
                remaining,
            } => write!(
                f,
                "truncated {field}: need {needed} bytes, {remaining} remaining"
            ),
            FormatError::LengthOverrun {
                field,
                declared,
                remaining,
            } => write!(
                f,
                "{field} declares {declared} but only {remaining} bytes remain"
            ),
            FormatError::TrailingBytes(n) => write!(f, "{n} trailing bytes after message"),
            FormatError::TooLong { field, len } => {
                write!(f, "{field} of {len} bytes does not fit a u32 length prefix")
            }
        }
    }
}

/// Structural rule violations, nested by sub-entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    HeaderVersion(u32),
    HeaderTimestamp,
    HeaderDifficulty,
    MerkleRootMismatch { expected: Hash256, actual: Hash256 },
    TransactionVersion(u32),
    HashMismatch { stored: Hash256, computed: Hash256 },
    /// No outputs; `coinbase` tells which structural rule applied
    MissingOutputs { coinbase: bool },
    ZeroOutputValue,
    EmptyScriptPubKey,
    Header(Box<ValidationError>),
    Transaction {
        index: usize,
        source: Box<ValidationError>,
    },
    Input {
        index: usize,
        source: Box<ValidationError>,
    },
    Output {
        index: usize,
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    /// Innermost rule that failed, skipping the sub-entity wrappers
    pub fn root_cause(&self) -> &ValidationError {
        match self {
            ValidationError::Header(source)
            | ValidationError::Transaction { source, .. }
            | ValidationError::Input { source, .. }
            | ValidationError::Output { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::HeaderVersion(v) => write!(f, "invalid header version: {v}"),
            ValidationError::HeaderTimestamp => write!(f, "header timestamp is zero"),
            ValidationError::HeaderDifficulty => write!(f, "header difficulty must be positive"),
            ValidationError::MerkleRootMismatch { expected, actual } => write!(
                f,
                "merkle root mismatch: header has {expected}, transactions give {actual}"
            ),
            ValidationError::TransactionVersion(v) => {
                write!(f, "invalid transaction version: {v}")
            }
            ValidationError::HashMismatch { stored, computed } => {
                write!(f, "transaction hash {stored} does not match contents {computed}")
            }
            ValidationError::MissingOutputs { coinbase: true } => {
                write!(f, "coinbase transaction must have at least one output")
            }
            ValidationError::MissingOutputs { coinbase: false } => {
                write!(f, "transaction must have at least one output")
            }
            ValidationError::ZeroOutputValue => write!(f, "output value cannot be zero"),
            ValidationError::EmptyScriptPubKey => write!(f, "script public key cannot be empty"),
            ValidationError::Header(source) => write!(f, "invalid header: {source}"),
            ValidationError::Transaction { index, source } => {
                write!(f, "invalid transaction {index}: {source}")
            }
            ValidationError::Input { index, source } => write!(f, "invalid input {index}: {source}"),
            ValidationError::Output { index, source } => {
                write!(f, "invalid output {index}: {source}")
            }
        }
    }
}

/// Key, signature and encryption failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    InvalidPrivateKey(String),
    InvalidPublicKey(String),
    MalformedSignature(String),
    SignatureOutOfRange,
    NonCanonicalSignature,
    VerificationFailed,
    /// A scriptSig too short to carry a public key and a signature
    ScriptSigTooShort { input: usize, len: usize },
    /// The signing key does not own the output being spent
    ScriptMismatch { input: usize },
    /// Signature problem attributed to one transaction input
    Input { index: usize, source: Box<CryptoError> },
    Signing(String),
    KeyDerivation(String),
    Encryption(String),
    /// Wrong passphrase or tampered ciphertext
    Authentication,
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::InvalidPrivateKey(msg) => write!(f, "invalid private key: {msg}"),
            CryptoError::InvalidPublicKey(msg) => write!(f, "invalid public key: {msg}"),
            CryptoError::MalformedSignature(msg) => write!(f, "malformed signature: {msg}"),
            CryptoError::SignatureOutOfRange => write!(f, "signature r or s out of range"),
            CryptoError::NonCanonicalSignature => write!(f, "non-canonical signature (high S)"),
            CryptoError::VerificationFailed => write!(f, "signature verification failed"),
            CryptoError::ScriptSigTooShort { input, len } => {
                write!(f, "input {input}: script signature too short ({len} bytes)")
            }
            CryptoError::ScriptMismatch { input } => {
                write!(f, "input {input}: public key does not match the spent output")
            }
            CryptoError::Input { index, source } => write!(f, "input {index}: {source}"),
            CryptoError::Signing(msg) => write!(f, "signing failed: {msg}"),
            CryptoError::KeyDerivation(msg) => write!(f, "key derivation failed: {msg}"),
            CryptoError::Encryption(msg) => write!(f, "encryption failed: {msg}"),
            CryptoError::Authentication => {
                write!(f, "decryption failed: wrong passphrase or corrupted data")
            }
        }
    }
}

/// Balance and fee failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FundsError {
    ZeroAmount,
    FeeTooLow { fee: u64, minimum: u64 },
    NoUtxos(String),
    InsufficientFunds { required: u64, available: u64 },
    Overflow,
}

impl fmt::Display for FundsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FundsError::ZeroAmount => write!(f, "amount must be positive"),
            FundsError::FeeTooLow { fee, minimum } => {
                write!(f, "fee {fee} is below the minimum of {minimum}")
            }
            FundsError::NoUtxos(addr) => write!(f, "no available UTXOs for address: {addr}"),
            FundsError::InsufficientFunds {
                required,
                available,
            } => write!(
                f,
                "insufficient funds: required {required}, available {available}"
            ),
            FundsError::Overflow => write!(f, "amount overflow"),
        }
    }
}

/// Address decoding failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    InvalidBase58(String),
    InvalidLength(usize),
    UnsupportedVersion(u8),
    ChecksumMismatch,
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::InvalidBase58(msg) => write!(f, "invalid base58 encoding: {msg}"),
            AddressError::InvalidLength(len) => write!(f, "invalid address length: {len}"),
            AddressError::UnsupportedVersion(v) => write!(f, "unsupported address version: {v}"),
            AddressError::ChecksumMismatch => write!(f, "invalid checksum"),
        }
    }
}

impl std::error::Error for FormatError {}
impl std::error::Error for ValidationError {}
impl std::error::Error for CryptoError {}
impl std::error::Error for FundsError {}
impl std::error::Error for AddressError {}

impl From<FormatError> for LedgerError {
    fn from(err: FormatError) -> Self {
        LedgerError::Format(err)
    }
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::Validation(err)
    }
}

impl From<CryptoError> for LedgerError {
    fn from(err: CryptoError) -> Self {
        LedgerError::Crypto(err)
    }
}

impl From<FundsError> for LedgerError {
    fn from(err: FundsError) -> Self {
        LedgerError::Funds(err)
    }
}

impl From<AddressError> for LedgerError {
    fn from(err: AddressError) -> Self {
        LedgerError::Address(err)
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Io(err.to_string())
    }
}

impl From<sled::Error> for LedgerError {
    fn from(err: sled::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_nesting() {
        let err = ValidationError::Transaction {
            index: 2,
            source: Box::new(ValidationError::Output {
                index: 0,
                source: Box::new(ValidationError::ZeroOutputValue),
            }),
        };
        assert_eq!(err.root_cause(), &ValidationError::ZeroOutputValue);
        assert_eq!(
            err.to_string(),
            "invalid transaction 2: invalid output 0: output value cannot be zero"
        );
    }

    #[test]
    fn test_sub_errors_box_as_std_errors() {
        let boxed: Box<dyn std::error::Error> = ValidationError::HeaderTimestamp.into();
        assert_eq!(boxed.to_string(), ValidationError::HeaderTimestamp.to_string());

        let err = LedgerError::from(CryptoError::NonCanonicalSignature);
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "non-canonical signature (high S)");
        assert!(std::error::Error::source(&LedgerError::Config("x".into())).is_none());
    }

    #[test]
    fn test_display_includes_category() {
        let err = LedgerError::from(FundsError::InsufficientFunds {
            required: 10,
            available: 4,
        });
        assert_eq!(
            err.to_string(),
            "Funds error: insufficient funds: required 10, available 4"
        );
    }
}
