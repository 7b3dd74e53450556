//! Canonical ECDSA over P-256
//!
//! Signatures travel as a strict DER `SEQUENCE { INTEGER r, INTEGER s }`.
//! Signing always emits the low-S form (`s <= N/2`) and verification refuses
//! anything else, so every (message, key) pair has exactly one accepted
//! encoding.

use crate::crypto::{PrivateKey, PublicKey};
use crate::error::CryptoError;
use num_bigint::BigUint;
use once_cell::sync::Lazy;
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::Signature;

/// Order of the P-256 base point
pub static CURVE_ORDER: Lazy<BigUint> = Lazy::new(|| {
    BigUint::from_bytes_be(&[
        0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0xbc, 0xe6, 0xfa, 0xad, 0xa7, 0x17, 0x9e, 0x84, 0xf3, 0xb9, 0xca, 0xc2, 0xfc, 0x63,
        0x25, 0x51,
    ])
});

/// N / 2, the largest canonical `s`
pub static HALF_ORDER: Lazy<BigUint> = Lazy::new(|| &*CURVE_ORDER >> 1u32);

/// Smallest possible encoding: two one-byte integers
pub const MIN_DER_LEN: usize = 8;
/// Two 33-byte integers (leading zero included) plus headers
pub const MAX_DER_LEN: usize = 72;

const SEQUENCE_TAG: u8 = 0x30;
const INTEGER_TAG: u8 = 0x02;
const SCALAR_LEN: usize = 32;

/// Sign a 32-byte digest and return the canonical DER signature
pub fn sign(digest: &[u8; 32], key: &PrivateKey) -> Result<Vec<u8>, CryptoError> {
    let signature: Signature = key
        .signing_key()
        .sign_prehash(digest)
        .map_err(|e| CryptoError::Signing(e.to_string()))?;
    let bytes = signature.to_bytes();
    let (r, s) = bytes.split_at(SCALAR_LEN);
    encode_signature(&BigUint::from_bytes_be(r), &BigUint::from_bytes_be(s))
}

/// Verify a DER signature over `digest`
///
/// Out-of-range and high-S signatures are rejected before any curve
/// arithmetic happens.
pub fn verify(digest: &[u8; 32], der: &[u8], public_key: &PublicKey) -> Result<(), CryptoError> {
    let (r, s) = decode_der(der)?;
    if !in_scalar_range(&r) || !in_scalar_range(&s) {
        return Err(CryptoError::SignatureOutOfRange);
    }
    if !is_low_s(&s) {
        return Err(CryptoError::NonCanonicalSignature);
    }

    let mut raw = [0u8; 2 * SCALAR_LEN];
    left_pad_into(&r, &mut raw[..SCALAR_LEN]);
    left_pad_into(&s, &mut raw[SCALAR_LEN..]);
    let signature = Signature::from_slice(&raw).map_err(|_| CryptoError::SignatureOutOfRange)?;

    public_key
        .verifying_key()?
        .verify_prehash(digest, &signature)
        .map_err(|_| CryptoError::VerificationFailed)
}

/// DER-encode `(r, s)` after folding `s` into the lower half of the order
pub fn encode_signature(r: &BigUint, s: &BigUint) -> Result<Vec<u8>, CryptoError> {
    encode_der(r, &canonicalize_s(s))
}

/// `N - s` when `N/2 < s < N`, otherwise `s` unchanged
pub fn canonicalize_s(s: &BigUint) -> BigUint {
    if is_low_s(s) || s >= &*CURVE_ORDER {
        s.clone()
    } else {
        &*CURVE_ORDER - s
    }
}

pub fn is_low_s(s: &BigUint) -> bool {
    s <= &*HALF_ORDER
}

fn in_scalar_range(v: &BigUint) -> bool {
    v.bits() > 0 && v < &*CURVE_ORDER
}

/// Encode `(r, s)` exactly as given. Callers that want a verifiable
/// signature go through [`encode_signature`].
///
/// Integers wider than a scalar are refused, which keeps every length
/// within one short-form DER byte.
pub fn encode_der(r: &BigUint, s: &BigUint) -> Result<Vec<u8>, CryptoError> {
    let r = der_integer(r, "r")?;
    let s = der_integer(s, "s")?;
    let mut out = Vec::with_capacity(2 + r.len() + s.len());
    out.push(SEQUENCE_TAG);
    out.push((r.len() + s.len()) as u8);
    out.extend_from_slice(&r);
    out.extend_from_slice(&s);
    Ok(out)
}

fn der_integer(v: &BigUint, name: &str) -> Result<Vec<u8>, CryptoError> {
    let bytes = v.to_bytes_be();
    if bytes.len() > SCALAR_LEN {
        return Err(malformed(format!(
            "{name}: {} bytes is wider than a scalar",
            bytes.len()
        )));
    }
    let mut out = Vec::with_capacity(bytes.len() + 3);
    out.push(INTEGER_TAG);
    // a set high bit would read as negative
    if bytes[0] & 0x80 != 0 {
        out.push((bytes.len() + 1) as u8);
        out.push(0x00);
    } else {
        out.push(bytes.len() as u8);
    }
    out.extend_from_slice(&bytes);
    Ok(out)
}

/// Strict DER decoding: short-form lengths only, minimal positive integers,
/// no trailing bytes
pub fn decode_der(der: &[u8]) -> Result<(BigUint, BigUint), CryptoError> {
    if der.len() < MIN_DER_LEN || der.len() > MAX_DER_LEN {
        return Err(malformed(format!("length {} out of bounds", der.len())));
    }
    if der[0] != SEQUENCE_TAG {
        return Err(malformed(format!("expected SEQUENCE, got tag {:#04x}", der[0])));
    }
    if der[1] as usize != der.len() - 2 {
        return Err(malformed(format!(
            "sequence declares {} bytes, {} present",
            der[1],
            der.len() - 2
        )));
    }

    let body = &der[2..];
    let (r, rest) = read_der_integer(body, "r")?;
    let (s, rest) = read_der_integer(rest, "s")?;
    if !rest.is_empty() {
        return Err(malformed(format!("{} trailing bytes", rest.len())));
    }
    Ok((r, s))
}

fn read_der_integer<'a>(
    bytes: &'a [u8],
    name: &str,
) -> Result<(BigUint, &'a [u8]), CryptoError> {
    if bytes.len() < 2 {
        return Err(malformed(format!("{name}: missing integer header")));
    }
    if bytes[0] != INTEGER_TAG {
        return Err(malformed(format!(
            "{name}: expected INTEGER, got tag {:#04x}",
            bytes[0]
        )));
    }
    let len = bytes[1] as usize;
    if len == 0 || len > SCALAR_LEN + 1 || len > bytes.len() - 2 {
        return Err(malformed(format!("{name}: bad integer length {len}")));
    }
    let value = &bytes[2..2 + len];
    if value[0] & 0x80 != 0 {
        return Err(malformed(format!("{name}: negative integer")));
    }
    if len > 1 && value[0] == 0x00 && value[1] & 0x80 == 0 {
        return Err(malformed(format!("{name}: non-minimal integer encoding")));
    }
    Ok((BigUint::from_bytes_be(value), &bytes[2 + len..]))
}

fn left_pad_into(v: &BigUint, out: &mut [u8]) {
    let bytes = v.to_bytes_be();
    let start = out.len() - bytes.len();
    out[start..].copy_from_slice(&bytes);
}

fn malformed(msg: String) -> CryptoError {
    CryptoError::MalformedSignature(msg)
}
