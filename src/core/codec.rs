//! Big-endian binary codec primitives
//!
//! Fixed-width integers are written big-endian. Variable-length fields carry a
//! `u32` length prefix. The [`Reader`] never reads past the end of its buffer:
//! every fixed read checks the remaining length and every declared length or
//! element count is checked against what is left before anything is allocated.

use crate::core::{Hash256, HASH_LEN};
use crate::error::FormatError;

/// Appends big-endian fields to a byte buffer
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Writer {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_hash(&mut self, hash: &Hash256) {
        self.buf.extend_from_slice(hash.as_bytes());
    }

    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Length as a `u32` prefix; refuses to silently truncate the length
    pub fn put_len(&mut self, field: &'static str, len: usize) -> Result<(), FormatError> {
        let len = u32::try_from(len).map_err(|_| FormatError::TooLong { field, len })?;
        self.put_u32(len);
        Ok(())
    }

    pub fn put_var_bytes(&mut self, field: &'static str, bytes: &[u8]) -> Result<(), FormatError> {
        self.put_len(field, bytes.len())?;
        self.put_raw(bytes);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Bounds-checked cursor over an input buffer
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, field: &'static str, n: usize) -> Result<&'a [u8], FormatError> {
        if n > self.remaining() {
            return Err(FormatError::Truncated {
                field,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u32(&mut self, field: &'static str) -> Result<u32, FormatError> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.take(field, 4)?);
        Ok(u32::from_be_bytes(bytes))
    }

    pub fn read_u64(&mut self, field: &'static str) -> Result<u64, FormatError> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(field, 8)?);
        Ok(u64::from_be_bytes(bytes))
    }

    pub fn read_hash(&mut self, field: &'static str) -> Result<Hash256, FormatError> {
        let mut bytes = [0u8; HASH_LEN];
        bytes.copy_from_slice(self.take(field, HASH_LEN)?);
        Ok(Hash256::new(bytes))
    }

    /// Reads a `u32` length prefix and checks it against the remaining buffer
    pub fn read_len(&mut self, field: &'static str) -> Result<usize, FormatError> {
        let declared = self.read_u32(field)?;
        let len = declared as usize;
        if len > self.remaining() {
            return Err(FormatError::LengthOverrun {
                field,
                declared: declared as u64,
                remaining: self.remaining(),
            });
        }
        Ok(len)
    }

    /// Reads a `u32` element count where each element needs at least
    /// `min_item_len` bytes, so an absurd count fails before allocation
    pub fn read_count(
        &mut self,
        field: &'static str,
        min_item_len: usize,
    ) -> Result<usize, FormatError> {
        let declared = self.read_u32(field)?;
        let needed = (declared as u64).saturating_mul(min_item_len as u64);
        if needed > self.remaining() as u64 {
            return Err(FormatError::LengthOverrun {
                field,
                declared: declared as u64,
                remaining: self.remaining(),
            });
        }
        Ok(declared as usize)
    }

    pub fn read_var_bytes(&mut self, field: &'static str) -> Result<Vec<u8>, FormatError> {
        let len = self.read_len(field)?;
        Ok(self.take(field, len)?.to_vec())
    }

    /// Length-prefixed sub-message, returned as its own reader
    pub fn read_sub_message(&mut self, field: &'static str) -> Result<Reader<'a>, FormatError> {
        let len = self.read_len(field)?;
        Ok(Reader::new(self.take(field, len)?))
    }

    /// Fails if any bytes were left unread
    pub fn finish(self) -> Result<(), FormatError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(FormatError::TrailingBytes(n)),
        }
    }
}
