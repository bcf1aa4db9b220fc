//! Bounds-checked reading over calldata regions.
//!
//! The wire format addresses data through 32-byte head slots whose values
//! are either inline scalars or byte offsets into a tail, with offsets
//! relative to the region that declared them. A [`Cursor`] scopes every
//! read to one region; re-basing into a tail yields a new cursor borrowed
//! from the parent slice, so no combination of attacker-supplied offsets
//! can reach outside the original buffer. All arithmetic is checked.

use alloy_primitives::{Address, Selector, U256};

use crate::errors::DecodeError;

/// Width of one head slot.
pub const WORD: usize = 32;

/// A read-only view over one contiguous region of a payload.
#[derive(Clone, Copy)]
pub struct Cursor<'a> {
    data: &'a [u8],
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub(crate) fn oob(&self, offset: usize, needed: usize) -> DecodeError {
        DecodeError::OutOfBounds {
            offset,
            needed,
            region_len: self.data.len(),
        }
    }

    /// Raw bytes `[offset, offset + len)`. Every other read goes through
    /// here, so the containment check lives in exactly one place.
    pub fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = offset.checked_add(len).ok_or_else(|| self.oob(offset, len))?;
        if end > self.data.len() {
            return Err(self.oob(offset, len));
        }
        Ok(&self.data[offset..end])
    }

    /// The 32-byte head slot starting at byte `offset`.
    pub fn word(&self, offset: usize) -> Result<[u8; WORD], DecodeError> {
        let bytes = self.bytes(offset, WORD)?;
        let mut word = [0u8; WORD];
        word.copy_from_slice(bytes);
        Ok(word)
    }

    /// Head word interpreted as an in-region offset or length.
    ///
    /// Words with any nonzero byte above the low eight are rejected rather
    /// than truncated, so an oversized value cannot masquerade as a small
    /// offset. The rejected value is reported saturated.
    pub fn usize_word(&self, offset: usize) -> Result<usize, DecodeError> {
        let word = self.word(offset)?;
        if word[..WORD - 8].iter().any(|&b| b != 0) {
            return Err(self.oob(usize::MAX, WORD));
        }
        let mut tail = [0u8; 8];
        tail.copy_from_slice(&word[WORD - 8..]);
        usize::try_from(u64::from_be_bytes(tail)).map_err(|_| self.oob(usize::MAX, WORD))
    }

    /// Head word interpreted as a 256-bit unsigned integer.
    pub fn u256_word(&self, offset: usize) -> Result<U256, DecodeError> {
        Ok(U256::from_be_slice(&self.word(offset)?))
    }

    /// Head word interpreted as an address (20 bytes, right-aligned).
    pub fn address_word(&self, offset: usize) -> Result<Address, DecodeError> {
        let word = self.word(offset)?;
        Ok(Address::from_slice(&word[WORD - 20..]))
    }

    /// Head word interpreted as a `bytes4` selector (left-aligned).
    pub fn selector_word(&self, offset: usize) -> Result<Selector, DecodeError> {
        let word = self.word(offset)?;
        Ok(Selector::from_slice(&word[..4]))
    }

    /// Re-bases at `offset`, yielding a cursor over the rest of this
    /// region. Offsets declared inside the tail are relative to the new
    /// base, as the encoding requires.
    pub fn subregion(&self, offset: usize) -> Result<Cursor<'a>, DecodeError> {
        if offset > self.data.len() {
            return Err(self.oob(offset, 0));
        }
        Ok(Cursor {
            data: &self.data[offset..],
        })
    }

    /// Resolves a length-prefixed byte segment whose length word sits at
    /// `offset`. The declared length must fit in the remainder of the
    /// region; trailing padding is not required.
    pub fn tail_bytes(&self, offset: usize) -> Result<&'a [u8], DecodeError> {
        let len = self.usize_word(offset)?;
        let start = offset.checked_add(WORD).ok_or_else(|| self.oob(offset, WORD))?;
        self.bytes(start, len)
    }
}
