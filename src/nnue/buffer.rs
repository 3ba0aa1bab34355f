//! Per-evaluation scratch buffers.

use super::{L1_CHUNK_PER_32, L1_GROUPS, L1_SIZE};

/// Feature transform output: `L1_SIZE` activations, readable bytewise or as
/// 32-bit groups of four consecutive bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
#[repr(C, align(64))]
pub struct FtOutputs {
    bytes: [u8; L1_SIZE],
}

impl FtOutputs {
    #[must_use]
    pub fn new() -> Self {
        Self { bytes: [0; L1_SIZE] }
    }

    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8; L1_SIZE] {
        &self.bytes
    }

    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8; L1_SIZE] {
        &mut self.bytes
    }

    /// Group `idx` as one packed word in native byte order.
    #[inline]
    #[must_use]
    pub fn group(&self, idx: usize) -> u32 {
        let start = idx * L1_CHUNK_PER_32;
        let mut word = [0u8; L1_CHUNK_PER_32];
        word.copy_from_slice(&self.bytes[start..start + L1_CHUNK_PER_32]);
        u32::from_ne_bytes(word)
    }

    pub fn groups(&self) -> impl Iterator<Item = u32> + '_ {
        (0..L1_GROUPS).map(move |idx| self.group(idx))
    }
}

impl Default for FtOutputs {
    fn default() -> Self {
        Self::new()
    }
}

/// Ascending indices of the nonzero groups in an [`FtOutputs`].
#[derive(Clone, Debug)]
pub struct NnzIndices {
    indices: [u16; L1_GROUPS],
    len: usize,
}

impl NnzIndices {
    #[must_use]
    pub fn new() -> Self {
        Self {
            indices: [0; L1_GROUPS],
            len: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, idx: u16) {
        debug_assert!(usize::from(idx) < L1_GROUPS);
        self.indices[self.len] = idx;
        self.len += 1;
    }

    /// Appends `base + offset` for each offset.
    #[inline]
    pub fn extend_offset(&mut self, base: u16, offsets: &[u16]) {
        let end = self.len + offsets.len();
        for (dst, &offset) in self.indices[self.len..end].iter_mut().zip(offsets) {
            *dst = base + offset;
        }
        self.len = end;
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u16] {
        &self.indices[..self.len]
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl Default for NnzIndices {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for NnzIndices {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for NnzIndices {}
