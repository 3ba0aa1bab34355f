//! Nonzero-index lookup table for the sparse L1 layer.
//!
//! Entry `m` lists the positions of the bits set in the 8-bit mask `m`,
//! in ascending order. The feature transform turns each 8-group slice of
//! its nonzero mask into L1 input indices with one table lookup.

use once_cell::sync::Lazy;

/// Bit positions set in one 8-bit mask, padded with zeros.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NnzEntry {
    /// Set bit positions, ascending
    pub offsets: [u16; 8],
    /// Number of valid entries in `offsets`
    pub len: u8,
}

impl NnzEntry {
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u16] {
        &self.offsets[..usize::from(self.len)]
    }
}

/// One [`NnzEntry`] for every possible 8-bit mask.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NnzTable {
    entries: [NnzEntry; 256],
}

impl NnzTable {
    /// Builds all 256 entries.
    #[must_use]
    pub fn new() -> Self {
        let mut entries = [NnzEntry::default(); 256];

        for (mask, entry) in entries.iter_mut().enumerate() {
            let mut bits = mask as u32;
            while bits != 0 {
                entry.offsets[usize::from(entry.len)] = bits.trailing_zeros() as u16;
                entry.len += 1;
                bits &= bits - 1;
            }
        }

        log::trace!("built nnz lookup table");
        Self { entries }
    }

    /// Entry for `mask`.
    #[inline]
    #[must_use]
    pub fn get(&self, mask: u8) -> &NnzEntry {
        &self.entries[usize::from(mask)]
    }
}

impl Default for NnzTable {
    fn default() -> Self {
        Self::new()
    }
}

static NNZ_TABLE: Lazy<NnzTable> = Lazy::new(NnzTable::new);

/// Shared table, built on first use.
#[inline]
#[must_use]
pub fn global() -> &'static NnzTable {
    &NNZ_TABLE
}

/// Builds the shared table if it does not exist yet and returns it.
///
/// Calling this before spawning evaluation threads keeps the one-time
/// construction off the search path. Repeated calls return the same table.
pub fn initialize() -> &'static NnzTable {
    Lazy::force(&NNZ_TABLE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_mask_lists_its_bits() {
        let table = NnzTable::new();

        for mask in 0..=255u8 {
            let entry = table.get(mask);
            let expected: Vec<u16> = (0..8).filter(|&b| mask & (1 << b) != 0).collect();

            assert_eq!(entry.as_slice(), expected.as_slice(), "mask {mask:#010b}");
            assert_eq!(u32::from(entry.len), mask.count_ones());
        }
    }

    #[test]
    fn test_padding_is_zero() {
        let table = NnzTable::new();
        let entry = table.get(0b1000_0001);

        assert_eq!(entry.offsets, [0, 7, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let first = initialize().clone();
        let again = initialize();

        assert_eq!(&first, again);
        assert!(std::ptr::eq(again, global()));
        assert_eq!(&first, &NnzTable::new());
    }
}
