//! Feature transform: pairwise clipped product of the accumulator halves,
//! packed to bytes, with the nonzero 32-bit groups recorded for L1.

use super::buffer::{FtOutputs, NnzIndices};
use super::nnz::NnzTable;
use super::simd::{pack_u8, I16Vec, I16_LANES, U8_LANES};
use super::{FT_QUANT, FT_SHIFT, L1_CHUNK_PER_32, L1_PAIR_COUNT, L1_SIZE};

/// Pre-shift of the clipped left operand so that the high half of the 16x16
/// product equals `(left * right) >> FT_SHIFT`.
const FT_PRE_SHIFT: i32 = 16 - FT_SHIFT as i32;

/// 32-bit groups covered by one packed byte vector
const GROUPS_PER_VECTOR: usize = U8_LANES / L1_CHUNK_PER_32;

/// 8-bit table lookups needed per packed byte vector
const LOOKUPS_PER_VECTOR: usize = (GROUPS_PER_VECTOR + 7) / 8;

/// Index base increment per table lookup
const LOOKUP_STRIDE: u16 = if GROUPS_PER_VECTOR < 8 {
    GROUPS_PER_VECTOR as u16
} else {
    8
};

/// Activates both perspectives into `output` and rebuilds `nnz`.
///
/// The first `L1_PAIR_COUNT` bytes come from `us`, the rest from `them`.
/// For each perspective, element `i` of the lower half is clipped to
/// `[0, FT_QUANT]`, element `i` of the upper half only from above, and the
/// byte stored is `(lower * upper) >> FT_SHIFT` saturated to `[0, 255]`.
pub fn activate_ft(
    us: &[i16; L1_SIZE],
    them: &[i16; L1_SIZE],
    table: &NnzTable,
    output: &mut FtOutputs,
    nnz: &mut NnzIndices,
) {
    let zero = I16Vec::splat(0);
    let one = I16Vec::splat(FT_QUANT as i16);

    let bytes = output.bytes_mut();
    let mut base = 0u16;
    nnz.clear();

    for (perspective, acc) in [us, them].into_iter().enumerate() {
        let offset = perspective * L1_PAIR_COUNT;

        for i in (0..L1_PAIR_COUNT).step_by(I16_LANES * 2) {
            let input0a = I16Vec::load(&acc[i..]);
            let input0b = I16Vec::load(&acc[i + I16_LANES..]);

            let input1a = I16Vec::load(&acc[i + L1_PAIR_COUNT..]);
            let input1b = I16Vec::load(&acc[i + I16_LANES + L1_PAIR_COUNT..]);

            let clipped0a = input0a.max(zero).min(one);
            let clipped0b = input0b.max(zero).min(one);

            let clipped1a = input1a.min(one);
            let clipped1b = input1b.min(one);

            let producta = clipped0a.shl::<FT_PRE_SHIFT>().mulhi(clipped1a);
            let productb = clipped0b.shl::<FT_PRE_SHIFT>().mulhi(clipped1b);

            let packed = pack_u8(producta, productb);
            packed.store(&mut bytes[offset + i..]);

            let mask = packed.nnz_mask();
            for j in 0..LOOKUPS_PER_VECTOR {
                let lookup = ((mask >> (j * 8)) & 0xFF) as u8;
                nnz.extend_offset(base, table.get(lookup).as_slice());
                base += LOOKUP_STRIDE;
            }
        }
    }
}

/// Convenience wrapper returning fresh buffers.
#[must_use]
pub fn transform(
    us: &[i16; L1_SIZE],
    them: &[i16; L1_SIZE],
    table: &NnzTable,
) -> (FtOutputs, NnzIndices) {
    let mut output = FtOutputs::new();
    let mut nnz = NnzIndices::new();
    activate_ft(us, them, table, &mut output, &mut nnz);
    (output, nnz)
}
