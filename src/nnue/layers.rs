//! L1 (sparse, int8), L2 (dense, f32) and L3 (output) propagation.

use super::buffer::FtOutputs;
use super::simd::{F32Vec, I32Vec, F32_LANES, I32_LANES, VECTOR_BYTES};
use super::{L1_CHUNK_PER_32, L1_GROUPS, L1_MUL, L1_SIZE, L2_SIZE, L3_SIZE, OUTPUT_SCALE};

/// Int8 L1 weights for one output bucket.
///
/// Group-major: for 32-bit input group `g`, output `j` and byte `k`, the
/// weight lives at `g * L1_CHUNK_PER_32 * L2_SIZE + j * L1_CHUNK_PER_32 + k`.
pub type L1Weights = [i8; L1_SIZE * L2_SIZE];

/// Position of the weight from FT output byte `input` to L1 output `out`.
#[inline]
#[must_use]
pub const fn l1_weight_index(input: usize, out: usize) -> usize {
    (input / L1_CHUNK_PER_32) * L1_WEIGHTS_PER_GROUP + out * L1_CHUNK_PER_32 + input % L1_CHUNK_PER_32
}

const L1_WEIGHTS_PER_GROUP: usize = L1_CHUNK_PER_32 * L2_SIZE;
const L1_SUM_VECS: usize = L2_SIZE / I32_LANES;
const L2_SUM_VECS: usize = L3_SIZE / F32_LANES;

/// Sparse L1: only the groups listed in `nnz` are read.
pub fn propagate_l1(
    inputs: &FtOutputs,
    nnz: &[u16],
    weights: &L1Weights,
    biases: &[f32; L2_SIZE],
    output: &mut [f32; L2_SIZE],
) {
    let sums = accumulate_l1(inputs, nnz.iter().map(|&idx| usize::from(idx)), weights);
    activate_l1(&sums, biases, output);
}

/// Dense L1 over every input group. Produces the same output as
/// [`propagate_l1`] given the full nonzero index list.
pub fn propagate_l1_dense(
    inputs: &FtOutputs,
    weights: &L1Weights,
    biases: &[f32; L2_SIZE],
    output: &mut [f32; L2_SIZE],
) {
    let sums = accumulate_l1(inputs, 0..L1_GROUPS, weights);
    activate_l1(&sums, biases, output);
}

#[inline]
fn accumulate_l1(
    inputs: &FtOutputs,
    groups: impl Iterator<Item = usize>,
    weights: &L1Weights,
) -> [I32Vec; L1_SUM_VECS] {
    let mut sums = [I32Vec::zero(); L1_SUM_VECS];

    for idx in groups {
        let input = inputs.group(idx);
        let start = idx * L1_WEIGHTS_PER_GROUP;
        let group_weights = &weights[start..start + L1_WEIGHTS_PER_GROUP];

        for (sum, w) in sums.iter_mut().zip(group_weights.chunks_exact(VECTOR_BYTES)) {
            *sum = sum.dpbusd(input, w);
        }
    }

    sums
}

#[inline]
fn activate_l1(sums: &[I32Vec; L1_SUM_VECS], biases: &[f32; L2_SIZE], output: &mut [f32; L2_SIZE]) {
    let zero = F32Vec::zero();
    let one = F32Vec::splat(1.0);
    let mul = F32Vec::splat(L1_MUL);

    for (i, &sum) in sums.iter().enumerate() {
        let bias = F32Vec::load(&biases[i * F32_LANES..]);
        let pre = sum.to_f32().mul_add(mul, bias);
        let clipped = pre.max(zero).min(one);
        clipped.mul(clipped).store(&mut output[i * F32_LANES..]);
    }
}

/// Dense L2: `output = clipped_square(biases + inputs · weights)`, with
/// `weights` row-major by input (`weights[i * L3_SIZE + j]`).
pub fn propagate_l2(
    inputs: &[f32; L2_SIZE],
    weights: &[f32; L2_SIZE * L3_SIZE],
    biases: &[f32; L3_SIZE],
    output: &mut [f32; L3_SIZE],
) {
    let mut sums: [F32Vec; L2_SUM_VECS] =
        std::array::from_fn(|j| F32Vec::load(&biases[j * F32_LANES..]));

    for (i, &input) in inputs.iter().enumerate() {
        let input = F32Vec::splat(input);
        let row = &weights[i * L3_SIZE..(i + 1) * L3_SIZE];

        for (sum, w) in sums.iter_mut().zip(row.chunks_exact(F32_LANES)) {
            *sum = input.mul_add(F32Vec::load(w), *sum);
        }
    }

    let zero = F32Vec::zero();
    let one = F32Vec::splat(1.0);
    for (j, &sum) in sums.iter().enumerate() {
        let clipped = sum.max(zero).min(one);
        clipped.mul(clipped).store(&mut output[j * F32_LANES..]);
    }
}

/// Output layer: `bias + inputs · weights`, before scaling.
pub fn propagate_l3(inputs: &[f32; L3_SIZE], weights: &[f32; L3_SIZE], bias: f32) -> f32 {
    let mut sum = F32Vec::zero();

    for (x, w) in inputs.chunks_exact(F32_LANES).zip(weights.chunks_exact(F32_LANES)) {
        sum = F32Vec::load(x).mul_add(F32Vec::load(w), sum);
    }

    bias + sum.reduce_add()
}

/// Scales the raw output to centipawns, truncating toward zero.
#[inline]
#[must_use]
pub fn scale_output(raw: f32) -> i32 {
    (raw * OUTPUT_SCALE as f32) as i32
}
