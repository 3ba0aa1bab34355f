//! Tests for the NNUE forward pass.
//!
//! Organized into modules by functionality:
//! - `eval`: hand-computed end-to-end scenarios
//! - `accumulator`: feature add/sub/refresh
//! - `permute`: neuron reordering
//! - `proptest`: randomized agreement with a scalar reference pipeline

mod accumulator;

use super::network::OutputLayers;
use super::simd::F32_LANES;
use super::{
    clipped_square, FT_QUANT, FT_SHIFT, L1_MUL, L1_PAIR_COUNT, L1_SIZE, L2_SIZE, L3_SIZE,
    OUTPUT_SCALE,
};
use rand::prelude::*;

/// Straight-line feature transform, one element at a time.
pub(super) fn reference_ft(us: &[i16; L1_SIZE], them: &[i16; L1_SIZE]) -> Vec<u8> {
    let mut out = vec![0u8; L1_SIZE];
    for (perspective, acc) in [us, them].into_iter().enumerate() {
        for i in 0..L1_PAIR_COUNT {
            let left = i32::from(acc[i]).clamp(0, FT_QUANT);
            let right = i32::from(acc[i + L1_PAIR_COUNT]).min(FT_QUANT);
            out[perspective * L1_PAIR_COUNT + i] = ((left * right) >> FT_SHIFT).clamp(0, 255) as u8;
        }
    }
    out
}

pub(super) fn reference_nnz(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(4)
        .enumerate()
        .filter(|(_, group)| group.iter().any(|&b| b != 0))
        .map(|(i, _)| i as u16)
        .collect()
}

/// Scalar forward pass with the same float operation order as the vector code.
pub(super) fn reference_eval(
    us: &[i16; L1_SIZE],
    them: &[i16; L1_SIZE],
    layers: &OutputLayers,
) -> i32 {
    let bytes = reference_ft(us, them);

    let mut l1 = [0.0f32; L2_SIZE];
    for (j, out) in l1.iter_mut().enumerate() {
        let sum: i32 = bytes
            .iter()
            .enumerate()
            .map(|(i, &b)| {
                i32::from(b) * i32::from(layers.l1_weights[(i / 4) * 4 * L2_SIZE + j * 4 + i % 4])
            })
            .sum();
        *out = clipped_square((sum as f32).mul_add(L1_MUL, layers.l1_biases[j]));
    }

    let mut l2 = layers.l2_biases;
    for (i, &x) in l1.iter().enumerate() {
        for (j, sum) in l2.iter_mut().enumerate() {
            *sum = x.mul_add(layers.l2_weights[i * L3_SIZE + j], *sum);
        }
    }
    let l2 = l2.map(clipped_square);

    let mut lanes = [0.0f32; F32_LANES];
    for (x, w) in l2
        .chunks_exact(F32_LANES)
        .zip(layers.l3_weights.chunks_exact(F32_LANES))
    {
        for l in 0..F32_LANES {
            lanes[l] = x[l].mul_add(w[l], lanes[l]);
        }
    }
    let mut width = F32_LANES;
    while width > 1 {
        width /= 2;
        for l in 0..width {
            lanes[l] += lanes[l + width];
        }
    }

    ((layers.l3_bias + lanes[0]) * OUTPUT_SCALE as f32) as i32
}

pub(super) fn random_layers(rng: &mut StdRng) -> OutputLayers {
    let mut layers = OutputLayers::zeroed();
    for w in layers.l1_weights.iter_mut() {
        *w = rng.gen();
    }
    for b in &mut layers.l1_biases {
        *b = rng.gen_range(-0.5..0.5);
    }
    for w in layers.l2_weights.iter_mut() {
        *w = rng.gen_range(-1.0..1.0);
    }
    for b in &mut layers.l2_biases {
        *b = rng.gen_range(-0.5..0.5);
    }
    for w in &mut layers.l3_weights {
        *w = rng.gen_range(-2.0..2.0);
    }
    layers.l3_bias = rng.gen_range(-1.0..1.0);
    layers
}

/// Accumulator with roughly `density` of its entries nonzero.
pub(super) fn random_accumulator(rng: &mut StdRng, density: f64) -> [i16; L1_SIZE] {
    std::array::from_fn(|_| {
        if rng.gen_bool(density) {
            rng.gen_range(-400..700)
        } else {
            0
        }
    })
}
