//! NNUE (Efficiently Updatable Neural Network) inference.
//!
//! Provides the forward pass of a bucketed, quantized network:
//! - Pairwise feature transform with 8-bit saturating outputs
//! - Sparse L1 that skips zero 32-bit input groups via an NNZ lookup table
//! - Dense float L2 and L3 with clipped-square activation
//!
//! Architecture: (768 x 14 -> 2048) x 2 perspectives -> 16 -> 32 -> 1, x 8 output buckets

pub mod accumulator;
pub mod buffer;
pub mod error;
pub mod layers;
pub mod network;
pub mod nnz;
pub mod permute;
pub mod simd;
pub mod transform;

#[cfg(test)]
mod tests;

pub use accumulator::Accumulator;
pub use buffer::{FtOutputs, NnzIndices};
pub use error::NetworkError;
pub use network::{evaluate, network_size, output_bucket, FeatureTransformer, Network, OutputLayers};
pub use nnz::{initialize, NnzTable};
pub use permute::{ActivationStats, NeuronOrder};

/// Input features per bucket: 64 squares × 6 piece types × 2 colors
pub const INPUT_SIZE: usize = 768;

/// King-position buckets of the feature transformer
pub const INPUT_BUCKETS: usize = 14;

/// Feature transformer width (per perspective accumulator length)
pub const L1_SIZE: usize = 2048;

/// L1 output width
pub const L2_SIZE: usize = 16;

/// L2 output width
pub const L3_SIZE: usize = 32;

/// Material-count buckets selecting the L1..L3 weights
pub const OUTPUT_BUCKETS: usize = 8;

/// Feature transformer quantization factor
pub const FT_QUANT: i32 = 255;

/// Right shift applied to the pairwise feature transform product
pub const FT_SHIFT: u32 = 10;

/// L1 weight quantization factor
pub const L1_QUANT: i32 = 64;

/// Evaluation scale factor
pub const OUTPUT_SCALE: i32 = 400;

/// Number of accumulator pairs multiplied together per perspective
pub const L1_PAIR_COUNT: usize = L1_SIZE / 2;

/// Bytes of feature transform output packed into one 32-bit L1 input group
pub const L1_CHUNK_PER_32: usize = 4;

/// Number of 32-bit groups in the feature transform output
pub const L1_GROUPS: usize = L1_SIZE / L1_CHUNK_PER_32;

/// Dequantization multiplier for L1 integer sums
pub const L1_MUL: f32 = (1 << FT_SHIFT) as f32 / (FT_QUANT * FT_QUANT * L1_QUANT) as f32;

// Parameter counts of each serialized section, all buckets included

/// Feature transformer weights
pub const N_FTW: usize = INPUT_SIZE * L1_SIZE * INPUT_BUCKETS;
/// Feature transformer biases
pub const N_FTB: usize = L1_SIZE;

/// L1 weights
pub const N_L1W: usize = OUTPUT_BUCKETS * L1_SIZE * L2_SIZE;
/// L1 biases
pub const N_L1B: usize = OUTPUT_BUCKETS * L2_SIZE;

/// L2 weights
pub const N_L2W: usize = OUTPUT_BUCKETS * L2_SIZE * L3_SIZE;
/// L2 biases
pub const N_L2B: usize = OUTPUT_BUCKETS * L3_SIZE;

/// L3 weights
pub const N_L3W: usize = OUTPUT_BUCKETS * L3_SIZE;
/// L3 biases
pub const N_L3B: usize = OUTPUT_BUCKETS;

/// Clipped-square activation: `clamp(x, 0, 1)²`
#[inline]
#[must_use]
pub fn clipped_square(x: f32) -> f32 {
    let clipped = x.max(0.0).min(1.0);
    clipped * clipped
}
