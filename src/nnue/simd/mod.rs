//! Numeric vector layer for NNUE inference.
//!
//! Provides a small fixed set of lane-wise operations over four vector types:
//! - `I16Vec`: accumulator lanes (clip, saturating add/sub, shifted high multiply)
//! - `U8Vec`: packed feature transform outputs (store, nonzero group mask)
//! - `I32Vec`: L1 integer sums (dpbusd, convert to float)
//! - `F32Vec`: L1..L3 float math (fma, clip, square, horizontal sum)
//!
//! Supports:
//! - `x86_64`: `AVX2` + `FMA` (256-bit vectors), when enabled at compile time.
//!   `.cargo/config.toml` builds for the host CPU, so an AVX2 machine picks
//!   this backend without extra flags.
//! - Everything else: portable lane arrays of the same width
//!
//! Both backends produce bit-identical results for a given `VECTOR_BYTES`,
//! including the order of the horizontal float reduction. Test builds on
//! `x86_64` compile both and compare them when the CPU has `AVX2` + `FMA`.

#[cfg(all(
    target_arch = "x86_64",
    not(feature = "vec128"),
    any(test, all(target_feature = "avx2", target_feature = "fma"))
))]
mod avx2;

#[cfg(any(
    test,
    not(all(
        target_arch = "x86_64",
        target_feature = "avx2",
        target_feature = "fma",
        not(feature = "vec128")
    ))
))]
mod portable;

#[cfg(all(
    target_arch = "x86_64",
    target_feature = "avx2",
    target_feature = "fma",
    not(feature = "vec128")
))]
pub use avx2::{pack_u8, F32Vec, I16Vec, I32Vec, U8Vec};

#[cfg(not(all(
    target_arch = "x86_64",
    target_feature = "avx2",
    target_feature = "fma",
    not(feature = "vec128")
)))]
pub use portable::{pack_u8, F32Vec, I16Vec, I32Vec, U8Vec};

/// Name of the backend behind the vector types
#[cfg(all(
    target_arch = "x86_64",
    target_feature = "avx2",
    target_feature = "fma",
    not(feature = "vec128")
))]
pub const BACKEND: &str = "avx2";

/// Name of the backend behind the vector types
#[cfg(not(all(
    target_arch = "x86_64",
    target_feature = "avx2",
    target_feature = "fma",
    not(feature = "vec128")
)))]
pub const BACKEND: &str = "portable";

/// Width of one vector register in bytes
#[cfg(not(feature = "vec128"))]
pub const VECTOR_BYTES: usize = 32;

/// Width of one vector register in bytes
#[cfg(feature = "vec128")]
pub const VECTOR_BYTES: usize = 16;

/// Lanes in a `U8Vec`
pub const U8_LANES: usize = VECTOR_BYTES;
/// Lanes in an `I16Vec`
pub const I16_LANES: usize = VECTOR_BYTES / 2;
/// Lanes in an `I32Vec`
pub const I32_LANES: usize = VECTOR_BYTES / 4;
/// Lanes in an `F32Vec`
pub const F32_LANES: usize = VECTOR_BYTES / 4;

/// Saturating add of `weights` into `acc`, one vector at a time.
#[inline]
pub fn add_weights(acc: &mut [i16], weights: &[i16]) {
    debug_assert_eq!(acc.len(), weights.len());
    debug_assert_eq!(acc.len() % I16_LANES, 0);

    for (dst, src) in acc.chunks_exact_mut(I16_LANES).zip(weights.chunks_exact(I16_LANES)) {
        I16Vec::load(dst).add_sat(I16Vec::load(src)).store(dst);
    }
}

/// Saturating subtract of `weights` from `acc`, one vector at a time.
#[inline]
pub fn sub_weights(acc: &mut [i16], weights: &[i16]) {
    debug_assert_eq!(acc.len(), weights.len());
    debug_assert_eq!(acc.len() % I16_LANES, 0);

    for (dst, src) in acc.chunks_exact_mut(I16_LANES).zip(weights.chunks_exact(I16_LANES)) {
        I16Vec::load(dst).sub_sat(I16Vec::load(src)).store(dst);
    }
}
