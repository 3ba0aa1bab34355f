//! `AVX2` + `FMA` backend (256-bit vectors).
//!
//! Selected only when both target features are enabled for the whole build.
//! Test builds also compile it without them and call it after
//! `is_x86_feature_detected!`, so every intrinsic below runs on a CPU that
//! supports it.

#![allow(unused_unsafe)]
#![cfg_attr(test, allow(dead_code))]

use std::arch::x86_64::*;

use super::{F32_LANES, I16_LANES, I32_LANES, U8_LANES};

#[derive(Clone, Copy)]
pub struct I16Vec(__m256i);

#[derive(Clone, Copy)]
pub struct U8Vec(__m256i);

#[derive(Clone, Copy)]
pub struct I32Vec(__m256i);

#[derive(Clone, Copy)]
pub struct F32Vec(__m256);

impl I16Vec {
    #[inline]
    pub fn load(src: &[i16]) -> Self {
        let src = &src[..I16_LANES];
        // SAFETY: `src` spans exactly one vector.
        Self(unsafe { _mm256_loadu_si256(src.as_ptr().cast()) })
    }

    #[inline]
    pub fn store(self, dst: &mut [i16]) {
        let dst = &mut dst[..I16_LANES];
        // SAFETY: `dst` spans exactly one vector.
        unsafe { _mm256_storeu_si256(dst.as_mut_ptr().cast(), self.0) }
    }

    #[inline]
    pub fn splat(value: i16) -> Self {
        // SAFETY: broadcast into a register, AVX2 is present.
        Self(unsafe { _mm256_set1_epi16(value) })
    }

    #[inline]
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        // SAFETY: register-only AVX2 op.
        Self(unsafe { _mm256_max_epi16(self.0, other.0) })
    }

    #[inline]
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        // SAFETY: register-only AVX2 op.
        Self(unsafe { _mm256_min_epi16(self.0, other.0) })
    }

    #[inline]
    #[must_use]
    pub fn add_sat(self, other: Self) -> Self {
        // SAFETY: register-only AVX2 op.
        Self(unsafe { _mm256_adds_epi16(self.0, other.0) })
    }

    #[inline]
    #[must_use]
    pub fn sub_sat(self, other: Self) -> Self {
        // SAFETY: register-only AVX2 op.
        Self(unsafe { _mm256_subs_epi16(self.0, other.0) })
    }

    #[inline]
    #[must_use]
    pub fn shl<const SHIFT: i32>(self) -> Self {
        // SAFETY: register-only AVX2 op.
        Self(unsafe { _mm256_slli_epi16::<SHIFT>(self.0) })
    }

    #[inline]
    #[must_use]
    pub fn mulhi(self, other: Self) -> Self {
        // SAFETY: register-only AVX2 op.
        Self(unsafe { _mm256_mulhi_epi16(self.0, other.0) })
    }
}

/// `packus` works per 128-bit half, so the 64-bit quarters come out as
/// `lo0 hi0 lo1 hi1`; the permute puts them back in `lo0 lo1 hi0 hi1` order.
#[inline]
pub fn pack_u8(lo: I16Vec, hi: I16Vec) -> U8Vec {
    // SAFETY: register-only AVX2 ops, no memory is touched.
    unsafe {
        let packed = _mm256_packus_epi16(lo.0, hi.0);
        U8Vec(_mm256_permute4x64_epi64::<0b11_01_10_00>(packed))
    }
}

impl U8Vec {
    #[inline]
    pub fn load(src: &[u8]) -> Self {
        let src = &src[..U8_LANES];
        // SAFETY: `src` spans exactly one vector.
        Self(unsafe { _mm256_loadu_si256(src.as_ptr().cast()) })
    }

    #[inline]
    pub fn store(self, dst: &mut [u8]) {
        let dst = &mut dst[..U8_LANES];
        // SAFETY: `dst` spans exactly one vector.
        unsafe { _mm256_storeu_si256(dst.as_mut_ptr().cast(), self.0) }
    }

    #[inline]
    pub fn nnz_mask(self) -> u32 {
        // SAFETY: register-only AVX2 ops, no memory is touched.
        unsafe {
            let zero = _mm256_cmpeq_epi32(self.0, _mm256_setzero_si256());
            !(_mm256_movemask_ps(_mm256_castsi256_ps(zero)) as u32) & 0xFF
        }
    }
}

impl I32Vec {
    #[inline]
    pub fn zero() -> Self {
        // SAFETY: register-only AVX2 op.
        Self(unsafe { _mm256_setzero_si256() })
    }

    #[inline]
    pub fn store(self, dst: &mut [i32]) {
        let dst = &mut dst[..I32_LANES];
        // SAFETY: `dst` spans exactly one vector.
        unsafe { _mm256_storeu_si256(dst.as_mut_ptr().cast(), self.0) }
    }

    #[inline]
    #[must_use]
    pub fn dpbusd(self, input: u32, weights: &[i8]) -> Self {
        let weights = &weights[..I32_LANES * 4];
        // SAFETY: `weights` spans exactly one vector; the rest is register-only.
        unsafe {
            let input = _mm256_set1_epi32(input as i32);
            let weights = _mm256_loadu_si256(weights.as_ptr().cast());
            let product16 = _mm256_maddubs_epi16(input, weights);
            let product32 = _mm256_madd_epi16(product16, _mm256_set1_epi16(1));
            Self(_mm256_add_epi32(self.0, product32))
        }
    }

    #[inline]
    pub fn to_f32(self) -> F32Vec {
        // SAFETY: register-only AVX2 op.
        F32Vec(unsafe { _mm256_cvtepi32_ps(self.0) })
    }
}

impl F32Vec {
    #[inline]
    pub fn zero() -> Self {
        // SAFETY: register-only AVX2 op.
        Self(unsafe { _mm256_setzero_ps() })
    }

    #[inline]
    pub fn splat(value: f32) -> Self {
        // SAFETY: broadcast into a register, AVX2 is present.
        Self(unsafe { _mm256_set1_ps(value) })
    }

    #[inline]
    pub fn load(src: &[f32]) -> Self {
        let src = &src[..F32_LANES];
        // SAFETY: `src` spans exactly one vector.
        Self(unsafe { _mm256_loadu_ps(src.as_ptr()) })
    }

    #[inline]
    pub fn store(self, dst: &mut [f32]) {
        let dst = &mut dst[..F32_LANES];
        // SAFETY: `dst` spans exactly one vector.
        unsafe { _mm256_storeu_ps(dst.as_mut_ptr(), self.0) }
    }

    #[inline]
    #[must_use]
    pub fn mul_add(self, b: Self, c: Self) -> Self {
        // SAFETY: FMA is present whenever this backend runs.
        Self(unsafe { _mm256_fmadd_ps(self.0, b.0, c.0) })
    }

    #[inline]
    #[must_use]
    pub fn mul(self, other: Self) -> Self {
        // SAFETY: register-only AVX2 op.
        Self(unsafe { _mm256_mul_ps(self.0, other.0) })
    }

    #[inline]
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        // SAFETY: register-only AVX2 op.
        Self(unsafe { _mm256_max_ps(self.0, other.0) })
    }

    #[inline]
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        // SAFETY: register-only AVX2 op.
        Self(unsafe { _mm256_min_ps(self.0, other.0) })
    }

    #[inline]
    pub fn reduce_add(self) -> f32 {
        // SAFETY: register-only AVX2 ops, no memory is touched.
        unsafe {
            let upper = _mm256_extractf128_ps::<1>(self.0);
            let lower = _mm256_castps256_ps128(self.0);
            let quad = _mm_add_ps(lower, upper);
            let pair = _mm_add_ps(quad, _mm_movehl_ps(quad, quad));
            let single = _mm_add_ss(pair, _mm_shuffle_ps::<0b01>(pair, pair));
            _mm_cvtss_f32(single)
        }
    }
}
