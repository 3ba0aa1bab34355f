//! Portable lane-array backend.
//!
//! Each operation mirrors the semantics of the matching x86 instruction
//! (`packus`, `mulhi`, `maddubs` + `madd`, `fmadd`) lane for lane.

#![cfg_attr(test, allow(dead_code))]

use super::{F32_LANES, I16_LANES, I32_LANES, U8_LANES};

use std::array::from_fn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct I16Vec([i16; I16_LANES]);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct U8Vec([u8; U8_LANES]);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct I32Vec([i32; I32_LANES]);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct F32Vec([f32; F32_LANES]);

impl I16Vec {
    #[inline]
    pub fn load(src: &[i16]) -> Self {
        let mut lanes = [0; I16_LANES];
        lanes.copy_from_slice(&src[..I16_LANES]);
        Self(lanes)
    }

    #[inline]
    pub fn store(self, dst: &mut [i16]) {
        dst[..I16_LANES].copy_from_slice(&self.0);
    }

    #[inline]
    pub fn splat(value: i16) -> Self {
        Self([value; I16_LANES])
    }

    #[inline]
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self(from_fn(|i| self.0[i].max(other.0[i])))
    }

    #[inline]
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        Self(from_fn(|i| self.0[i].min(other.0[i])))
    }

    #[inline]
    #[must_use]
    pub fn add_sat(self, other: Self) -> Self {
        Self(from_fn(|i| self.0[i].saturating_add(other.0[i])))
    }

    #[inline]
    #[must_use]
    pub fn sub_sat(self, other: Self) -> Self {
        Self(from_fn(|i| self.0[i].saturating_sub(other.0[i])))
    }

    /// Logical left shift; bits shifted past the top are dropped.
    #[inline]
    #[must_use]
    pub fn shl<const SHIFT: i32>(self) -> Self {
        Self(from_fn(|i| ((self.0[i] as u16) << SHIFT) as i16))
    }

    /// Upper 16 bits of the signed 32-bit product.
    #[inline]
    #[must_use]
    pub fn mulhi(self, other: Self) -> Self {
        Self(from_fn(|i| {
            ((i32::from(self.0[i]) * i32::from(other.0[i])) >> 16) as i16
        }))
    }
}

/// Saturates both inputs to `u8`, `lo` lanes first.
#[inline]
pub fn pack_u8(lo: I16Vec, hi: I16Vec) -> U8Vec {
    let mut lanes = [0u8; U8_LANES];
    for (dst, &x) in lanes.iter_mut().zip(lo.0.iter().chain(hi.0.iter())) {
        *dst = x.clamp(0, i16::from(u8::MAX)) as u8;
    }
    U8Vec(lanes)
}

impl U8Vec {
    #[inline]
    pub fn load(src: &[u8]) -> Self {
        let mut lanes = [0; U8_LANES];
        lanes.copy_from_slice(&src[..U8_LANES]);
        Self(lanes)
    }

    #[inline]
    pub fn store(self, dst: &mut [u8]) {
        dst[..U8_LANES].copy_from_slice(&self.0);
    }

    /// Bit `i` is set when 32-bit group `i` holds any nonzero byte.
    #[inline]
    pub fn nnz_mask(self) -> u32 {
        self.0
            .chunks_exact(4)
            .enumerate()
            .fold(0, |mask, (i, group)| {
                if group.iter().any(|&b| b != 0) {
                    mask | (1 << i)
                } else {
                    mask
                }
            })
    }
}

impl I32Vec {
    #[inline]
    pub fn zero() -> Self {
        Self([0; I32_LANES])
    }

    #[inline]
    pub fn store(self, dst: &mut [i32]) {
        dst[..I32_LANES].copy_from_slice(&self.0);
    }

    /// Adds `input` (four unsigned bytes, broadcast) dotted with each lane's
    /// four signed weights. Byte pairs are summed with i16 saturation first.
    #[inline]
    #[must_use]
    pub fn dpbusd(self, input: u32, weights: &[i8]) -> Self {
        let bytes = input.to_ne_bytes();
        let weights = &weights[..I32_LANES * 4];

        Self(from_fn(|lane| {
            let w = &weights[lane * 4..lane * 4 + 4];
            let pair = |k: usize| {
                let p0 = i16::from(bytes[k]) * i16::from(w[k]);
                let p1 = i16::from(bytes[k + 1]) * i16::from(w[k + 1]);
                i32::from(p0.saturating_add(p1))
            };
            self.0[lane].wrapping_add(pair(0) + pair(2))
        }))
    }

    #[inline]
    pub fn to_f32(self) -> F32Vec {
        F32Vec(from_fn(|i| self.0[i] as f32))
    }
}

impl F32Vec {
    #[inline]
    pub fn zero() -> Self {
        Self([0.0; F32_LANES])
    }

    #[inline]
    pub fn splat(value: f32) -> Self {
        Self([value; F32_LANES])
    }

    #[inline]
    pub fn load(src: &[f32]) -> Self {
        let mut lanes = [0.0; F32_LANES];
        lanes.copy_from_slice(&src[..F32_LANES]);
        Self(lanes)
    }

    #[inline]
    pub fn store(self, dst: &mut [f32]) {
        dst[..F32_LANES].copy_from_slice(&self.0);
    }

    /// Fused `self * b + c`.
    #[inline]
    #[must_use]
    pub fn mul_add(self, b: Self, c: Self) -> Self {
        Self(from_fn(|i| self.0[i].mul_add(b.0[i], c.0[i])))
    }

    #[inline]
    #[must_use]
    pub fn mul(self, other: Self) -> Self {
        Self(from_fn(|i| self.0[i] * other.0[i]))
    }

    #[inline]
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self(from_fn(|i| self.0[i].max(other.0[i])))
    }

    #[inline]
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        Self(from_fn(|i| self.0[i].min(other.0[i])))
    }

    /// Horizontal sum, folding the upper half onto the lower half each step.
    #[inline]
    pub fn reduce_add(self) -> f32 {
        let mut lanes = self.0;
        let mut width = F32_LANES;
        while width > 1 {
            width /= 2;
            for i in 0..width {
                lanes[i] += lanes[i + width];
            }
        }
        lanes[0]
    }
}
