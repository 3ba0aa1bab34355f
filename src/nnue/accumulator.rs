//! Perspective accumulators fed into the feature transform.
//!
//! Feature indices are rows of the feature transformer, i.e. already
//! offset by the perspective's input bucket (see
//! [`FeatureTransformer::feature_index`]).

use super::network::FeatureTransformer;
use super::simd;
use super::L1_SIZE;

/// NNUE accumulator storing hidden layer pre-activations for both perspectives
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Accumulator {
    /// White's perspective accumulator
    pub white: [i16; L1_SIZE],
    /// Black's perspective accumulator
    pub black: [i16; L1_SIZE],
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            white: [0; L1_SIZE],
            black: [0; L1_SIZE],
        }
    }
}

impl Accumulator {
    /// Create a new accumulator initialized with biases
    #[must_use]
    pub fn new(biases: &[i16; L1_SIZE]) -> Self {
        Self {
            white: *biases,
            black: *biases,
        }
    }

    /// Refresh accumulator from scratch given active features
    pub fn refresh(
        &mut self,
        white_features: &[usize],
        black_features: &[usize],
        ft: &FeatureTransformer,
    ) {
        self.white = *ft.biases;
        self.black = *ft.biases;

        for &feat in white_features {
            simd::add_weights(&mut self.white, ft.row(feat));
        }
        for &feat in black_features {
            simd::add_weights(&mut self.black, ft.row(feat));
        }
    }

    /// Add a feature (piece placed on square)
    #[inline]
    pub fn add_feature(&mut self, white_feat: usize, black_feat: usize, ft: &FeatureTransformer) {
        simd::add_weights(&mut self.white, ft.row(white_feat));
        simd::add_weights(&mut self.black, ft.row(black_feat));
    }

    /// Remove a feature (piece removed from square)
    #[inline]
    pub fn sub_feature(&mut self, white_feat: usize, black_feat: usize, ft: &FeatureTransformer) {
        simd::sub_weights(&mut self.white, ft.row(white_feat));
        simd::sub_weights(&mut self.black, ft.row(black_feat));
    }

    /// `(us, them)` for the side to move.
    #[inline]
    #[must_use]
    pub fn perspectives(&self, white_to_move: bool) -> (&[i16; L1_SIZE], &[i16; L1_SIZE]) {
        if white_to_move {
            (&self.white, &self.black)
        } else {
            (&self.black, &self.white)
        }
    }
}
