//! Accumulator neuron reordering.
//!
//! The sparse L1 skips whole 32-bit groups of the feature transform output,
//! so it pays off when neurons that are often active share a group. A neuron
//! order moves accumulator pair `(src, src + L1_PAIR_COUNT)` to
//! `(dst, dst + L1_PAIR_COUNT)` for `order[dst] == src`; the feature transform
//! output byte of each perspective moves with it.
//!
//! [`ActivationStats`] counts how often each neuron fires over sampled
//! positions and turns the counts into an order, most active first.

use std::cmp::Reverse;

use super::buffer::FtOutputs;
use super::error::NetworkError;
use super::{L1_PAIR_COUNT, L1_SIZE};

/// New position `dst` takes accumulator neuron `order[dst]`.
pub type NeuronOrder = [usize; L1_PAIR_COUNT];

/// Identity order.
#[must_use]
pub fn identity_order() -> NeuronOrder {
    std::array::from_fn(|i| i)
}

/// Checks that `order` names every neuron exactly once.
pub fn validate_order(order: &NeuronOrder) -> Result<(), NetworkError> {
    let mut seen = [false; L1_PAIR_COUNT];

    for (position, &neuron) in order.iter().enumerate() {
        if neuron >= L1_PAIR_COUNT || seen[neuron] {
            return Err(NetworkError::InvalidPermutation { position, neuron });
        }
        seen[neuron] = true;
    }

    Ok(())
}

/// Reorders one accumulator-shaped row: both halves move together.
pub(crate) fn permute_pairs<T: Copy + Default>(row: &mut [T], order: &NeuronOrder) {
    debug_assert_eq!(row.len(), L1_SIZE);

    let mut old = [T::default(); L1_SIZE];
    old.copy_from_slice(row);

    for (dst, &src) in order.iter().enumerate() {
        row[dst] = old[src];
        row[dst + L1_PAIR_COUNT] = old[src + L1_PAIR_COUNT];
    }
}

/// Per-neuron activation counts gathered from feature transform outputs.
#[derive(Clone, Debug)]
pub struct ActivationStats {
    counts: Box<[u64; L1_SIZE]>,
    samples: u64,
}

impl Default for ActivationStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivationStats {
    #[must_use]
    pub fn new() -> Self {
        Self {
            counts: Box::new([0; L1_SIZE]),
            samples: 0,
        }
    }

    /// Counts the nonzero output bytes of one evaluated position.
    pub fn record(&mut self, outputs: &FtOutputs) {
        self.samples += 1;
        for (count, &byte) in self.counts.iter_mut().zip(outputs.bytes()) {
            *count += u64::from(byte != 0);
        }
    }

    #[inline]
    #[must_use]
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Times `neuron` fired, summed over both perspectives.
    #[inline]
    #[must_use]
    pub fn count(&self, neuron: usize) -> u64 {
        self.counts[neuron] + self.counts[neuron + L1_PAIR_COUNT]
    }

    /// Mean number of nonzero output bytes per recorded position.
    #[must_use]
    pub fn mean_active(&self) -> f64 {
        if self.samples == 0 {
            return 0.0;
        }
        self.counts.iter().sum::<u64>() as f64 / self.samples as f64
    }

    /// Neurons sorted by activation count, most active first. Ties keep
    /// their original relative order.
    #[must_use]
    pub fn order(&self) -> NeuronOrder {
        let mut order = identity_order();
        order.sort_by_key(|&neuron| Reverse(self.count(neuron)));
        log::debug!(
            "neuron order from {} samples, {:.1} active bytes per position",
            self.samples,
            self.mean_active()
        );
        order
    }
}
