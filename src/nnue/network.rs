//! NNUE network structure, loading and evaluation.
//!
//! Holds one feature transformer shared by every position and one set of
//! L1..L3 parameters per output bucket.

use super::accumulator::Accumulator;
use super::buffer::{FtOutputs, NnzIndices};
use super::error::NetworkError;
use super::layers::{
    l1_weight_index, propagate_l1, propagate_l2, propagate_l3, scale_output, L1Weights,
};
use super::nnz::NnzTable;
use super::permute::{permute_pairs, validate_order, NeuronOrder};
use super::simd;
use super::transform::activate_ft;
use super::{
    INPUT_BUCKETS, INPUT_SIZE, L1_PAIR_COUNT, L1_SIZE, L2_SIZE, L3_SIZE, N_FTB, N_FTW, N_L1B,
    N_L1W, N_L2B, N_L2W, N_L3B, N_L3W, OUTPUT_BUCKETS,
};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Bytes in a serialized network.
#[must_use]
pub const fn network_size() -> usize {
    (N_FTW + N_FTB) * std::mem::size_of::<i16>()
        + N_L1W * std::mem::size_of::<i8>()
        + (N_L1B + N_L2W + N_L2B + N_L3W + N_L3B) * std::mem::size_of::<f32>()
}

/// Size of the serialized L1..L3 section, which follows the feature transformer.
const fn output_layers_size() -> usize {
    network_size() - (N_FTW + N_FTB) * std::mem::size_of::<i16>()
}

fn boxed_array<T: Clone, const N: usize>(value: T) -> Box<[T; N]> {
    match vec![value; N].into_boxed_slice().try_into() {
        Ok(array) => array,
        Err(_) => unreachable!("vec! produced exactly N elements"),
    }
}

/// Feature transformer weights `[INPUT_BUCKETS][INPUT_SIZE][L1_SIZE]` and biases.
pub struct FeatureTransformer {
    pub weights: Box<[i16; N_FTW]>,
    pub biases: Box<[i16; L1_SIZE]>,
}

impl FeatureTransformer {
    #[must_use]
    pub fn zeroed() -> Self {
        Self {
            weights: boxed_array(0),
            biases: boxed_array(0),
        }
    }

    /// Row index of `feature` under `input_bucket`.
    #[inline]
    #[must_use]
    pub fn feature_index(input_bucket: usize, feature: usize) -> usize {
        debug_assert!(input_bucket < INPUT_BUCKETS, "input bucket {input_bucket}");
        debug_assert!(feature < INPUT_SIZE, "feature {feature}");
        input_bucket * INPUT_SIZE + feature
    }

    #[inline]
    #[must_use]
    pub fn row(&self, index: usize) -> &[i16] {
        let start = index * L1_SIZE;
        &self.weights[start..start + L1_SIZE]
    }

    #[inline]
    pub fn row_mut(&mut self, index: usize) -> &mut [i16] {
        let start = index * L1_SIZE;
        &mut self.weights[start..start + L1_SIZE]
    }
}

/// L1..L3 parameters for one output bucket.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputLayers {
    pub l1_weights: Box<L1Weights>,
    pub l1_biases: [f32; L2_SIZE],
    /// Row-major by input: `l2_weights[i * L3_SIZE + j]`
    pub l2_weights: Box<[f32; L2_SIZE * L3_SIZE]>,
    pub l2_biases: [f32; L3_SIZE],
    pub l3_weights: [f32; L3_SIZE],
    pub l3_bias: f32,
}

impl OutputLayers {
    #[must_use]
    pub fn zeroed() -> Self {
        Self {
            l1_weights: boxed_array(0),
            l1_biases: [0.0; L2_SIZE],
            l2_weights: boxed_array(0.0),
            l2_biases: [0.0; L3_SIZE],
            l3_weights: [0.0; L3_SIZE],
            l3_bias: 0.0,
        }
    }

    /// Reads every bucket's parameters from the serialized, bucket-interleaved
    /// layout and transposes them into per-bucket layouts.
    fn read_all(reader: &mut ByteReader<'_>) -> Box<[OutputLayers; OUTPUT_BUCKETS]> {
        let l1_weights = reader.read_i8s(N_L1W);
        let l1_biases = reader.read_f32s(N_L1B);
        let l2_weights = reader.read_f32s(N_L2W);
        let l2_biases = reader.read_f32s(N_L2B);
        let l3_weights = reader.read_f32s(N_L3W);
        let l3_biases = reader.read_f32s(N_L3B);

        Box::new(std::array::from_fn(|bucket| {
            let mut layers = OutputLayers::zeroed();

            for input in 0..L1_SIZE {
                for out in 0..L2_SIZE {
                    layers.l1_weights[l1_weight_index(input, out)] =
                        l1_weights[(input * OUTPUT_BUCKETS + bucket) * L2_SIZE + out];
                }
            }

            layers
                .l1_biases
                .copy_from_slice(&l1_biases[bucket * L2_SIZE..(bucket + 1) * L2_SIZE]);

            for i in 0..L2_SIZE {
                for j in 0..L3_SIZE {
                    layers.l2_weights[i * L3_SIZE + j] =
                        l2_weights[(i * OUTPUT_BUCKETS + bucket) * L3_SIZE + j];
                }
            }

            layers
                .l2_biases
                .copy_from_slice(&l2_biases[bucket * L3_SIZE..(bucket + 1) * L3_SIZE]);

            for i in 0..L3_SIZE {
                layers.l3_weights[i] = l3_weights[i * OUTPUT_BUCKETS + bucket];
            }

            layers.l3_bias = l3_biases[bucket];
            layers
        }))
    }

    /// Moves the L1 inputs of both perspectives to follow `order`.
    fn permute_inputs(&mut self, order: &NeuronOrder) {
        let old = self.l1_weights.clone();

        for half in [0, L1_PAIR_COUNT] {
            for (dst, &src) in order.iter().enumerate() {
                for out in 0..L2_SIZE {
                    self.l1_weights[l1_weight_index(dst + half, out)] =
                        old[l1_weight_index(src + half, out)];
                }
            }
        }
    }
}

/// Little-endian cursor over a buffer already checked to be long enough.
struct ByteReader<'a> {
    data: &'a [u8],
}

impl<'a> ByteReader<'a> {
    fn take(&mut self, len: usize) -> &'a [u8] {
        let (head, tail) = self.data.split_at(len);
        self.data = tail;
        head
    }

    fn read_i16s_into(&mut self, dst: &mut [i16]) {
        let bytes = self.take(dst.len() * 2);
        for (d, c) in dst.iter_mut().zip(bytes.chunks_exact(2)) {
            *d = i16::from_le_bytes([c[0], c[1]]);
        }
    }

    fn read_i8s(&mut self, len: usize) -> Vec<i8> {
        self.take(len).iter().map(|&b| b as i8).collect()
    }

    fn read_f32s(&mut self, len: usize) -> Vec<f32> {
        self.take(len * 4)
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }
}

/// NNUE network weights
pub struct Network {
    pub ft: FeatureTransformer,
    /// One entry per output bucket
    pub buckets: Box<[OutputLayers; OUTPUT_BUCKETS]>,
}

impl Network {
    #[must_use]
    pub fn zeroed() -> Self {
        Self {
            ft: FeatureTransformer::zeroed(),
            buckets: Box::new(std::array::from_fn(|_| OutputLayers::zeroed())),
        }
    }

    /// Load network from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, NetworkError> {
        let file = File::open(path.as_ref())?;
        log::debug!("loading network from {}", path.as_ref().display());
        Self::from_reader(&mut BufReader::new(file))
    }

    /// Load network from any reader. Reads at most [`network_size`] bytes.
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self, NetworkError> {
        let mut data = Vec::with_capacity(network_size());
        reader.take(network_size() as u64).read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    /// Load network from byte slice
    pub fn from_bytes(data: &[u8]) -> Result<Self, NetworkError> {
        let expected = network_size();
        if data.len() < expected {
            return Err(NetworkError::SizeMismatch {
                expected,
                found: data.len(),
            });
        }
        if data.len() > expected {
            log::debug!("ignoring {} trailing bytes after network", data.len() - expected);
        }

        let mut reader = ByteReader { data };
        let mut ft = FeatureTransformer::zeroed();
        reader.read_i16s_into(&mut ft.weights[..]);
        reader.read_i16s_into(&mut ft.biases[..]);

        debug_assert_eq!(reader.data.len(), data.len() - expected + output_layers_size());
        let buckets = OutputLayers::read_all(&mut reader);

        log::debug!(
            "loaded network: {} input buckets, {} output buckets, {} bytes, {} backend",
            INPUT_BUCKETS,
            buckets.len(),
            expected,
            simd::BACKEND
        );
        Ok(Self { ft, buckets })
    }

    /// Reorders the accumulator neurons: position `dst` takes neuron `order[dst]`.
    ///
    /// Moves every feature transformer row, the biases, and the matching L1
    /// inputs of both perspectives in every output bucket, so evaluation
    /// results do not change. Accumulators built before the call must be
    /// refreshed. Placing frequently active neurons next to each other (see
    /// [`ActivationStats::order`](super::permute::ActivationStats::order))
    /// lets the sparse L1 skip more zero groups.
    pub fn permute(&mut self, order: &NeuronOrder) -> Result<(), NetworkError> {
        validate_order(order)?;

        for row in self.ft.weights.chunks_exact_mut(L1_SIZE) {
            permute_pairs(row, order);
        }
        permute_pairs(&mut self.ft.biases[..], order);

        for layers in self.buckets.iter_mut() {
            layers.permute_inputs(order);
        }

        log::debug!("permuted {L1_PAIR_COUNT} accumulator neurons");
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn layers(&self, output_bucket: usize) -> &OutputLayers {
        debug_assert!(output_bucket < OUTPUT_BUCKETS, "output bucket {output_bucket}");
        &self.buckets[output_bucket]
    }

    /// Evaluate position given accumulator and side to move.
    /// Returns evaluation in centipawns from side-to-move perspective.
    #[inline]
    #[must_use]
    pub fn evaluate(
        &self,
        acc: &Accumulator,
        white_to_move: bool,
        output_bucket: usize,
        table: &NnzTable,
    ) -> i32 {
        let (us, them) = acc.perspectives(white_to_move);
        evaluate(us, them, self.layers(output_bucket), table)
    }
}

/// Output bucket for a position with `piece_count` pieces on the board (kings included).
#[inline]
#[must_use]
pub fn output_bucket(piece_count: usize) -> usize {
    const DIVISOR: usize = (32 + OUTPUT_BUCKETS - 1) / OUTPUT_BUCKETS;
    debug_assert!(piece_count >= 2, "piece count {piece_count}");
    (piece_count.saturating_sub(2) / DIVISOR).min(OUTPUT_BUCKETS - 1)
}

/// Full forward pass for one position: feature transform, sparse L1,
/// dense L2 and the output layer.
#[must_use]
pub fn evaluate(
    us: &[i16; L1_SIZE],
    them: &[i16; L1_SIZE],
    layers: &OutputLayers,
    table: &NnzTable,
) -> i32 {
    let mut ft_outputs = FtOutputs::new();
    let mut nnz = NnzIndices::new();
    let mut l1_outputs = [0.0f32; L2_SIZE];
    let mut l2_outputs = [0.0f32; L3_SIZE];

    activate_ft(us, them, table, &mut ft_outputs, &mut nnz);
    propagate_l1(
        &ft_outputs,
        nnz.as_slice(),
        &layers.l1_weights,
        &layers.l1_biases,
        &mut l1_outputs,
    );
    propagate_l2(
        &l1_outputs,
        &layers.l2_weights,
        &layers.l2_biases,
        &mut l2_outputs,
    );

    scale_output(propagate_l3(&l2_outputs, &layers.l3_weights, layers.l3_bias))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_f32s(bytes: &mut Vec<u8>, values: impl Iterator<Item = f32>) {
        for v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
    }

    #[test]
    fn test_output_bucket() {
        assert_eq!(output_bucket(2), 0);
        assert_eq!(output_bucket(5), 0);
        assert_eq!(output_bucket(6), 1);
        assert_eq!(output_bucket(32), 7);
        assert_eq!(output_bucket(33), 7);
    }

    #[test]
    fn test_network_size() {
        assert_eq!(
            network_size(),
            (N_FTW + N_FTB) * 2 + N_L1W + (N_L1B + N_L2W + N_L2B + N_L3W + N_L3B) * 4
        );
    }

    #[test]
    fn test_short_input_is_rejected() {
        let data = vec![0u8; 1024];
        match Network::from_bytes(&data) {
            Err(NetworkError::SizeMismatch { expected, found }) => {
                assert_eq!(expected, network_size());
                assert_eq!(found, 1024);
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("short input accepted"),
        }
    }

    #[test]
    fn test_reader_stops_after_network() {
        // An endless reader yields exactly one network's worth of zeros.
        let network = Network::from_reader(&mut std::io::repeat(0)).expect("zeros load");
        assert!(network.ft.biases.iter().all(|&b| b == 0));
        assert_eq!(network.buckets.len(), OUTPUT_BUCKETS);
        assert_eq!(network.layers(OUTPUT_BUCKETS - 1).l3_bias, 0.0);
    }

    #[test]
    fn test_short_reader_is_rejected() {
        let data = [7u8; 100];
        match Network::from_reader(&mut &data[..]) {
            Err(NetworkError::SizeMismatch { found, .. }) => assert_eq!(found, 100),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("short input accepted"),
        }
    }

    #[test]
    fn test_zeroed_network_has_every_bucket() {
        let network = Network::zeroed();
        assert_eq!(network.buckets.len(), OUTPUT_BUCKETS);
        assert!(network.buckets.iter().all(|layers| *layers == OutputLayers::zeroed()));
    }

    #[test]
    fn test_l1_weight_index_is_group_major() {
        assert_eq!(l1_weight_index(0, 0), 0);
        assert_eq!(l1_weight_index(3, 0), 3);
        assert_eq!(l1_weight_index(0, 1), 4);
        assert_eq!(l1_weight_index(4, 0), 4 * L2_SIZE);
        assert_eq!(l1_weight_index(L1_SIZE - 1, L2_SIZE - 1), L1_SIZE * L2_SIZE - 1);
    }

    #[test]
    fn test_output_layers_are_transposed_per_bucket() {
        let mut bytes = Vec::with_capacity(output_layers_size());

        // L1 weights [input][bucket][out]
        for input in 0..L1_SIZE {
            for bucket in 0..OUTPUT_BUCKETS {
                for out in 0..L2_SIZE {
                    let v = ((input * 3 + bucket * 5 + out * 7) % 251) as u8;
                    bytes.push(v);
                }
            }
        }
        // L1 biases [bucket][out]
        push_f32s(&mut bytes, (0..N_L1B).map(|i| i as f32));
        // L2 weights [in][bucket][out]
        push_f32s(&mut bytes, (0..N_L2W).map(|i| i as f32 * 0.5));
        // L2 biases [bucket][out]
        push_f32s(&mut bytes, (0..N_L2B).map(|i| -(i as f32)));
        // L3 weights [in][bucket]
        push_f32s(&mut bytes, (0..N_L3W).map(|i| i as f32 * 2.0));
        // L3 biases [bucket]
        push_f32s(&mut bytes, (0..N_L3B).map(|i| i as f32 + 0.5));
        assert_eq!(bytes.len(), output_layers_size());

        let mut reader = ByteReader { data: &bytes };
        let buckets = OutputLayers::read_all(&mut reader);
        assert!(reader.data.is_empty());
        assert_eq!(buckets.len(), OUTPUT_BUCKETS);

        let bucket = 3;
        let layers = &buckets[bucket];

        let (input, out) = (1234, 9);
        let (group, k) = (input / 4, input % 4);
        let expected = ((input * 3 + bucket * 5 + out * 7) % 251) as u8 as i8;
        assert_eq!(layers.l1_weights[group * 4 * L2_SIZE + out * 4 + k], expected);

        assert_eq!(layers.l1_biases[2], (bucket * L2_SIZE + 2) as f32);
        assert_eq!(
            layers.l2_weights[5 * L3_SIZE + 11],
            ((5 * OUTPUT_BUCKETS + bucket) * L3_SIZE + 11) as f32 * 0.5
        );
        assert_eq!(layers.l2_biases[7], -((bucket * L3_SIZE + 7) as f32));
        assert_eq!(layers.l3_weights[6], (6 * OUTPUT_BUCKETS + bucket) as f32 * 2.0);
        assert_eq!(layers.l3_bias, 3.5);
    }
}
