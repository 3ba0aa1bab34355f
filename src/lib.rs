//! Sparse NNUE inference core.
//!
//! Evaluates a quantized (768 x 14 -> 2048) x 2 -> 16 -> 32 -> 1 network
//! from a pair of perspective accumulators. Zero 32-bit groups of the
//! feature transform output are skipped in L1 using a nonzero-index table.
//!
//! # Example
//! ```
//! use sparse_nnue::nnue::{self, OutputLayers, L1_SIZE};
//!
//! let table = nnue::initialize();
//! let layers = OutputLayers::zeroed();
//! let us = [0i16; L1_SIZE];
//! let them = [0i16; L1_SIZE];
//! assert_eq!(nnue::evaluate(&us, &them, &layers, table), 0);
//! ```

pub mod nnue;

pub use nnue::{evaluate, initialize, Accumulator, Network, NetworkError, NnzTable, OutputLayers};
