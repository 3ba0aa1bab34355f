//! Error types for network loading and preparation.

use std::fmt;
use std::io;

/// Error type for network file loading failures
#[derive(Debug)]
pub enum NetworkError {
    /// The underlying reader or file failed
    Io(io::Error),
    /// Fewer bytes than the architecture requires
    SizeMismatch { expected: usize, found: usize },
    /// A neuron order that is not a permutation of `0..L1_PAIR_COUNT`
    InvalidPermutation { position: usize, neuron: usize },
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::Io(err) => write!(f, "Failed to read network: {err}"),
            NetworkError::SizeMismatch { expected, found } => {
                write!(
                    f,
                    "Network data too short: expected {expected} bytes, found {found}"
                )
            }
            NetworkError::InvalidPermutation { position, neuron } => {
                write!(
                    f,
                    "Invalid neuron order: entry {position} ({neuron}) is out of range or repeated"
                )
            }
        }
    }
}

impl std::error::Error for NetworkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NetworkError::Io(err) => Some(err),
            NetworkError::SizeMismatch { .. } | NetworkError::InvalidPermutation { .. } => None,
        }
    }
}

impl From<io::Error> for NetworkError {
    fn from(err: io::Error) -> Self {
        NetworkError::Io(err)
    }
}
