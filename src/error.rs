//! Error types for trueno-conv operations.

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in trueno-conv operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Unsupported combination of kernel, block, stride, dilation, group or
    /// padding, or a geometry that yields an empty destination.
    #[error("Invalid convolution configuration: {reason}")]
    InvalidConfiguration {
        /// Human-readable description of the rejected parameter.
        reason: String,
    },

    /// Scratch buffer smaller than `external_buffer_size()`.
    #[error("Scratch buffer too small: need {required} elements, got {provided}")]
    BufferTooSmall {
        /// Minimum number of f32 elements required.
        required: usize,
        /// Number of f32 elements provided.
        provided: usize,
    },

    /// `forward` called before `set_params` installed the weights.
    #[error("Weights not set: call set_params before forward")]
    WeightsNotSet,

    /// Tensor slice length contradicts the declared geometry.
    #[error("Data length mismatch for {tensor}: expected {expected} elements, got {actual}")]
    DataLengthMismatch {
        /// Which tensor failed the check (src, dst, weight, bias).
        tensor: &'static str,
        /// Length implied by the convolution parameters.
        expected: usize,
        /// Length of the slice actually passed.
        actual: usize,
    },
}

impl Error {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Error::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}
