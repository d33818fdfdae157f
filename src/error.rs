//! Error types for framegrab.

use thiserror::Error;

/// Result type alias using framegrab's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for framegrab operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A construction parameter violated its constraint.
    ///
    /// Fatal to construction; no partially-built reader escapes.
    #[error("invalid argument `{field}`: {reason}")]
    InvalidArgument {
        /// Name of the offending parameter.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The requested pixel layout or component type is not supported.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A device buffer allocation or mapping failed.
    ///
    /// All partially-created transfer buffers are rolled back before
    /// this propagates.
    #[error("device allocation failed: {0}")]
    AllocationError(String),

    /// A harvest wait exceeded its timeout budget.
    ///
    /// Recoverable: the cycle yields no result and the slot is retried
    /// the next time the ring reaches it.
    #[error("readback timed out waiting on slot {slot}")]
    ReadbackTimeout {
        /// Ring slot whose fence did not signal in time.
        slot: usize,
    },

    /// Caller protocol violation (double-arm, use after shutdown).
    #[error("invalid state: {0}")]
    InvalidState(String),
}
