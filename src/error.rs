//! Error types for the fix-flyweight crate.
//!
//! Only setup, I/O and encode-side contract violations are errors. Malformed
//! input on the decode path is reported as a
//! [`DecodeOutcome`](crate::consumer::DecodeOutcome) instead, so the hot
//! path never unwinds or allocates an error value.

use thiserror::Error;

/// The main error type for this crate
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem or queue I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The queue journal ends with a partial frame
    #[error("Queue corrupt: truncated frame at byte offset {offset}")]
    QueueCorrupt {
        /// Offset of the frame header that could not be completed
        offset: u64,
    },

    /// Latency histogram could not be constructed
    #[error("Histogram error: {0}")]
    Histogram(String),

    /// The consumer thread could not be pinned to the requested core
    #[error("Failed to pin thread to core {core}")]
    Affinity {
        /// Requested core id
        core: usize,
    },

    /// No core could be found to pin the consumer thread to
    #[error("No CPU core available for pinning")]
    NoCores,

    /// Invalid configuration (zero workers, bad bounds, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A message could not be encoded with the given fields
    #[error("Encode error: {0}")]
    Encode(String),
}

impl From<hdrhistogram::CreationError> for Error {
    fn from(err: hdrhistogram::CreationError) -> Self {
        Error::Histogram(format!("{:?}", err))
    }
}
