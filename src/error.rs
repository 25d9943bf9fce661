//! Errors raised while building or pulling streams.

use thiserror::Error;

/// Everything that can go wrong while pulling samples through a graph.
///
/// None of these are retried. An error aborts the `fetch` that raised it and
/// no block is produced for that call; the stream should not be read again
/// afterwards.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StreamError {
    /// A trigger closure failed, or did not return a single monophonic sound.
    #[error("closure evaluated at {time}s failed: {reason}")]
    Evaluation { time: f64, reason: String },

    /// A trigger closure returned a sound at a different sample rate.
    #[error("sample rates must match: trigger runs at {expected} Hz, closure returned {found} Hz")]
    RateMismatch { expected: f64, found: f64 },

    /// `fetch` was asked for zero samples or more than a block holds.
    #[error("cannot fetch {requested} samples, blocks hold 1..={capacity}")]
    BlockLength { requested: usize, capacity: usize },

    /// Streams need a finite, positive sample rate.
    #[error("invalid sample rate {0}")]
    InvalidSampleRate(f64),

    /// The node is already inside a `fetch` further up the call stack.
    #[error("node is already being fetched")]
    Busy,
}
