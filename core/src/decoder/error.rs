//! Decode-time error type.
//!
//! Following the teacher's layered approach (`anyhow` at I/O edges, a small
//! hand-rolled error type at the library edge — see `word_bigram.rs`'s
//! `load`/`save`), `DecodeError` only covers the documented, caller-visible
//! failure modes of a decode call (spec §7). Internal invariant violations
//! (pool exhaustion, corrupt trie offsets) are not `Err`s: the beam loop
//! degrades gracefully and surfaces corruption as a sticky flag instead,
//! matching the source's "finish the call, report afterward" behavior.

use std::fmt;

/// Failure modes a caller of [`crate::decoder::session::DecodeSession::decode`]
/// must be prepared to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// `inputSize <= 0`.
    InvalidInputSize,
    /// The previous-word context exceeds `MAX_WORD_LENGTH`.
    PrevWordTooLong,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidInputSize => write!(f, "input size must be positive"),
            DecodeError::PrevWordTooLong => {
                write!(f, "previous word exceeds the maximum word length")
            }
        }
    }
}

impl std::error::Error for DecodeError {}
