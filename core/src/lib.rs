//! Soft-keyboard input decoding core: a bounded-memory beam search over a
//! compressed patricia-trie lexicon, scored by a pluggable spatial/language
//! cost model.
//!
//! [`decoder::DecodeSession::decode`] is the crate's single entry point.
//! Everything it needs is assembled from the pieces in [`decoder`]: a
//! [`decoder::DictPolicy`] lexicon, a [`decoder::ProximityState`] spatial
//! input, a [`decoder::Weighting`] cost model, and a [`decoder::Scoring`]
//! ranking policy.

pub mod decoder;

pub use decoder::{
    DecodeError, DecodeSession, DecoderConfig, DefaultScoring, DictPolicy, GestureWeighting,
    GridProximityState, MemoryTrieDict, ProximityState, Scoring, Suggestion, TypingWeighting,
    Weighting,
};
