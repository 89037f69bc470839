//! Fundamental value types and resource-cap constants for the decoding core.
//!
//! Mirrors the constant surface of `defines.h` / `dic_node_state_scoring.h` in
//! the AOSP LatinIME native suggest engine, renamed to the vocabulary used by
//! the rest of this crate.

use std::fmt;

/// A single Unicode scalar value travelling through the trie/beam.
pub type CodePoint = char;

/// Sentinel for "no code point here" in fixed-capacity output buffers.
pub const NOT_A_CODE_POINT: CodePoint = '\u{0}';

/// Opaque offset into the dictionary's trie storage. Never interpreted by
/// this crate except as an equality-comparable handle.
pub type TriePos = i32;

/// Sentinel `TriePos` meaning "no such position".
pub const NOT_A_DICT_POS: TriePos = -1;

/// Sentinel probability meaning "no information available".
pub const NOT_A_PROBABILITY: i32 = -1;

/// Upper bound on stored unigram probability (8-bit encoding, see §6.3).
pub const MAX_PROBABILITY: i32 = 255;

/// Upper bound on the 4-bit bigram delta encoding (§6.3).
pub const MAX_BIGRAM_ENCODED_PROBABILITY: i32 = 15;

/// Maximum code points in any single word, including the previous-word
/// context carried by a `DicNode`. Matches `MAX_WORD_LENGTH_INTERNAL`.
pub const MAX_WORD_LENGTH: usize = 48;

/// Safety margin subtracted from `MAX_WORD_LENGTH` when bounding total input
/// consumption. The upstream source carries a `"3 can be 2?"` comment next
/// to this value — it is empirical, not derived. See `DecoderConfig` for the
/// tunable version of this margin.
pub const WORD_LENGTH_MARGIN: usize = 3;

/// Number of input indices the cache keeps before the tip, used to decide
/// when a continuation snapshot should be taken for backspace tolerance.
pub const CACHE_BACK_LENGTH: usize = 3;

/// Minimum input length below which continuation reuse is not attempted.
pub const MIN_CONTINUOUS_SUGGESTION_INPUT_SIZE: usize = 2;

/// Default terminal-queue bound (`MAX_RESULTS`).
pub const MAX_RESULTS: usize = 18;

/// Corruption guard: a PtNode array walk that visits more than this many
/// nodes is assumed to be looping on corrupted forward links.
pub const MAX_CHILD_COUNT_TO_AVOID_INFINITE_LOOP: usize = 100_000;

/// Dictionary size, in bytes, above which the "large" pool/queue capacities
/// apply (see `DecoderConfig::capacities_for_dictionary_size`).
pub const LARGE_DICTIONARY_SIZE_THRESHOLD_BYTES: u64 = 256 * 1024;

/// Pool capacity used for dictionaries at or above the size threshold.
pub const LARGE_NODE_POOL_CAPACITY: usize = 310;

/// Pool capacity used for dictionaries below the size threshold.
pub const SMALL_NODE_POOL_CAPACITY: usize = 100;

/// A cost large enough that any node carrying it is guaranteed to lose the
/// comparator against a finite-cost node, and is therefore prunable.
pub const MAX_VALUE_FOR_WEIGHTING: f32 = 1.0e8;

/// Returned by `computeFirstWordConfidence` when there is no completed first
/// word (no space yet in the candidate).
pub const NOT_A_FIRST_WORD_CONFIDENCE: i32 = -1;

/// Threshold above which a first-word confidence triggers auto-commit.
pub const FIRST_WORD_CONFIDENCE_AUTOCOMMIT_THRESHOLD: i32 = 1_000_000;

/// Classification of how a child code point relates to the corresponding
/// input sample, reported by `ProximityState::get_proximity_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProximityType {
    Match,
    Proximity,
    AdditionalProximity,
    Substitution,
    Unrelated,
}

/// Semantic classification of the edge taken to reach a child node, used by
/// Scoring to boost or demote the final score and by invariant #5 of the
/// testable properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    NotAnError,
    ProximityCorrection,
    EditCorrection,
    Completion,
    NewWord,
    IntentionalOmission,
}

/// Finer-grained classification used internally by the Typing weighting
/// policy to decide score promotions/demotions (case-only, accent-only,
/// etc., see spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingErrorClass {
    CleanMatch,
    CaseError,
    AccentError,
    CaseAndAccentError,
    Digraph,
    Proximity,
    Other,
}

/// Ring index walking a composite (digraph) code point's expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigraphIndex {
    NotADigraph,
    First,
    Second,
}

impl Default for DigraphIndex {
    fn default() -> Self {
        DigraphIndex::NotADigraph
    }
}

impl DigraphIndex {
    /// Advance one step around the three-state ring.
    pub fn advance(self) -> Self {
        match self {
            DigraphIndex::NotADigraph => DigraphIndex::First,
            DigraphIndex::First => DigraphIndex::Second,
            DigraphIndex::Second => DigraphIndex::NotADigraph,
        }
    }
}

/// Tracks whether a node's output ends in a repeated letter, and how
/// strongly, so Weighting can tolerate one fewer repeat than typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoubleLetterLevel {
    NotADoubleLetter,
    ADoubleLetter,
    AStrongDoubleLetter,
}

impl Default for DoubleLetterLevel {
    fn default() -> Self {
        DoubleLetterLevel::NotADoubleLetter
    }
}

impl DoubleLetterLevel {
    /// Merge in a newly observed level, never downgrading from "strong".
    pub fn advance(self, level: DoubleLetterLevel) -> Self {
        match level {
            DoubleLetterLevel::NotADoubleLetter => self,
            DoubleLetterLevel::ADoubleLetter => {
                if self == DoubleLetterLevel::AStrongDoubleLetter {
                    self
                } else {
                    level
                }
            }
            DoubleLetterLevel::AStrongDoubleLetter => level,
        }
    }
}

/// The kind of suggestion emitted by the output stage (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    Correction,
    Whitelist,
    Shortcut,
}

impl fmt::Display for SuggestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SuggestionKind::Correction => "correction",
            SuggestionKind::Whitelist => "whitelist",
            SuggestionKind::Shortcut => "shortcut",
        };
        f.write_str(s)
    }
}

/// Combine a unigram and bigram probability per §6.3.
///
/// `unigram` and `bigram` are both expected in `0..=MAX_PROBABILITY`/
/// `0..=MAX_BIGRAM_ENCODED_PROBABILITY`, or `NOT_A_PROBABILITY` when
/// unavailable (callers are expected to have already special-cased that).
pub fn compute_probability_for_bigram(unigram: i32, bigram: i32) -> i32 {
    let step = (MAX_PROBABILITY - unigram) as f32 / (1.5 + MAX_BIGRAM_ENCODED_PROBABILITY as f32);
    unigram + ((bigram + 1) as f32 * step).round() as i32
}

/// Back off to a unigram-only probability when no bigram entry exists.
///
/// The upstream `ProbabilityUtils::backoff` is a documented no-op (its
/// author's comment says applying the weight "gives bad results in tests"
/// and leaves a TODO); spec.md §6.3 instead specifies the weighted formula
/// explicitly, so that is what this crate implements. See DESIGN.md.
pub fn backoff_probability(unigram: i32) -> i32 {
    if unigram > 8 {
        unigram - 8
    } else {
        0
    }
}
