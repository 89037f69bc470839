//! Decoder configuration: resource caps and scoring constants, tunable
//! without recompiling. Follows the same `Default` + TOML load/save shape as
//! the top-level `Config` in `lib.rs`.

use serde::{Deserialize, Serialize};

use super::types::{
    CACHE_BACK_LENGTH, LARGE_DICTIONARY_SIZE_THRESHOLD_BYTES, LARGE_NODE_POOL_CAPACITY,
    MAX_RESULTS, MAX_WORD_LENGTH, MIN_CONTINUOUS_SUGGESTION_INPUT_SIZE,
    SMALL_NODE_POOL_CAPACITY, WORD_LENGTH_MARGIN,
};

/// Resource caps and tunable scoring constants for a [`super::session::DecodeSession`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Max slots in each of `active`/`nextActive` (NodePool capacity).
    pub node_pool_capacity: usize,
    /// Max entries retained in the terminal queue.
    pub max_results: usize,
    /// Max code points in a word, including carried previous-word context.
    pub max_word_length: usize,
    /// Safety margin subtracted from `max_word_length` when bounding total
    /// input consumption (the upstream `"3 can be 2?"` constant).
    pub word_length_margin: usize,
    /// Input indices kept before the tip before a continuation snapshot is
    /// offered for backspace tolerance.
    pub cache_back_length: usize,
    /// Minimum input length before continuation reuse is attempted.
    pub min_continuous_suggestion_input_size: usize,
    /// Max distinct previous-word contexts kept in the bigram cache.
    pub bigram_cache_max_contexts: usize,

    /// Additive score boost for an exact-match terminal.
    pub exact_match_boost: i32,
    /// Additive score boost for a *perfect* match (exact, zero corrections,
    /// first candidate considered) on top of `exact_match_boost`.
    pub perfect_match_boost: i32,
    /// Score demotion applied when the path contains an accent-only error.
    pub accent_error_demotion: i32,
    /// Score demotion applied when the path contains a case-only error.
    pub case_error_demotion: i32,
    /// Score demotion applied when the path contains a digraph expansion.
    pub digraph_demotion: i32,
    /// Score boost applied to the top suggestion of a force-committed
    /// multi-word candidate.
    pub force_commit_boost: i32,
    /// Extra distance charged at final scoring to any terminal that took a
    /// COMPLETION edge, on top of `Weighting::completion_cost`'s own
    /// per-edge charge (no spatial cost at that edge, so the distance
    /// penalty is otherwise the same regardless of how much input was
    /// skipped).
    pub completion_penalty: f32,
    /// Scale applied to the raw compound distance before conversion to an
    /// integer score (mirrors `SUGGEST_INTERFACE_OUTPUT_SCALE`).
    pub output_score_scale: f32,
    /// Per-input-character budget the final score is measured against
    /// (mirrors `TYPING_MAX_OUTPUT_SCORE_PER_INPUT`).
    pub max_output_score_per_input: f32,
    /// Base score assigned to a zero-distance candidate before scaling
    /// (mirrors `TYPING_BASE_OUTPUT_SCORE`).
    pub base_output_score: f32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            node_pool_capacity: LARGE_NODE_POOL_CAPACITY,
            max_results: MAX_RESULTS,
            max_word_length: MAX_WORD_LENGTH,
            word_length_margin: WORD_LENGTH_MARGIN,
            cache_back_length: CACHE_BACK_LENGTH,
            min_continuous_suggestion_input_size: MIN_CONTINUOUS_SUGGESTION_INPUT_SIZE,
            bigram_cache_max_contexts: 24,

            // These five mirror the upstream typing_scoring.h promotions/
            // demotions; their concrete magnitudes live in scoring_params.h
            // upstream, which was not present in the retrieved source pack.
            // Chosen to preserve rank order (see DESIGN.md): exact > accent
            // error > case error > digraph, each clearing the next.
            exact_match_boost: 1000,
            perfect_match_boost: 400,
            accent_error_demotion: 100,
            case_error_demotion: 50,
            digraph_demotion: 150,
            force_commit_boost: 250,
            completion_penalty: 0.5,
            output_score_scale: 1_000_000.0,
            max_output_score_per_input: 1.0,
            base_output_score: 1.0,
        }
    }
}

impl DecoderConfig {
    /// Pool/queue capacity appropriate for a dictionary of the given size,
    /// per spec §5's 256 KiB threshold.
    pub fn capacity_for_dictionary_size(dictionary_size_bytes: u64) -> usize {
        if dictionary_size_bytes >= LARGE_DICTIONARY_SIZE_THRESHOLD_BYTES {
            LARGE_NODE_POOL_CAPACITY
        } else {
            SMALL_NODE_POOL_CAPACITY
        }
    }

    /// Build a config sized for a dictionary of the given byte size, with
    /// all other fields left at their defaults.
    pub fn for_dictionary_size(dictionary_size_bytes: u64) -> Self {
        Self {
            node_pool_capacity: Self::capacity_for_dictionary_size(dictionary_size_bytes),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Load configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let cfg = DecoderConfig::default();
        let s = cfg.to_toml_string().unwrap();
        let back = DecoderConfig::from_toml_str(&s).unwrap();
        assert_eq!(back.max_word_length, cfg.max_word_length);
        assert_eq!(back.node_pool_capacity, cfg.node_pool_capacity);
    }

    #[test]
    fn capacity_follows_size_threshold() {
        assert_eq!(
            DecoderConfig::capacity_for_dictionary_size(1024),
            SMALL_NODE_POOL_CAPACITY
        );
        assert_eq!(
            DecoderConfig::capacity_for_dictionary_size(1024 * 1024),
            LARGE_NODE_POOL_CAPACITY
        );
    }
}
