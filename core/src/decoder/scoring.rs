//! `Scoring`: converts a terminal `DicNode`'s accumulated distances into a
//! final ranked score, and decides when a partial first word is confident
//! enough to auto-commit. Grounded on `scoring.cpp`/`scoring.h`.

use super::config::DecoderConfig;
use super::dic_node::DicNode;
use super::types::{
    SuggestionKind, FIRST_WORD_CONFIDENCE_AUTOCOMMIT_THRESHOLD, NOT_A_FIRST_WORD_CONFIDENCE,
};

/// Policy seam for converting beam-search distances into output scores.
pub trait Scoring {
    /// Final integer score for a drained terminal node, used to rank the
    /// output list (§4.7; highest score first). `force_commit` is set for
    /// the top suggestion of a multi-word candidate the caller has decided
    /// to auto-correct to even though it isn't the single highest-scoring
    /// candidate overall (`auto_corrects_to_multi_word_suggestion_if_top`).
    fn calculate_final_score(
        &self,
        node: &DicNode,
        input_size: usize,
        config: &DecoderConfig,
        force_commit: bool,
    ) -> i32;

    /// `NOT_A_FIRST_WORD_CONFIDENCE` until a candidate has completed at
    /// least one word (crossed a space); otherwise a value in
    /// `0..=FIRST_WORD_CONFIDENCE_AUTOCOMMIT_THRESHOLD` estimating how
    /// likely the first word is correct, for continuous-suggestion
    /// auto-commit (spec §4.1 `normalizedCompoundDistanceAfterFirstWord`).
    fn compute_first_word_confidence(&self, node: &DicNode) -> i32;

    /// `true` if a multi-word correction is allowed to auto-correct even
    /// when it isn't the single highest-scoring candidate overall, as long
    /// as it's the top multi-word candidate.
    fn auto_corrects_to_multi_word_suggestion_if_top(&self) -> bool;

    /// `true` if a candidate exactly matching a dictionary word (as opposed
    /// to a corrected candidate) is eligible for auto-correct promotion.
    fn does_auto_correct_valid_word(&self) -> bool;

    /// Given the ranked candidate list, pick an alternate index to promote
    /// ahead of `top` when some other candidate is both an exact
    /// dictionary match and within a small distance of `top`'s own score —
    /// guards against a corrected-but-wrong suggestion outranking a cheap,
    /// exact, probable alternative. Returns `None` to keep `top` as is.
    fn safety_net_for_most_probable_string(&self, top_index: usize, candidates: &[DicNode]) -> Option<usize>;

    fn suggestion_kind_for(&self, node: &DicNode, has_shortcut: bool) -> SuggestionKind {
        if has_shortcut {
            SuggestionKind::Shortcut
        } else if node.is_exact_match() {
            SuggestionKind::Whitelist
        } else {
            SuggestionKind::Correction
        }
    }
}

/// Default scoring policy shared by both Typing and Gesture sessions —
/// upstream keeps a single `Scoring` implementation regardless of input
/// type, deferring all input-specific cost shaping to `Weighting`.
#[derive(Debug, Clone)]
pub struct DefaultScoring {
    pub auto_correct_valid_words: bool,
    pub auto_correct_multi_word_if_top: bool,
    /// Distance slack the safety net tolerates before it stops considering
    /// an alternate candidate "close enough" to the top one.
    pub safety_net_distance_slack: f32,
}

impl Default for DefaultScoring {
    fn default() -> Self {
        DefaultScoring {
            auto_correct_valid_words: false,
            auto_correct_multi_word_if_top: true,
            safety_net_distance_slack: 0.05,
        }
    }
}

impl Scoring for DefaultScoring {
    fn calculate_final_score(
        &self,
        node: &DicNode,
        input_size: usize,
        config: &DecoderConfig,
        force_commit: bool,
    ) -> i32 {
        if input_size == 0 {
            return 0;
        }

        // `completion_penalty` widens the distance exactly like a per-edge
        // Weighting cost would, for the one edge type (COMPLETION) whose
        // cost is otherwise the same regardless of how much input remained.
        let mut distance = node.scoring.normalized_compound_distance.max(0.0);
        if node.scoring.had_completion {
            distance += config.completion_penalty;
        }
        let fraction = (config.base_output_score / (1.0 + distance)).min(config.max_output_score_per_input);
        let mut score = fraction * config.output_score_scale;

        if node.is_exact_match() {
            score += config.exact_match_boost as f32;
            // A digraph edge can still be exact (it matched the raw input
            // samples cleanly) but isn't a *perfect* match: it took a
            // composite-letter shortcut rather than a direct trie match.
            if !node.scoring.had_digraph {
                score += config.perfect_match_boost as f32;
            }
        }
        if node.scoring.had_accent_error {
            score -= config.accent_error_demotion as f32;
        }
        if node.scoring.had_case_error {
            score -= config.case_error_demotion as f32;
        }
        if node.scoring.had_digraph {
            score -= config.digraph_demotion as f32;
        }
        if force_commit {
            score += config.force_commit_boost as f32;
        }

        // A long run of edit corrections on a short word is less trustworthy
        // than the same count on a long one.
        let edits = node.scoring.edit_correction_count as f32;
        if edits > 0.0 {
            score *= (1.0 - (edits / input_size.max(1) as f32) * 0.3).max(0.1);
        }

        score.max(0.0) as i32
    }

    fn compute_first_word_confidence(&self, node: &DicNode) -> i32 {
        if !node.has_multiple_words() {
            return NOT_A_FIRST_WORD_CONFIDENCE;
        }
        let distance = node
            .scoring
            .normalized_compound_distance_after_first_word
            .min(1.0)
            .max(0.0);
        let confidence = (1.0 - distance) * FIRST_WORD_CONFIDENCE_AUTOCOMMIT_THRESHOLD as f32;
        confidence as i32
    }

    fn auto_corrects_to_multi_word_suggestion_if_top(&self) -> bool {
        self.auto_correct_multi_word_if_top
    }

    fn does_auto_correct_valid_word(&self) -> bool {
        self.auto_correct_valid_words
    }

    fn safety_net_for_most_probable_string(&self, top_index: usize, candidates: &[DicNode]) -> Option<usize> {
        let top = candidates.get(top_index)?;
        if top.is_exact_match() {
            return None;
        }
        let top_distance = top.scoring.normalized_compound_distance;
        candidates
            .iter()
            .enumerate()
            .filter(|(i, c)| *i != top_index && c.is_exact_match())
            .filter(|(_, c)| c.scoring.normalized_compound_distance <= top_distance + self.safety_net_distance_slack)
            .min_by(|(_, a), (_, b)| {
                a.scoring
                    .normalized_compound_distance
                    .total_cmp(&b.scoring.normalized_compound_distance)
            })
            .map(|(i, _)| i)
    }
}

/// Threshold above which `compute_first_word_confidence` should trigger a
/// continuous-suggestion auto-commit of the first word.
pub fn should_auto_commit_first_word(confidence: i32) -> bool {
    confidence != NOT_A_FIRST_WORD_CONFIDENCE && confidence >= FIRST_WORD_CONFIDENCE_AUTOCOMMIT_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::types::NOT_A_DICT_POS;

    fn terminal(distance: f32, exact: bool, edits: u16) -> DicNode {
        let mut n = DicNode::default();
        n.init_as_root(0, NOT_A_DICT_POS);
        n.scoring.normalized_compound_distance = distance;
        n.scoring.exact_match = exact;
        n.scoring.edit_correction_count = edits;
        n
    }

    #[test]
    fn exact_match_outscores_corrected_candidate_at_equal_distance() {
        let scoring = DefaultScoring::default();
        let config = DecoderConfig::default();
        let exact = terminal(0.1, true, 0);
        let corrected = terminal(0.1, false, 1);
        let exact_score = scoring.calculate_final_score(&exact, 5, &config, false);
        let corrected_score = scoring.calculate_final_score(&corrected, 5, &config, false);
        assert!(exact_score > corrected_score);
    }

    #[test]
    fn force_commit_boosts_a_multi_word_top_suggestion() {
        let scoring = DefaultScoring::default();
        let config = DecoderConfig::default();
        let node = terminal(0.1, true, 0);
        let plain = scoring.calculate_final_score(&node, 5, &config, false);
        let forced = scoring.calculate_final_score(&node, 5, &config, true);
        assert_eq!(forced - plain, config.force_commit_boost);
    }

    #[test]
    fn accent_and_case_errors_demote_an_otherwise_exact_match() {
        let scoring = DefaultScoring::default();
        let config = DecoderConfig::default();
        let clean = terminal(0.1, true, 0);

        let mut accented = terminal(0.1, true, 0);
        accented.scoring.had_accent_error = true;
        let mut cased = terminal(0.1, true, 0);
        cased.scoring.had_case_error = true;

        let clean_score = scoring.calculate_final_score(&clean, 5, &config, false);
        let accented_score = scoring.calculate_final_score(&accented, 5, &config, false);
        let cased_score = scoring.calculate_final_score(&cased, 5, &config, false);
        assert!(accented_score < clean_score);
        assert!(cased_score < clean_score);
    }

    #[test]
    fn digraph_use_clears_the_perfect_match_boost() {
        let scoring = DefaultScoring::default();
        let config = DecoderConfig::default();
        let clean = terminal(0.1, true, 0);
        let mut via_digraph = terminal(0.1, true, 0);
        via_digraph.scoring.had_digraph = true;

        let clean_score = scoring.calculate_final_score(&clean, 5, &config, false);
        let digraph_score = scoring.calculate_final_score(&via_digraph, 5, &config, false);
        assert!(digraph_score < clean_score);
    }

    #[test]
    fn no_completed_word_has_no_first_word_confidence() {
        let scoring = DefaultScoring::default();
        let node = terminal(0.0, true, 0);
        assert_eq!(scoring.compute_first_word_confidence(&node), NOT_A_FIRST_WORD_CONFIDENCE);
    }

    #[test]
    fn completed_first_word_with_small_distance_is_highly_confident() {
        let scoring = DefaultScoring::default();
        let mut node = terminal(0.0, true, 0);
        node.prev_word.word_count = 1;
        node.scoring.normalized_compound_distance_after_first_word = 0.0;
        let confidence = scoring.compute_first_word_confidence(&node);
        assert!(should_auto_commit_first_word(confidence));
    }

    #[test]
    fn safety_net_promotes_close_exact_alternative() {
        let scoring = DefaultScoring::default();
        let top = terminal(0.2, false, 2);
        let alt = terminal(0.22, true, 0);
        let candidates = vec![top, alt];
        assert_eq!(scoring.safety_net_for_most_probable_string(0, &candidates), Some(1));
    }

    #[test]
    fn safety_net_leaves_exact_top_alone() {
        let scoring = DefaultScoring::default();
        let top = terminal(0.1, true, 0);
        let other = terminal(0.3, true, 0);
        let candidates = vec![top, other];
        assert_eq!(scoring.safety_net_for_most_probable_string(0, &candidates), None);
    }
}
