//! `Weighting`: the pluggable cost model (§4.6), plus its two concrete
//! policies, `TypingWeighting` and `GestureWeighting`. Grounded on
//! `typing_weighting.cpp`/`typing_scoring.h` for Typing; the Gesture policy
//! follows the same shape with the perpendicular-distance/direction-penalty
//! formulas spec.md §4.6 describes, since no gesture-specific C++ source
//! file was retrieved in the pack.
//!
//! Per Design Notes §9 ("friend access"), `DicNode::add_cost` and
//! `forward_input_index` are `pub(in crate::decoder)` rather than
//! `friend`-restricted to this file alone — Rust's nearest equivalent grants
//! access to the whole `decoder` module tree. By convention, only the
//! default methods below call them; `Traversal` only ever calls through the
//! `Weighting` trait.

use super::dic_node::DicNode;
use super::proximity::{GestureSample, ProximityState};
use super::types::{
    CodePoint, DoubleLetterLevel, ErrorType, ProximityType, TypingErrorClass,
    MAX_VALUE_FOR_WEIGHTING, NOT_A_PROBABILITY,
};

/// Per-edge cost function contract. Two concrete implementations are
/// required: [`TypingWeighting`] and [`GestureWeighting`].
pub trait Weighting {
    fn needs_to_normalize_compound_distance(&self) -> bool;

    /// `true` if `proximity_type` should count as a keyboard-proximity edge
    /// (as opposed to an outright substitution), affecting whether the
    /// edit or proximity counter advances.
    fn is_proximity_dic_node(&self, proximity_type: ProximityType) -> bool {
        matches!(proximity_type, ProximityType::Proximity | ProximityType::AdditionalProximity)
    }

    fn matched_cost(&self, proximity_type: ProximityType, input_index: usize, proximity: &dyn ProximityState) -> f32;
    fn additional_proximity_cost(&self) -> f32;
    fn substitution_cost(&self) -> f32;
    fn omission_cost(&self, is_intentional: bool) -> f32;
    /// Cost of omitting a trie code point that repeats the one just
    /// emitted (e.g. the second `l` of `hello` typed as `helo`) — cheaper
    /// than a generic omission per §4.6's "tolerate one fewer repeat than
    /// typed".
    fn double_letter_omission_cost(&self) -> f32 {
        self.omission_cost(false) * 0.5
    }
    fn insertion_cost(&self) -> f32;
    fn transposition_cost(&self) -> f32;
    fn completion_cost(&self) -> f32;
    fn terminal_insertion_cost(&self) -> f32;
    fn terminal_language_cost(&self, probability: i32) -> f32;
    fn terminal_spatial_cost(&self, child: &DicNode) -> f32;
    fn space_omission_cost(&self) -> f32;
    fn space_substitution_cost(&self) -> f32;
    fn new_word_bigram_language_cost(&self, probability: i32) -> f32;
    fn transition_cost(&self) -> f32;

    /// Typing-specific fine-grained classification used by `Scoring` to
    /// promote/demote a terminal (accent-only, case-only, digraph, clean
    /// match). Gesture has no such distinction and keeps the default.
    fn classify_error(&self, _primary_original: CodePoint, _primary: CodePoint, _child: CodePoint) -> TypingErrorClass {
        TypingErrorClass::Other
    }

    // --- Edge appliers: the only call sites for `DicNode::add_cost`/
    // `forward_input_index` in this crate. ---

    fn apply_match(
        &self,
        child: &mut DicNode,
        proximity_type: ProximityType,
        proximity: &dyn ProximityState,
        pointer_id: usize,
    ) {
        let input_index = child.input.input_index(pointer_id);
        let cost = self.matched_cost(proximity_type, input_index, proximity);
        let error_type = match proximity_type {
            ProximityType::Match => ErrorType::NotAnError,
            _ => ErrorType::ProximityCorrection,
        };
        child.add_cost(cost, 0.0, self.needs_to_normalize_compound_distance(), error_type);

        let primary = proximity.primary_code_point_at(input_index);
        let primary_original = proximity.primary_original_code_point_at(input_index);
        if let Some(&leading_cp) = child.output.last() {
            match self.classify_error(primary_original, primary, leading_cp) {
                TypingErrorClass::AccentError => child.scoring.had_accent_error = true,
                TypingErrorClass::CaseError => child.scoring.had_case_error = true,
                TypingErrorClass::CaseAndAccentError => {
                    child.scoring.had_accent_error = true;
                    child.scoring.had_case_error = true;
                }
                _ => {}
            }
        }

        child.forward_input_index(pointer_id, 1, Some(primary));
    }

    fn apply_additional_proximity(&self, child: &mut DicNode, proximity: &dyn ProximityState, pointer_id: usize) {
        let input_index = child.input.input_index(pointer_id);
        let cost = self.additional_proximity_cost();
        child.add_cost(cost, 0.0, self.needs_to_normalize_compound_distance(), ErrorType::ProximityCorrection);
        let emitted = proximity.primary_code_point_at(input_index);
        child.forward_input_index(pointer_id, 1, Some(emitted));
    }

    fn apply_substitution(&self, child: &mut DicNode, proximity: &dyn ProximityState, pointer_id: usize) {
        let input_index = child.input.input_index(pointer_id);
        let cost = self.substitution_cost();
        child.add_cost(cost, 0.0, self.needs_to_normalize_compound_distance(), ErrorType::EditCorrection);
        let emitted = proximity.primary_code_point_at(input_index);
        child.forward_input_index(pointer_id, 1, Some(emitted));
    }

    fn apply_omission(&self, child: &mut DicNode, is_intentional: bool, is_double_letter: bool) {
        let cost = if is_double_letter {
            self.double_letter_omission_cost()
        } else {
            self.omission_cost(is_intentional)
        };
        let error_type = if is_intentional { ErrorType::IntentionalOmission } else { ErrorType::EditCorrection };
        child.add_cost(cost, 0.0, self.needs_to_normalize_compound_distance(), error_type);
        if is_double_letter {
            merge_double_letter_level(child, DoubleLetterLevel::ADoubleLetter);
        }
    }

    fn apply_insertion(&self, child: &mut DicNode, pointer_id: usize) {
        let cost = self.insertion_cost();
        child.add_cost(cost, 0.0, self.needs_to_normalize_compound_distance(), ErrorType::EditCorrection);
        child.forward_input_index(pointer_id, 1, None);
    }

    fn apply_transposition(&self, child: &mut DicNode, proximity: &dyn ProximityState, pointer_id: usize) {
        let input_index = child.input.input_index(pointer_id);
        let cost = self.transposition_cost();
        child.add_cost(cost, 0.0, self.needs_to_normalize_compound_distance(), ErrorType::EditCorrection);
        let emitted = proximity.primary_code_point_at(input_index.saturating_add(1));
        child.forward_input_index(pointer_id, 2, Some(emitted));
    }

    fn apply_completion(&self, child: &mut DicNode) {
        let cost = self.completion_cost();
        child.add_cost(0.0, cost, self.needs_to_normalize_compound_distance(), ErrorType::Completion);
        child.scoring.had_completion = true;
    }

    /// Consume one raw input sample as half of a digraph's expansion
    /// (`expected` is the composite's first or second expansion letter, per
    /// `DigraphTable::expansion_at`). Verified against the actual sample
    /// rather than charged unconditionally: a mismatch is scored as a
    /// proximity correction or substitution like any other edge, instead of
    /// matching for free.
    fn apply_digraph(
        &self,
        child: &mut DicNode,
        pointer_id: usize,
        proximity: &dyn ProximityState,
        expected: CodePoint,
    ) {
        let input_index = child.input.input_index(pointer_id);
        let actual = proximity.primary_code_point_at(input_index);
        let (cost, error_type) = if actual == expected {
            (self.matched_cost(ProximityType::Match, input_index, proximity), ErrorType::NotAnError)
        } else {
            let check_proximity = proximity.touch_position_correction_enabled();
            match proximity.proximity_type(input_index, expected, check_proximity) {
                ProximityType::Proximity => {
                    (self.matched_cost(ProximityType::Proximity, input_index, proximity), ErrorType::ProximityCorrection)
                }
                _ => (self.substitution_cost(), ErrorType::EditCorrection),
            }
        };
        child.add_cost(cost, 0.0, self.needs_to_normalize_compound_distance(), error_type);
        child.forward_input_index(pointer_id, 1, Some(actual));
        child.scoring.digraph_index = child.scoring.digraph_index.advance();
        child.scoring.had_digraph = true;
    }

    fn apply_terminal(&self, child: &mut DicNode, combined_probability: i32) {
        let spatial = self.terminal_spatial_cost(child);
        let insertion = self.terminal_insertion_cost();
        let language = self.terminal_language_cost(combined_probability);
        child.add_cost(spatial + insertion, language, self.needs_to_normalize_compound_distance(), ErrorType::NotAnError);
    }

    /// Apply only the spatial cost of crossing a word boundary (whether a
    /// space was typed or omitted). The new word's own bigram-aware
    /// language cost is charged once, uniformly, when its terminal is
    /// reached via `apply_terminal` — `prev_word.terminal_pos` already
    /// carries the context needed to look up the bigram delta there, so
    /// charging a second language cost here would double-count it.
    fn apply_new_word(&self, child: &mut DicNode, is_space_omission: bool) {
        let spatial = if is_space_omission { self.space_omission_cost() } else { self.space_substitution_cost() };
        child.add_cost(spatial, 0.0, self.needs_to_normalize_compound_distance(), ErrorType::NewWord);
    }
}

/// Keyboard-typing cost model: spatial cost keyed off `ProximityType`,
/// language cost keyed off 8-bit unigram/bigram-combined probability.
/// Grounded on `typing_weighting.cpp`/`typing_scoring.h`.
#[derive(Debug, Clone)]
pub struct TypingWeighting {
    pub match_cost: f32,
    pub proximity_cost: f32,
    pub additional_proximity_cost: f32,
    pub substitution_cost: f32,
    pub omission_cost: f32,
    pub intentional_omission_cost: f32,
    pub insertion_cost: f32,
    pub transposition_cost: f32,
    pub completion_cost: f32,
    pub terminal_insertion_cost: f32,
    pub space_omission_cost: f32,
    pub space_substitution_cost: f32,
    pub max_probability: f32,
}

impl Default for TypingWeighting {
    fn default() -> Self {
        TypingWeighting {
            match_cost: 0.0,
            proximity_cost: 0.4,
            additional_proximity_cost: 0.8,
            substitution_cost: 1.0,
            omission_cost: 0.6,
            intentional_omission_cost: 0.0,
            insertion_cost: 1.0,
            transposition_cost: 1.0,
            completion_cost: 0.2,
            terminal_insertion_cost: 0.0,
            space_omission_cost: 0.5,
            space_substitution_cost: 1.0,
            max_probability: 255.0,
        }
    }
}

impl Weighting for TypingWeighting {
    fn needs_to_normalize_compound_distance(&self) -> bool {
        true
    }

    fn matched_cost(&self, proximity_type: ProximityType, _input_index: usize, _proximity: &dyn ProximityState) -> f32 {
        match proximity_type {
            ProximityType::Match => self.match_cost,
            ProximityType::Proximity => self.proximity_cost,
            ProximityType::AdditionalProximity => self.additional_proximity_cost,
            ProximityType::Substitution => self.substitution_cost,
            ProximityType::Unrelated => self.substitution_cost,
        }
    }

    fn additional_proximity_cost(&self) -> f32 {
        self.additional_proximity_cost
    }

    fn substitution_cost(&self) -> f32 {
        self.substitution_cost
    }

    fn omission_cost(&self, is_intentional: bool) -> f32 {
        if is_intentional {
            self.intentional_omission_cost
        } else {
            self.omission_cost
        }
    }

    fn insertion_cost(&self) -> f32 {
        self.insertion_cost
    }

    fn transposition_cost(&self) -> f32 {
        self.transposition_cost
    }

    fn completion_cost(&self) -> f32 {
        self.completion_cost
    }

    fn terminal_insertion_cost(&self) -> f32 {
        self.terminal_insertion_cost
    }

    fn terminal_language_cost(&self, probability: i32) -> f32 {
        if probability == NOT_A_PROBABILITY {
            return MAX_VALUE_FOR_WEIGHTING;
        }
        (self.max_probability - probability as f32) / self.max_probability
    }

    fn terminal_spatial_cost(&self, _child: &DicNode) -> f32 {
        0.0
    }

    fn space_omission_cost(&self) -> f32 {
        self.space_omission_cost
    }

    fn space_substitution_cost(&self) -> f32 {
        self.space_substitution_cost
    }

    fn new_word_bigram_language_cost(&self, probability: i32) -> f32 {
        self.terminal_language_cost(probability)
    }

    fn transition_cost(&self) -> f32 {
        0.0
    }

    fn classify_error(&self, primary_original: CodePoint, primary: CodePoint, child: CodePoint) -> TypingErrorClass {
        if child == primary_original {
            return TypingErrorClass::CleanMatch;
        }
        let case_differs = child.to_ascii_lowercase() == primary.to_ascii_lowercase()
            && child != primary
            && child.to_ascii_lowercase() == primary_original.to_ascii_lowercase();
        let accent_differs = strip_accent(child) == strip_accent(primary_original)
            && child != primary_original;
        match (case_differs, accent_differs) {
            (true, true) => TypingErrorClass::CaseAndAccentError,
            (true, false) => TypingErrorClass::CaseError,
            (false, true) => TypingErrorClass::AccentError,
            (false, false) => {
                if child == primary {
                    TypingErrorClass::CleanMatch
                } else {
                    TypingErrorClass::Proximity
                }
            }
        }
    }
}

/// Remove a single combining diacritic from a Latin letter by normalising
/// a small set of common accented code points to their base letter. A full
/// Unicode decomposition is unnecessary for the spatial keyboards this
/// crate targets.
fn strip_accent(cp: CodePoint) -> CodePoint {
    match cp {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

/// Swipe-gesture cost model: the matched cost is a perpendicular-distance
/// calculation against the sampled polyline, with a penalty for paths that
/// reverse direction relative to the key-to-key segment. Grounded on the
/// formulas of spec §4.6 (the corresponding upstream gesture weighting
/// source file was not present in the retrieved pack).
#[derive(Debug, Clone)]
pub struct GestureWeighting {
    pub base_match_cost: f32,
    pub reversal_penalty: f32,
    pub completion_cost: f32,
    pub max_probability: f32,
}

impl Default for GestureWeighting {
    fn default() -> Self {
        GestureWeighting {
            base_match_cost: 0.0,
            reversal_penalty: 0.5,
            completion_cost: 0.1,
            max_probability: 255.0,
        }
    }
}

impl GestureWeighting {
    /// Minimum perpendicular distance from `key` to the polyline segment
    /// between `samples[index]` and `samples[index + 1]`, plus a penalty
    /// proportional to how much the swipe reverses direction relative to
    /// the key-to-key segment (`dotDirection < 0`).
    pub fn matched_cost_for_segment(&self, key: (i32, i32), a: GestureSample, b: GestureSample) -> f32 {
        let (kx, ky) = (key.0 as f32, key.1 as f32);
        let (ax, ay) = (a.x as f32, a.y as f32);
        let (bx, by) = (b.x as f32, b.y as f32);
        let (sx, sy) = (bx - ax, by - ay);
        let seg_len_sq = (sx * sx + sy * sy).max(1e-6);
        let t = (((kx - ax) * sx + (ky - ay) * sy) / seg_len_sq).clamp(0.0, 1.0);
        let (px, py) = (ax + t * sx, ay + t * sy);
        let dist = ((kx - px).powi(2) + (ky - py).powi(2)).sqrt();

        let dot_direction = sx * (kx - ax) + sy * (ky - ay);
        let reversal = if dot_direction < 0.0 { self.reversal_penalty } else { 0.0 };

        self.base_match_cost + dist / 48.0 + reversal
    }

    /// Reject paths whose maximum sample deviation from the key-to-key line
    /// exceeds `86 * threshold_base`, where `threshold_base =
    /// most_common_key_width / 48`.
    pub fn exceeds_deviation_threshold(&self, max_sample_deviation: f32, most_common_key_width: i32) -> bool {
        let threshold_base = most_common_key_width as f32 / 48.0;
        max_sample_deviation > 86.0 * threshold_base
    }
}

impl Weighting for GestureWeighting {
    fn needs_to_normalize_compound_distance(&self) -> bool {
        true
    }

    fn matched_cost(&self, proximity_type: ProximityType, _input_index: usize, _proximity: &dyn ProximityState) -> f32 {
        match proximity_type {
            ProximityType::Match => self.base_match_cost,
            ProximityType::Proximity => self.base_match_cost + 0.3,
            ProximityType::AdditionalProximity => self.base_match_cost + 0.6,
            _ => self.base_match_cost + 1.0,
        }
    }

    fn additional_proximity_cost(&self) -> f32 {
        0.6
    }

    fn substitution_cost(&self) -> f32 {
        1.0
    }

    fn omission_cost(&self, is_intentional: bool) -> f32 {
        if is_intentional {
            0.0
        } else {
            0.4
        }
    }

    fn insertion_cost(&self) -> f32 {
        0.4
    }

    fn transposition_cost(&self) -> f32 {
        0.8
    }

    fn completion_cost(&self) -> f32 {
        self.completion_cost
    }

    fn terminal_insertion_cost(&self) -> f32 {
        0.0
    }

    fn terminal_language_cost(&self, probability: i32) -> f32 {
        if probability == NOT_A_PROBABILITY {
            return MAX_VALUE_FOR_WEIGHTING;
        }
        (self.max_probability - probability as f32) / self.max_probability
    }

    fn terminal_spatial_cost(&self, _child: &DicNode) -> f32 {
        0.0
    }

    fn space_omission_cost(&self) -> f32 {
        0.4
    }

    fn space_substitution_cost(&self) -> f32 {
        0.9
    }

    fn new_word_bigram_language_cost(&self, probability: i32) -> f32 {
        self.terminal_language_cost(probability)
    }

    fn transition_cost(&self) -> f32 {
        0.0
    }
}

/// Merge a newly observed double-letter level into scoring state, never
/// downgrading from "strong" (used when the traversal detects a repeated
/// code point at the current depth).
pub fn merge_double_letter_level(child: &mut DicNode, level: DoubleLetterLevel) {
    child.scoring.double_letter_level = child.scoring.double_letter_level.advance(level);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::proximity::{GridProximityState, Key, KeyGrid};

    fn grid() -> GridProximityState {
        let keys = KeyGrid::new(vec![
            Key { code_point: 'h', x: 0, y: 0, width: 10, height: 10 },
            Key { code_point: 'e', x: 10, y: 0, width: 10, height: 10 },
            Key { code_point: 'l', x: 20, y: 0, width: 10, height: 10 },
            Key { code_point: 'o', x: 30, y: 0, width: 10, height: 10 },
            Key { code_point: 'p', x: 40, y: 0, width: 10, height: 10 },
        ]);
        GridProximityState::new(keys, vec!['h', 'e', 'l', 'l', 'p'])
    }

    #[test]
    fn clean_match_sets_not_an_error_and_keeps_exact_match() {
        let w = TypingWeighting::default();
        let proximity = grid();
        let mut child = DicNode::default();
        child.init_as_root(0, super::super::types::NOT_A_DICT_POS);
        w.apply_match(&mut child, ProximityType::Match, &proximity, 0);
        assert!(child.scoring.exact_match);
        assert_eq!(child.scoring.edit_correction_count, 0);
        assert_eq!(child.scoring.proximity_correction_count, 0);
    }

    #[test]
    fn proximity_match_increments_proximity_counter_only() {
        let w = TypingWeighting::default();
        let proximity = grid();
        let mut child = DicNode::default();
        child.init_as_root(0, super::super::types::NOT_A_DICT_POS);
        // pointer already at index 4 ('p'), matching 'o' as a proximity edge.
        child.forward_input_index(0, 4, None);
        w.apply_match(&mut child, ProximityType::Proximity, &proximity, 0);
        assert!(!child.scoring.exact_match);
        assert_eq!(child.scoring.proximity_correction_count, 1);
        assert_eq!(child.scoring.edit_correction_count, 0);
    }

    #[test]
    fn omission_increments_edit_counter() {
        let w = TypingWeighting::default();
        let mut child = DicNode::default();
        child.init_as_root(0, super::super::types::NOT_A_DICT_POS);
        w.apply_omission(&mut child, false, false);
        assert_eq!(child.scoring.edit_correction_count, 1);
        assert!(!child.scoring.exact_match);
    }

    #[test]
    fn double_letter_omission_is_cheaper_and_advances_the_level() {
        let w = TypingWeighting::default();
        let mut plain = DicNode::default();
        plain.init_as_root(0, super::super::types::NOT_A_DICT_POS);
        w.apply_omission(&mut plain, false, false);

        let mut doubled = DicNode::default();
        doubled.init_as_root(0, super::super::types::NOT_A_DICT_POS);
        w.apply_omission(&mut doubled, false, true);

        assert!(doubled.scoring.spatial_distance < plain.scoring.spatial_distance);
        assert_eq!(doubled.scoring.double_letter_level, DoubleLetterLevel::ADoubleLetter);
        assert_eq!(plain.scoring.double_letter_level, DoubleLetterLevel::NotADoubleLetter);
    }

    #[test]
    fn missing_probability_is_unweighable() {
        let w = TypingWeighting::default();
        assert_eq!(w.terminal_language_cost(NOT_A_PROBABILITY), MAX_VALUE_FOR_WEIGHTING);
    }
}
