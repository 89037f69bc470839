//! `DicNode`: one state in the beam.
//!
//! Grounded on `dic_node.h`/`dic_node_state*.h` in the source, restructured
//! from virtual-inheritance C++ state objects into plain Rust field groups.
//! `add_cost` and `forward_input_index` are restricted to `pub(in
//! crate::decoder)` rather than a C++ `friend` declaration, so only
//! `Weighting` implementations elsewhere in this module tree may mutate
//! scoring/input state directly; external callers only get the getters.

use std::cmp::Ordering;

use super::types::{
    CodePoint, DigraphIndex, DoubleLetterLevel, ErrorType, TriePos, MAX_VALUE_FOR_WEIGHTING,
    NOT_A_DICT_POS,
};

/// Previous committed word(s) carried as context for bigram scoring once the
/// node has crossed a word boundary.
#[derive(Debug, Clone, Default)]
pub struct PrevWordContext {
    /// Code points of the most recently committed word (no trailing space).
    pub code_points: Vec<CodePoint>,
    /// Trie position of that word's terminal PtNode, used for bigram lookup.
    pub terminal_pos: TriePos,
    /// Number of words committed so far in this candidate.
    pub word_count: u32,
    /// Input index at which the *current* word begins (the "second word
    /// first input index" of spec §8 scenario 5).
    pub current_word_first_input_index: usize,
}

impl PrevWordContext {
    fn init(&mut self) {
        self.code_points.clear();
        self.terminal_pos = NOT_A_DICT_POS;
        self.word_count = 0;
        self.current_word_first_input_index = 0;
    }
}

/// Per-pointer input consumption state. Most typing/gesture sessions use a
/// single pointer (index 0); the vector form generalises to multi-touch
/// without special-casing the common case.
#[derive(Debug, Clone)]
pub struct InputState {
    input_index: Vec<usize>,
    prev_code_point: Vec<Option<CodePoint>>,
    /// Last raw geometric path length consumed, for gesture mode scoring.
    pub last_raw_length: f32,
}

impl Default for InputState {
    fn default() -> Self {
        InputState { input_index: vec![0], prev_code_point: vec![None], last_raw_length: 0.0 }
    }
}

impl InputState {
    fn init(&mut self) {
        for i in &mut self.input_index {
            *i = 0;
        }
        for p in &mut self.prev_code_point {
            *p = None;
        }
        self.last_raw_length = 0.0;
    }

    pub fn input_index(&self, pointer_id: usize) -> usize {
        self.input_index.get(pointer_id).copied().unwrap_or(0)
    }

    pub fn prev_code_point(&self, pointer_id: usize) -> Option<CodePoint> {
        self.prev_code_point.get(pointer_id).copied().flatten()
    }

    fn ensure_pointer(&mut self, pointer_id: usize) {
        if pointer_id >= self.input_index.len() {
            self.input_index.resize(pointer_id + 1, 0);
            self.prev_code_point.resize(pointer_id + 1, None);
        }
    }
}

/// Accumulated distances, error counters, and auxiliary scoring flags.
#[derive(Debug, Clone)]
pub struct ScoringState {
    pub spatial_distance: f32,
    pub language_distance: f32,
    pub normalized_compound_distance: f32,
    pub raw_length: f32,
    pub edit_correction_count: u16,
    pub proximity_correction_count: u16,
    pub exact_match: bool,
    pub digraph_index: DigraphIndex,
    pub double_letter_level: DoubleLetterLevel,
    /// Set once any edge along this path was classified as an accent-only
    /// difference from the original input (§4.6); read by `Scoring` to
    /// demote the terminal.
    pub had_accent_error: bool,
    /// Set once any edge along this path was classified as a case-only
    /// difference; read by `Scoring` to demote the terminal.
    pub had_case_error: bool,
    /// Set once a digraph edge was taken anywhere along this path; read by
    /// `Scoring` to demote the terminal and to gate `perfect_match_boost`.
    pub had_digraph: bool,
    /// Set once a `COMPLETION` edge was taken (input exhausted, remaining
    /// code points emitted free of spatial cost); read by `Scoring`.
    pub had_completion: bool,
    /// Snapshot of `normalized_compound_distance` taken right after the
    /// first word completes, used by space-aware gesture confidence.
    pub normalized_compound_distance_after_first_word: f32,
}

impl Default for ScoringState {
    fn default() -> Self {
        ScoringState {
            spatial_distance: 0.0,
            language_distance: 0.0,
            normalized_compound_distance: 0.0,
            raw_length: 0.0,
            edit_correction_count: 0,
            proximity_correction_count: 0,
            exact_match: true,
            digraph_index: DigraphIndex::NotADigraph,
            double_letter_level: DoubleLetterLevel::NotADoubleLetter,
            had_accent_error: false,
            had_case_error: false,
            had_digraph: false,
            had_completion: false,
            normalized_compound_distance_after_first_word: MAX_VALUE_FOR_WEIGHTING,
        }
    }
}

impl ScoringState {
    fn init(&mut self) {
        *self = ScoringState::default();
    }

    fn init_from_parent_for_new_word(&mut self, parent: &ScoringState) {
        *self = parent.clone();
        self.save_normalized_compound_distance_after_first_word_if_none_yet();
    }

    fn save_normalized_compound_distance_after_first_word_if_none_yet(&mut self) {
        if self.normalized_compound_distance_after_first_word >= MAX_VALUE_FOR_WEIGHTING {
            self.normalized_compound_distance_after_first_word = self.normalized_compound_distance;
        }
    }

    fn add_distance(&mut self, spatial: f32, language: f32, do_normalize: bool, total_input_index: usize) {
        self.spatial_distance += spatial;
        self.language_distance += language;
        self.normalized_compound_distance = if do_normalize {
            (self.spatial_distance + self.language_distance) / (total_input_index.max(1) as f32)
        } else {
            self.spatial_distance + self.language_distance
        };
    }
}

/// One state in the beam: a position in the trie plus everything needed to
/// score and, if terminal, emit the partial word that got it there.
#[derive(Debug, Clone)]
pub struct DicNode {
    /// Set by `NodePool::acquire`; doubles as the deterministic tie-break in
    /// `compare` and as the pool's own used/unused bookkeeping key.
    pub(crate) slot_id: u32,
    /// Whether this slot currently holds a live candidate. Mirrors the
    /// source's `DicNode::isUsed()`, tracked here rather than solely in the
    /// pool's free list so the comparator can read it without indirection.
    pub(crate) used: bool,

    pub pos: TriePos,
    pub children_pos: TriePos,
    pub depth: u16,
    pub leaving_depth: u16,
    /// Index already consumed into the current PtNode's merged code-point
    /// run (`0` right after `init_as_child`). Lets `Traversal` ask
    /// `DictPolicy::merged_code_point_at` for the next one without
    /// recomputing it from `depth`/`leaving_depth`.
    pub merged_index: u16,
    pub is_terminal: bool,
    pub has_children: bool,
    pub is_blacklisted: bool,
    pub probability: i32,

    pub output: Vec<CodePoint>,
    pub prev_word: PrevWordContext,
    pub input: InputState,
    pub scoring: ScoringState,
}

impl Default for DicNode {
    fn default() -> Self {
        DicNode {
            slot_id: 0,
            used: false,
            pos: NOT_A_DICT_POS,
            children_pos: NOT_A_DICT_POS,
            depth: 0,
            leaving_depth: 0,
            merged_index: 0,
            is_terminal: false,
            has_children: false,
            is_blacklisted: false,
            probability: 0,
            output: Vec::new(),
            prev_word: PrevWordContext::default(),
            input: InputState::default(),
            scoring: ScoringState::default(),
        }
    }
}

impl DicNode {
    /// True once `depth` has caught up to `leaving_depth`: the node has
    /// consumed all merged code points of its current PtNode and is ready
    /// to descend to children.
    pub fn is_leaving_node(&self) -> bool {
        self.depth == self.leaving_depth
    }

    /// Input index of the primary pointer (pointer 0), the value most
    /// pruning and normalisation decisions key off.
    pub fn total_input_index(&self) -> usize {
        self.input.input_index(0)
    }

    pub fn is_exact_match(&self) -> bool {
        self.scoring.exact_match
    }

    pub fn has_multiple_words(&self) -> bool {
        self.prev_word.word_count > 0
    }

    pub fn second_word_first_input_index(&self) -> usize {
        self.prev_word.current_word_first_input_index
    }

    /// Reinitialise this slot as a fresh root node at the start of a
    /// decoding call (or the first word of one).
    pub fn init_as_root(&mut self, root_pos: TriePos, prev_word_terminal_pos: TriePos) {
        self.pos = root_pos;
        self.children_pos = root_pos;
        self.depth = 0;
        self.leaving_depth = 0;
        self.merged_index = 0;
        self.is_terminal = false;
        self.has_children = true;
        self.is_blacklisted = false;
        self.probability = super::types::NOT_A_PROBABILITY;
        self.output.clear();
        self.prev_word.init();
        self.prev_word.terminal_pos = prev_word_terminal_pos;
        self.input.init();
        self.scoring.init();
    }

    /// Reinitialise this slot as a new root carrying `parent`'s output as
    /// previous-word context (space-omission/space-substitution edge).
    pub fn init_as_root_with_previous_word(&mut self, parent: &DicNode, root_pos: TriePos) {
        let word_count = parent.prev_word.word_count + 1;
        let current_word_first_input_index = parent.total_input_index();
        let terminal_pos = parent.pos;

        self.pos = root_pos;
        self.children_pos = root_pos;
        self.depth = 0;
        self.leaving_depth = 0;
        self.merged_index = 0;
        self.is_terminal = false;
        self.has_children = true;
        self.is_blacklisted = false;
        self.probability = super::types::NOT_A_PROBABILITY;
        self.output.clear();

        self.prev_word.code_points = parent.output.clone();
        self.prev_word.terminal_pos = terminal_pos;
        self.prev_word.word_count = word_count;
        self.prev_word.current_word_first_input_index = current_word_first_input_index;

        self.input = parent.input.clone();
        self.scoring.init_from_parent_for_new_word(&parent.scoring);
    }

    /// Advance depth by one within the same PtNode's merged code-point
    /// chunk; everything else (output, scoring, input) is inherited as-is.
    pub fn init_as_passing_child(&mut self, parent: &DicNode) {
        self.copy_from(parent);
        self.depth = parent.depth + 1;
        self.merged_index = parent.merged_index + 1;
        debug_assert!(self.depth <= self.leaving_depth);
    }

    /// Step into a genuinely new child PtNode, appending its leading code
    /// point to the output buffer.
    pub fn init_as_child(
        &mut self,
        parent: &DicNode,
        pos: TriePos,
        children_pos: TriePos,
        probability: i32,
        is_terminal: bool,
        has_children: bool,
        is_blacklisted: bool,
        merged_code_points: &[CodePoint],
    ) {
        self.copy_from(parent);
        self.pos = pos;
        self.children_pos = children_pos;
        self.depth = parent.depth + 1;
        self.leaving_depth = self.depth + merged_code_points.len().saturating_sub(1) as u16;
        self.is_terminal = is_terminal;
        self.has_children = has_children;
        self.is_blacklisted = is_blacklisted;
        self.probability = probability;
        if let Some(&first) = merged_code_points.first() {
            self.output.push(first);
        }
        debug_assert!(self.output.len() <= super::types::MAX_WORD_LENGTH);
    }

    fn copy_from(&mut self, other: &DicNode) {
        let slot_id = self.slot_id;
        let used = self.used;
        *self = other.clone();
        self.slot_id = slot_id;
        self.used = used;
    }

    /// Push the code point at `output[depth]` when descending further into
    /// an already-entered PtNode's merged run (called once per step by the
    /// traversal when `init_as_passing_child` advances depth without a new
    /// PtNode boundary, and the caller knows the next merged code point).
    pub fn push_passing_code_point(&mut self, cp: CodePoint) {
        self.output.push(cp);
        debug_assert!(self.output.len() <= super::types::MAX_WORD_LENGTH);
    }

    /// Restricted to `Weighting` implementations: apply an edge's cost.
    pub(in crate::decoder) fn add_cost(
        &mut self,
        spatial: f32,
        language: f32,
        do_normalize: bool,
        error_type: ErrorType,
    ) {
        let total_input_index = self.total_input_index();
        self.scoring.add_distance(spatial, language, do_normalize, total_input_index);
        match error_type {
            ErrorType::EditCorrection => {
                self.scoring.edit_correction_count += 1;
                self.scoring.exact_match = false;
            }
            ErrorType::ProximityCorrection => {
                self.scoring.proximity_correction_count += 1;
                self.scoring.exact_match = false;
            }
            ErrorType::Completion | ErrorType::NewWord | ErrorType::IntentionalOmission => {
                self.scoring.exact_match = false;
            }
            ErrorType::NotAnError => {}
        }
    }

    /// Restricted to `Weighting` implementations: advance a pointer's input
    /// cursor, optionally recording the emitted code point.
    pub(in crate::decoder) fn forward_input_index(
        &mut self,
        pointer_id: usize,
        count: usize,
        overwrite_prev_code_point: Option<CodePoint>,
    ) {
        self.input.ensure_pointer(pointer_id);
        self.input.input_index[pointer_id] += count;
        if let Some(cp) = overwrite_prev_code_point {
            self.input.prev_code_point[pointer_id] = Some(cp);
        }
    }

    /// Total order used by the priority queue: `Less` means `self` wins
    /// (sorts earlier / is the stronger candidate); `Greater` means `self`
    /// is worse. A `BinaryHeap<DicNode>` using this `Ord` therefore pops the
    /// *worst* admissible node first, exactly the node a bounded queue must
    /// evict to make room (spec §4.1/§4.2).
    fn order(&self, other: &DicNode) -> Ordering {
        match (self.used, other.used) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => return self.slot_id.cmp(&other.slot_id),
            (true, true) => {}
        }
        match (self.scoring.exact_match, other.scoring.exact_match) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        let dist_order = self
            .scoring
            .normalized_compound_distance
            .total_cmp(&other.scoring.normalized_compound_distance);
        if dist_order != Ordering::Equal {
            return dist_order;
        }
        let depth_order = other.depth.cmp(&self.depth);
        if depth_order != Ordering::Equal {
            return depth_order;
        }
        let word_order = self.output.cmp(&other.output);
        if word_order != Ordering::Equal {
            return word_order;
        }
        self.slot_id.cmp(&other.slot_id)
    }

    /// `true` iff `self` wins over `other` under the total order of §4.1.
    pub fn compare(&self, other: &DicNode) -> bool {
        self.order(other) == Ordering::Less
    }
}

impl PartialEq for DicNode {
    fn eq(&self, other: &Self) -> bool {
        self.order(other) == Ordering::Equal
    }
}

impl Eq for DicNode {}

impl PartialOrd for DicNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.order(other))
    }
}

impl Ord for DicNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn node_with(slot_id: u32, used: bool, dist: f32, depth: u16, exact: bool) -> DicNode {
        let mut n = DicNode::default();
        n.slot_id = slot_id;
        n.used = used;
        n.scoring.normalized_compound_distance = dist;
        n.depth = depth;
        n.scoring.exact_match = exact;
        n
    }

    #[test]
    fn unused_sorts_worse_than_used() {
        let used = node_with(0, true, 5.0, 1, false);
        let unused = node_with(1, false, 0.0, 0, false);
        assert!(used.compare(&unused));
        assert!(!unused.compare(&used));
    }

    #[test]
    fn exact_match_wins_over_larger_distance_mismatch() {
        let exact = node_with(0, true, 10.0, 1, true);
        let fuzzy = node_with(1, true, 1.0, 1, false);
        assert!(exact.compare(&fuzzy));
    }

    #[test]
    fn smaller_distance_wins_among_equal_exactness() {
        let better = node_with(0, true, 1.0, 1, false);
        let worse = node_with(1, true, 2.0, 1, false);
        assert!(better.compare(&worse));
        assert!(!worse.compare(&better));
    }

    #[test]
    fn greater_depth_wins_on_distance_tie() {
        let deeper = node_with(0, true, 1.0, 3, false);
        let shallower = node_with(1, true, 1.0, 1, false);
        assert!(deeper.compare(&shallower));
    }

    #[test]
    fn order_is_antisymmetric_and_total() {
        let a = node_with(0, true, 1.0, 2, true);
        let b = node_with(1, true, 1.0, 2, true);
        let ord_ab = a.order(&b);
        let ord_ba = b.order(&a);
        assert_eq!(ord_ab, ord_ba.reverse());
    }

    proptest::proptest! {
        /// Spec §8 invariant 4: for any two nodes the order is total
        /// (every pair compares) and antisymmetric (swapping the operands
        /// reverses the verdict), however their fields are chosen.
        #[test]
        fn order_is_antisymmetric_and_total_for_arbitrary_nodes(
            used_a in any::<bool>(), used_b in any::<bool>(),
            exact_a in any::<bool>(), exact_b in any::<bool>(),
            dist_a in 0.0f32..10.0, dist_b in 0.0f32..10.0,
            depth_a in 0u16..10, depth_b in 0u16..10,
            slot_a in 0u32..10, slot_b in 0u32..10,
        ) {
            let a = node_with(slot_a, used_a, dist_a, depth_a, exact_a);
            let b = node_with(slot_b, used_b, dist_b, depth_b, exact_b);
            let ord_ab = a.order(&b);
            let ord_ba = b.order(&a);
            prop_assert_eq!(ord_ab, ord_ba.reverse());
            prop_assert!(!(a.compare(&b) && b.compare(&a)));
        }
    }
}
