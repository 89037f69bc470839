//! `Traversal`: the beam-expansion loop (component G), grounded on
//! `Suggest::expandCurrentDicNodes`/`processExpandedDicNode` in
//! `suggest.cpp` and the edge dispatch described in spec §4.4/§4.5. Kept as
//! free functions rather than a struct so `DecodeSession::decode` can pass
//! its queues, policies and config through explicitly instead of juggling
//! split borrows of `self`.

use super::bigram_cache::BigramCache;
use super::config::DecoderConfig;
use super::dic_node::DicNode;
use super::dict_policy::{ChildInfo, DictPolicy};
use super::digraph::DigraphTable;
use super::node_cache::NodeCache;
use super::proximity::ProximityState;
use super::types::{CodePoint, DigraphIndex, ProximityType, MAX_VALUE_FOR_WEIGHTING};
use super::weighting::Weighting;

/// One full `expandCurrentDicNodes` pass: drain `active` entirely, pushing
/// every resulting candidate into `nextActive`/`terminals`/`continuation`.
/// Each popped node is expanded exactly once; forking (omission, insertion,
/// transposition, space edges, digraphs) happens inside [`expand_one`].
pub fn expand_current_dic_nodes<D: DictPolicy, W: Weighting>(
    cache: &mut NodeCache,
    bigram_cache: &mut BigramCache,
    dict: &D,
    weighting: &W,
    digraphs: &DigraphTable,
    config: &DecoderConfig,
    proximity: &dyn ProximityState,
    input_size: usize,
    allow_corrections: bool,
) {
    while let Some(node) = cache.pop_active() {
        expand_one(
            node,
            cache,
            bigram_cache,
            dict,
            weighting,
            digraphs,
            config,
            proximity,
            input_size,
            allow_corrections,
        );
    }
}

fn should_prune(node: &DicNode, config: &DecoderConfig) -> bool {
    node.scoring.normalized_compound_distance >= MAX_VALUE_FOR_WEIGHTING
        || node.total_input_index() + node.depth as usize
            > config.max_word_length.saturating_sub(config.word_length_margin)
}

/// Expand one active node: cache-border snapshot, pending-digraph
/// completion, the space-substitution fork, and either passing-child or
/// genuine-child descent.
#[allow(clippy::too_many_arguments)]
fn expand_one<D: DictPolicy, W: Weighting>(
    parent: DicNode,
    cache: &mut NodeCache,
    bigram_cache: &mut BigramCache,
    dict: &D,
    weighting: &W,
    digraphs: &DigraphTable,
    config: &DecoderConfig,
    proximity: &dyn ProximityState,
    input_size: usize,
    allow_corrections: bool,
) {
    if should_prune(&parent, config) {
        return;
    }

    if cache.is_cache_border_for_typing(input_size) {
        cache.copy_push_continuation(&parent);
        cache.mark_cached_at_current_index();
    }

    // A digraph fork left half-consumed at the previous input index: finish
    // it here rather than enumerating this node's children again.
    if parent.scoring.digraph_index == DigraphIndex::First {
        let mut node = parent;
        let composite = node.output.last().copied().unwrap_or(super::types::NOT_A_CODE_POINT);
        let expected = digraphs.expansion_at(composite, 1).unwrap_or(composite);
        weighting.apply_digraph(&mut node, 0, proximity, expected);
        process_expanded_dic_node(
            node, cache, bigram_cache, dict, weighting, digraphs, config, proximity, input_size,
            allow_corrections,
        );
        return;
    }

    // Space substitution: parent just completed a word and the typist kept
    // going, so fork a fresh root carrying parent's output as context,
    // consuming one input sample as the (implicit) space key.
    if allow_corrections && parent.is_terminal && parent.is_leaving_node()
        && parent.total_input_index() < input_size
    {
        let mut space_child = DicNode::default();
        space_child.init_as_root_with_previous_word(&parent, dict.root_position());
        weighting.apply_new_word(&mut space_child, false);
        space_child.forward_input_index(0, 1, Some(' '));
        process_expanded_dic_node(
            space_child, cache, bigram_cache, dict, weighting, digraphs, config, proximity,
            input_size, allow_corrections,
        );
    }

    if parent.is_leaving_node() {
        let mut children: Vec<ChildInfo> = Vec::new();
        dict.create_and_get_all_child_dic_nodes(&parent, &mut children);
        for info in &children {
            let mut proto = DicNode::default();
            proto.init_as_child(
                &parent,
                info.pos,
                info.children_pos,
                info.probability,
                info.is_terminal,
                info.has_children,
                info.is_blacklisted,
                &info.merged_code_points,
            );
            let leading_cp = info.merged_code_points.first().copied().unwrap_or(super::types::NOT_A_CODE_POINT);
            dispatch(
                &parent, proto, leading_cp, cache, bigram_cache, dict, weighting, digraphs,
                config, proximity, input_size, allow_corrections,
            );
        }
    } else if let Some(next_cp) = dict.merged_code_point_at(parent.pos, parent.merged_index as usize + 1) {
        let mut proto = DicNode::default();
        proto.init_as_passing_child(&parent);
        proto.push_passing_code_point(next_cp);
        dispatch(
            &parent, proto, next_cp, cache, bigram_cache, dict, weighting, digraphs, config,
            proximity, input_size, allow_corrections,
        );
    }
}

/// Classify one candidate edge (`proto`, reached via `leading_cp`) against
/// the current input sample and fork the corrections spec §4.5 allows:
/// completion (input exhausted), digraph start, omission, a direct
/// proximity-classified match, insertion, and a one-level-lookahead
/// transposition.
#[allow(clippy::too_many_arguments)]
fn dispatch<D: DictPolicy, W: Weighting>(
    parent: &DicNode,
    proto: DicNode,
    leading_cp: CodePoint,
    cache: &mut NodeCache,
    bigram_cache: &mut BigramCache,
    dict: &D,
    weighting: &W,
    digraphs: &DigraphTable,
    config: &DecoderConfig,
    proximity: &dyn ProximityState,
    input_size: usize,
    allow_corrections: bool,
) {
    let input_index = parent.total_input_index();

    if input_index >= input_size {
        let mut child = proto;
        weighting.apply_completion(&mut child);
        process_expanded_dic_node(
            child, cache, bigram_cache, dict, weighting, digraphs, config, proximity, input_size,
            allow_corrections,
        );
        return;
    }

    if digraphs.is_digraph_composite(leading_cp) {
        let mut child = proto;
        let expected = digraphs.expansion_at(leading_cp, 0).unwrap_or(leading_cp);
        weighting.apply_digraph(&mut child, 0, proximity, expected);
        cache.copy_push_next_active(&child);
        return;
    }

    if allow_corrections {
        let mut omitted = proto.clone();
        let is_double_letter = leading_cp != '\'' && parent.output.last().copied() == Some(leading_cp);
        weighting.apply_omission(&mut omitted, leading_cp == '\'', is_double_letter);
        process_expanded_dic_node(
            omitted, cache, bigram_cache, dict, weighting, digraphs, config, proximity,
            input_size, allow_corrections,
        );
    }

    let check_proximity = proximity.touch_position_correction_enabled();
    let ptype = proximity.proximity_type(input_index, leading_cp, check_proximity);
    if matches!(ptype, ProximityType::AdditionalProximity | ProximityType::Substitution | ProximityType::Unrelated)
        && !allow_corrections
    {
        // fall through: corrections are disabled, so only Match/Proximity
        // edges survive below.
    } else {
        let mut matched = proto.clone();
        let applied = match ptype {
            ProximityType::Match | ProximityType::Proximity => {
                weighting.apply_match(&mut matched, ptype, proximity, 0);
                true
            }
            ProximityType::AdditionalProximity => {
                weighting.apply_additional_proximity(&mut matched, proximity, 0);
                true
            }
            ProximityType::Substitution | ProximityType::Unrelated => {
                weighting.apply_substitution(&mut matched, proximity, 0);
                true
            }
        };
        if applied {
            process_expanded_dic_node(
                matched, cache, bigram_cache, dict, weighting, digraphs, config, proximity,
                input_size, allow_corrections,
            );
        }
    }

    if allow_corrections {
        let mut inserted = proto.clone();
        weighting.apply_insertion(&mut inserted, 0);
        process_expanded_dic_node(
            inserted, cache, bigram_cache, dict, weighting, digraphs, config, proximity,
            input_size, allow_corrections,
        );

        // One-level-lookahead transposition: this trie edge is what the
        // typist will type *next*, so optimistically consume two input
        // samples now. A wrong guess simply fails to find further children
        // and gets outcompeted or pruned on its own.
        if input_index + 1 < input_size && proximity.primary_code_point_at(input_index + 1) == leading_cp {
            let mut transposed = proto;
            weighting.apply_transposition(&mut transposed, proximity, 0);
            process_expanded_dic_node(
                transposed, cache, bigram_cache, dict, weighting, digraphs, config, proximity,
                input_size, allow_corrections,
            );
        }
    }
}

/// After an edge's cost has been applied: prune, emit a terminal (plus its
/// own space-omission fork), and push to `nextActive` if there's more trie
/// left to walk.
#[allow(clippy::too_many_arguments)]
fn process_expanded_dic_node<D: DictPolicy, W: Weighting>(
    child: DicNode,
    cache: &mut NodeCache,
    bigram_cache: &mut BigramCache,
    dict: &D,
    weighting: &W,
    digraphs: &DigraphTable,
    config: &DecoderConfig,
    proximity: &dyn ProximityState,
    input_size: usize,
    allow_corrections: bool,
) {
    if should_prune(&child, config) {
        return;
    }

    if child.is_terminal && child.is_leaving_node() {
        let mut terminal_copy = child.clone();
        apply_terminal_cost(&mut terminal_copy, dict, weighting, bigram_cache);
        if !should_prune(&terminal_copy, config) {
            cache.copy_push_terminal(&terminal_copy);
        }

        if allow_corrections && child.total_input_index() < input_size {
            let mut space_child = DicNode::default();
            space_child.init_as_root_with_previous_word(&child, dict.root_position());
            weighting.apply_new_word(&mut space_child, true);
            process_expanded_dic_node(
                space_child, cache, bigram_cache, dict, weighting, digraphs, config, proximity,
                input_size, allow_corrections,
            );
        }
    }

    // Keep walking if there's more of this PtNode's merged run left to pass
    // through, or if a leaving node has genuine children to descend into.
    if !child.is_leaving_node() || child.has_children {
        cache.copy_push_next_active(&child);
    }
}

fn apply_terminal_cost<D: DictPolicy, W: Weighting>(
    node: &mut DicNode,
    dict: &D,
    weighting: &W,
    bigram_cache: &mut BigramCache,
) {
    let probability = if node.prev_word.word_count > 0
        && node.prev_word.terminal_pos != super::types::NOT_A_DICT_POS
    {
        if let Some(p) = bigram_cache.get(node.prev_word.terminal_pos, node.pos) {
            p
        } else {
            let p = dict.get_probability_of_pt_node(node.prev_word.terminal_pos, node.pos);
            bigram_cache.record(node.prev_word.terminal_pos, node.pos, p);
            p
        }
    } else {
        node.probability
    };
    weighting.apply_terminal(node, probability);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::dict_policy::MemoryTrieDict;
    use crate::decoder::node_cache::NodeCache;
    use crate::decoder::proximity::{GridProximityState, Key, KeyGrid};
    use crate::decoder::weighting::TypingWeighting;

    fn qwerty() -> KeyGrid {
        KeyGrid::new(vec![
            Key { code_point: 't', x: 0, y: 0, width: 10, height: 10 },
            Key { code_point: 'h', x: 10, y: 0, width: 10, height: 10 },
            Key { code_point: 'e', x: 20, y: 0, width: 10, height: 10 },
            Key { code_point: 'y', x: 30, y: 0, width: 10, height: 10 },
            Key { code_point: 'c', x: 40, y: 0, width: 10, height: 10 },
            Key { code_point: 'a', x: 50, y: 0, width: 10, height: 10 },
            // One key's breadth away from 't', close enough to register as
            // ProximityType::Proximity rather than Unrelated.
            Key { code_point: 'r', x: 4, y: 8, width: 10, height: 10 },
        ])
    }

    fn dict() -> MemoryTrieDict {
        MemoryTrieDict::build(
            &[("the".to_string(), 100), ("they".to_string(), 80), ("cat".to_string(), 80)],
            &[("the".to_string(), "cat".to_string(), 8)],
        )
    }

    fn run_decode(typed: &str) -> Vec<DicNode> {
        let d = dict();
        let w = TypingWeighting::default();
        let digraphs = DigraphTable::default();
        let config = DecoderConfig::default();
        let mut cache = NodeCache::new(config.node_pool_capacity, config.max_results, config.cache_back_length);
        let mut bigram_cache = BigramCache::new(config.bigram_cache_max_contexts);

        let grid = qwerty();
        let chars: Vec<char> = typed.chars().collect();
        let proximity = GridProximityState::new(grid, chars.clone());

        cache.reset(config.node_pool_capacity, config.max_results);
        let mut root = DicNode::default();
        root.init_as_root(d.root_position(), super::super::types::NOT_A_DICT_POS);
        cache.copy_push_active(&root);

        while cache.active_len() > 0 {
            expand_current_dic_nodes(
                &mut cache, &mut bigram_cache, &d, &w, &digraphs, &config, &proximity,
                chars.len(), true,
            );
            cache.advance_active_dic_nodes();
            cache.advance_input_index(chars.len());
        }
        cache.drain_terminals()
    }

    #[test]
    fn exact_typed_word_is_found_as_exact_match() {
        let terminals = run_decode("the");
        let found = terminals.iter().find(|n| n.output == vec!['t', 'h', 'e']);
        assert!(found.is_some());
        assert!(found.unwrap().is_exact_match());
    }

    #[test]
    fn single_proximity_key_still_finds_the_word_as_non_exact() {
        let terminals = run_decode("rhe");
        let found = terminals.iter().find(|n| n.output == vec!['t', 'h', 'e']);
        assert!(found.is_some());
        assert!(!found.unwrap().is_exact_match());
    }

    #[test]
    fn omission_finds_word_missing_a_letter() {
        let terminals = run_decode("te");
        assert!(terminals.iter().any(|n| n.output == vec!['t', 'h', 'e']));
    }
}
