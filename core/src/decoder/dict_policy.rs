//! `DictPolicy`: the abstract interface over a compressed patricia-trie
//! lexicon (§6.1), plus `MemoryTrieDict`, the in-memory implementation
//! needed to exercise `Traversal` end-to-end. The on-disk dictionary format
//! is explicitly out of scope (§1); this is a from-memory store only, built
//! and optionally bincode-round-tripped the way the teacher's `WordBigram`
//! round-trips (`core/src/word_bigram.rs`'s `load`/`save`).

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use super::types::{
    backoff_probability, compute_probability_for_bigram, CodePoint, TriePos,
    NOT_A_DICT_POS, NOT_A_PROBABILITY,
};
use super::dic_node::DicNode;

/// One child PtNode surfaced by `DictPolicy::create_and_get_all_child_dic_nodes`.
#[derive(Debug, Clone)]
pub struct ChildInfo {
    pub pos: TriePos,
    pub children_pos: TriePos,
    pub probability: i32,
    pub is_terminal: bool,
    pub has_children: bool,
    pub is_blacklisted: bool,
    pub merged_code_points: Vec<CodePoint>,
}

/// A stored expansion attached to a terminal (e.g. `omw` -> `on my way`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shortcut {
    pub code_points: Vec<CodePoint>,
    pub probability: i32,
    pub whitelist: bool,
}

/// Shortcut lookup, kept as its own trait per the source's
/// `ShortcutsPolicy` so a dictionary implementation can back it with
/// whatever storage it likes.
pub trait ShortcutsPolicy {
    fn shortcuts_for(&self, terminal_pos: TriePos) -> &[Shortcut];
}

/// Minimal dictionary metadata. The source's `HeaderPolicy` carries far more
/// (locale, format flags, decay parameters for personalised dictionaries);
/// only the size is needed by anything in this crate (`DecoderConfig`'s
/// pool-capacity-by-dictionary-size rule, §5).
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderPolicy {
    pub dictionary_size_bytes: u64,
}

/// Random-access reads over the trie, bigram lists, and probability tables
/// (§6.1). The child enumerator must yield children in dictionary order
/// (lexicographic on the first merged code point).
pub trait DictPolicy {
    fn root_position(&self) -> TriePos;

    /// Enumerate the genuine children of a *leaving* PtNode (one that has
    /// finished its merged code-point run). Passing-children within a
    /// merged run are handled by `Traversal` directly via
    /// `merged_code_point_at`, not through this method.
    fn create_and_get_all_child_dic_nodes(&self, parent: &DicNode, out: &mut Vec<ChildInfo>);

    /// The code point at `index` within `node_pos`'s merged run, if any —
    /// used to advance a non-leaving node one code point at a time.
    fn merged_code_point_at(&self, node_pos: TriePos, index: usize) -> Option<CodePoint>;

    fn get_code_points_and_probability(
        &self,
        node_pos: TriePos,
        max_count: usize,
        out_code_points: &mut Vec<CodePoint>,
        out_unigram_probability: &mut i32,
    ) -> usize;

    fn get_terminal_pt_node_position_of_word(&self, word: &[CodePoint], force_lower_case: bool) -> TriePos;

    fn get_probability(&self, unigram: i32, bigram: i32) -> i32;

    fn get_probability_of_pt_node(&self, prev_words_pt_node_pos: TriePos, node_pos: TriePos) -> i32;

    fn iterate_ngram_entries(
        &self,
        prev_words_pt_node_pos: TriePos,
        listener: &mut dyn FnMut(i32, TriePos),
    );

    fn get_shortcut_position_of_pt_node(&self, node_pos: TriePos) -> TriePos;

    fn header_policy(&self) -> &HeaderPolicy;

    fn shortcuts_policy(&self) -> &dyn ShortcutsPolicy;

    /// Sticky corruption flag, set by the reader on detecting an offset out
    /// of bounds or a forward-link walk exceeding
    /// `MAX_CHILD_COUNT_TO_AVOID_INFINITE_LOOP` (§7). The beam loop keeps
    /// going; callers check this after the call returns.
    fn is_corrupted(&self) -> bool;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PtNodeData {
    merged_code_points: Vec<CodePoint>,
    probability: i32,
    is_terminal: bool,
    children: Vec<u32>,
}

#[derive(Default)]
struct RawNode {
    children: BTreeMap<CodePoint, RawNode>,
    probability: Option<i32>,
}

impl RawNode {
    fn insert(&mut self, word: &[CodePoint], probability: i32) {
        let mut node = self;
        for &cp in word {
            node = node.children.entry(cp).or_default();
        }
        node.probability = Some(probability);
    }
}

fn compress_subtrie(node: &RawNode, starting_cp: CodePoint, arena: &mut Vec<PtNodeData>) -> u32 {
    let mut merged = vec![starting_cp];
    let mut current = node;
    while current.probability.is_none() && current.children.len() == 1 {
        let (&next_cp, next_node) = current.children.iter().next().unwrap();
        merged.push(next_cp);
        current = next_node;
    }
    let children: Vec<u32> = current
        .children
        .iter()
        .map(|(&cp, child)| compress_subtrie(child, cp, arena))
        .collect();
    arena.push(PtNodeData {
        merged_code_points: merged,
        probability: current.probability.unwrap_or(NOT_A_PROBABILITY),
        is_terminal: current.probability.is_some(),
        children,
    });
    (arena.len() - 1) as u32
}

/// An in-memory, bincode-serializable patricia trie lexicon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryTrieDict {
    /// Index 0 is always the virtual root: empty merged run, never terminal.
    arena: Vec<PtNodeData>,
    bigrams: AHashMap<TriePos, Vec<(TriePos, i32)>>,
    shortcuts: AHashMap<TriePos, Vec<Shortcut>>,
    word_index: AHashMap<String, TriePos>,
    lower_word_index: AHashMap<String, TriePos>,
    header: HeaderPolicy,
    #[serde(skip)]
    corrupted: Cell<bool>,
}

impl MemoryTrieDict {
    /// Build a trie from `(word, unigram_probability)` pairs. `bigrams` is
    /// `(prev_word, next_word, encoded_delta)`, where `encoded_delta` is the
    /// 4-bit value described in §6.3 (not yet combined with the unigram).
    pub fn build(words: &[(String, i32)], bigrams: &[(String, String, i32)]) -> Self {
        let mut root = RawNode::default();
        for (word, probability) in words {
            let cps: Vec<CodePoint> = word.chars().collect();
            root.insert(&cps, *probability);
        }

        let mut arena = Vec::new();
        let top_children: Vec<u32> =
            root.children.iter().map(|(&cp, child)| compress_subtrie(child, cp, &mut arena)).collect();
        arena.push(PtNodeData {
            merged_code_points: Vec::new(),
            probability: NOT_A_PROBABILITY,
            is_terminal: false,
            children: top_children,
        });
        let root_pos = (arena.len() - 1) as TriePos;
        debug_assert_eq!(root_pos, (arena.len() - 1) as TriePos);

        let mut word_index = AHashMap::new();
        let mut lower_word_index = AHashMap::new();
        collect_word_positions(&arena, root_pos as u32, String::new(), &mut word_index, &mut lower_word_index);

        let mut bigram_table: AHashMap<TriePos, Vec<(TriePos, i32)>> = AHashMap::new();
        for (prev, next, delta) in bigrams {
            let (Some(&prev_pos), Some(&next_pos)) = (word_index.get(prev), word_index.get(next)) else {
                continue;
            };
            bigram_table.entry(prev_pos).or_default().push((next_pos, *delta));
        }

        let total_bytes = arena.len() as u64 * std::mem::size_of::<PtNodeData>() as u64;
        MemoryTrieDict {
            arena,
            bigrams: bigram_table,
            shortcuts: AHashMap::new(),
            word_index,
            lower_word_index,
            header: HeaderPolicy { dictionary_size_bytes: total_bytes },
            corrupted: Cell::new(false),
        }
    }

    pub fn root_pos(&self) -> TriePos {
        (self.arena.len() - 1) as TriePos
    }

    pub fn add_shortcut(&mut self, word: &str, shortcut: Shortcut) {
        if let Some(&pos) = self.word_index.get(word) {
            self.shortcuts.entry(pos).or_default().push(shortcut);
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(bincode::deserialize_from(reader)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        bincode::serialize_into(writer, self)?;
        Ok(())
    }
}

fn collect_word_positions(
    arena: &[PtNodeData],
    idx: u32,
    prefix: String,
    word_index: &mut AHashMap<String, TriePos>,
    lower_word_index: &mut AHashMap<String, TriePos>,
) {
    let node = &arena[idx as usize];
    let mut word = prefix;
    word.extend(node.merged_code_points.iter());
    if node.is_terminal {
        word_index.insert(word.clone(), idx as TriePos);
        lower_word_index.insert(word.to_lowercase(), idx as TriePos);
    }
    for &child in &node.children {
        collect_word_positions(arena, child, word.clone(), word_index, lower_word_index);
    }
}

impl ShortcutsPolicy for MemoryTrieDict {
    fn shortcuts_for(&self, terminal_pos: TriePos) -> &[Shortcut] {
        self.shortcuts.get(&terminal_pos).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

impl DictPolicy for MemoryTrieDict {
    fn root_position(&self) -> TriePos {
        self.root_pos()
    }

    fn create_and_get_all_child_dic_nodes(&self, parent: &DicNode, out: &mut Vec<ChildInfo>) {
        out.clear();
        if parent.children_pos == NOT_A_DICT_POS {
            return;
        }
        let Some(node) = self.arena.get(parent.children_pos as usize) else {
            self.corrupted.set(true);
            return;
        };
        if node.children.len() > super::types::MAX_CHILD_COUNT_TO_AVOID_INFINITE_LOOP {
            self.corrupted.set(true);
            return;
        }
        for &child_idx in &node.children {
            let Some(child) = self.arena.get(child_idx as usize) else {
                self.corrupted.set(true);
                continue;
            };
            out.push(ChildInfo {
                pos: child_idx as TriePos,
                children_pos: child_idx as TriePos,
                probability: child.probability,
                is_terminal: child.is_terminal,
                has_children: !child.children.is_empty(),
                is_blacklisted: false,
                merged_code_points: child.merged_code_points.clone(),
            });
        }
    }

    fn merged_code_point_at(&self, node_pos: TriePos, index: usize) -> Option<CodePoint> {
        self.arena.get(node_pos as usize)?.merged_code_points.get(index).copied()
    }

    fn get_code_points_and_probability(
        &self,
        node_pos: TriePos,
        max_count: usize,
        out_code_points: &mut Vec<CodePoint>,
        out_unigram_probability: &mut i32,
    ) -> usize {
        out_code_points.clear();
        let Some(node) = self.arena.get(node_pos as usize) else {
            *out_unigram_probability = NOT_A_PROBABILITY;
            return 0;
        };
        let n = node.merged_code_points.len().min(max_count);
        out_code_points.extend_from_slice(&node.merged_code_points[..n]);
        *out_unigram_probability = node.probability;
        n
    }

    fn get_terminal_pt_node_position_of_word(&self, word: &[CodePoint], force_lower_case: bool) -> TriePos {
        let s: String = word.iter().collect();
        if force_lower_case {
            self.lower_word_index.get(&s.to_lowercase()).copied().unwrap_or(NOT_A_DICT_POS)
        } else {
            self.word_index.get(&s).copied().unwrap_or(NOT_A_DICT_POS)
        }
    }

    fn get_probability(&self, unigram: i32, bigram: i32) -> i32 {
        if unigram == NOT_A_PROBABILITY {
            return NOT_A_PROBABILITY;
        }
        if bigram == NOT_A_PROBABILITY {
            backoff_probability(unigram)
        } else {
            compute_probability_for_bigram(unigram, bigram)
        }
    }

    fn get_probability_of_pt_node(&self, prev_words_pt_node_pos: TriePos, node_pos: TriePos) -> i32 {
        let unigram = self.arena.get(node_pos as usize).map(|n| n.probability).unwrap_or(NOT_A_PROBABILITY);
        let bigram = self
            .bigrams
            .get(&prev_words_pt_node_pos)
            .and_then(|entries| entries.iter().find(|(pos, _)| *pos == node_pos))
            .map(|(_, delta)| *delta)
            .unwrap_or(NOT_A_PROBABILITY);
        self.get_probability(unigram, bigram)
    }

    fn iterate_ngram_entries(&self, prev_words_pt_node_pos: TriePos, listener: &mut dyn FnMut(i32, TriePos)) {
        if let Some(entries) = self.bigrams.get(&prev_words_pt_node_pos) {
            for &(pos, delta) in entries {
                listener(delta, pos);
            }
        }
    }

    fn get_shortcut_position_of_pt_node(&self, node_pos: TriePos) -> TriePos {
        if self.shortcuts.contains_key(&node_pos) {
            node_pos
        } else {
            NOT_A_DICT_POS
        }
    }

    fn header_policy(&self) -> &HeaderPolicy {
        &self.header
    }

    fn shortcuts_policy(&self) -> &dyn ShortcutsPolicy {
        self
    }

    fn is_corrupted(&self) -> bool {
        self.corrupted.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dict() -> MemoryTrieDict {
        MemoryTrieDict::build(
            &[
                ("the".to_string(), 100),
                ("they".to_string(), 80),
                ("then".to_string(), 70),
                ("cat".to_string(), 80),
            ],
            &[("the".to_string(), "cat".to_string(), 8)],
        )
    }

    #[test]
    fn finds_exact_word() {
        let dict = sample_dict();
        let cps: Vec<CodePoint> = "the".chars().collect();
        let pos = dict.get_terminal_pt_node_position_of_word(&cps, false);
        assert_ne!(pos, NOT_A_DICT_POS);
        let mut out = Vec::new();
        let mut prob = 0;
        dict.get_code_points_and_probability(pos, 48, &mut out, &mut prob);
        assert_eq!(prob, 100);
    }

    #[test]
    fn shares_a_compressed_prefix_for_the_they_then() {
        let dict = sample_dict();
        // "the"/"they"/"then" share the "the" prefix node before diverging;
        // the root should therefore not directly contain three top-level
        // single-character chains.
        let mut out = Vec::new();
        dict.create_and_get_all_child_dic_nodes(
            &{
                let mut n = DicNode::default();
                n.init_as_root(dict.root_position(), NOT_A_DICT_POS);
                n
            },
            &mut out,
        );
        assert!(out.iter().any(|c| c.merged_code_points.starts_with(&['t'])));
    }

    #[test]
    fn bigram_probability_combines_with_unigram() {
        let dict = sample_dict();
        let the_cps: Vec<CodePoint> = "the".chars().collect();
        let cat_cps: Vec<CodePoint> = "cat".chars().collect();
        let the_pos = dict.get_terminal_pt_node_position_of_word(&the_cps, false);
        let cat_pos = dict.get_terminal_pt_node_position_of_word(&cat_cps, false);
        let combined = dict.get_probability_of_pt_node(the_pos, cat_pos);
        let backoff_only = backoff_probability(80);
        assert!(combined > backoff_only);
    }

    #[test]
    fn round_trips_through_bincode() {
        let dict = sample_dict();
        let bytes = bincode::serialize(&dict).unwrap();
        let back: MemoryTrieDict = bincode::deserialize(&bytes).unwrap();
        let cps: Vec<CodePoint> = "they".chars().collect();
        assert_ne!(back.get_terminal_pt_node_position_of_word(&cps, false), NOT_A_DICT_POS);
    }
}
