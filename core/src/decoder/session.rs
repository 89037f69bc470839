//! `DecodeSession`: the top-level entry point (component H/I boundary),
//! grounded on `Suggest::getSuggestions`/`initializeSearch`/
//! `outputSuggestions` in `suggest.cpp`. Owns everything a single decode
//! call touches (§5: one session, one thread, shared dictionary).

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use tracing::{debug, warn};

use super::bigram_cache::BigramCache;
use super::config::DecoderConfig;
use super::dic_node::DicNode;
use super::dict_policy::DictPolicy;
use super::digraph::DigraphTable;
use super::error::DecodeError;
use super::node_cache::NodeCache;
use super::proximity::ProximityState;
use super::scoring::Scoring;
use super::traversal;
use super::types::{CodePoint, SuggestionKind, NOT_A_DICT_POS};
use super::weighting::Weighting;

/// One ranked output of a [`DecodeSession::decode`] call (§4.7).
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub code_points: Vec<CodePoint>,
    /// Final rank score, scaled by `DecoderConfig::output_score_scale`.
    pub score: i32,
    pub kind: SuggestionKind,
    pub has_multiple_words: bool,
    pub second_word_first_input_index: usize,
}

/// Owns the beam-search resources (`NodeCache`, `BigramCache`) for one
/// decoding session against a shared, read-only dictionary. `dict` is an
/// `Arc` so several sessions can share one loaded lexicon the way upstream
/// shares one memory-mapped `DictionaryStructureWithBufferPolicy` across
/// suggestion sessions for different input connections.
pub struct DecodeSession<D: DictPolicy, W: Weighting, S: Scoring> {
    dict: Arc<D>,
    weighting: W,
    scoring: S,
    digraphs: DigraphTable,
    config: DecoderConfig,
    cache: NodeCache,
    bigram_cache: BigramCache,
}

impl<D: DictPolicy, W: Weighting, S: Scoring> DecodeSession<D, W, S> {
    pub fn new(dict: Arc<D>, weighting: W, scoring: S, config: DecoderConfig) -> Self {
        let cache = NodeCache::new(config.node_pool_capacity, config.max_results, config.cache_back_length);
        let bigram_cache = BigramCache::new(config.bigram_cache_max_contexts);
        DecodeSession {
            dict,
            weighting,
            scoring,
            digraphs: DigraphTable::default(),
            config,
            cache,
            bigram_cache,
        }
    }

    pub fn with_digraphs(mut self, digraphs: DigraphTable) -> Self {
        self.digraphs = digraphs;
        self
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// `true` if the dictionary backing this session has tripped its
    /// corruption flag (§7) at any point since it was loaded.
    pub fn is_dictionary_corrupted(&self) -> bool {
        self.dict.is_corrupted()
    }

    /// Decode one batch of input samples into ranked suggestions.
    ///
    /// `prev_word` is the previously committed word (for bigram-aware
    /// scoring of the first word of this call), if any. `commit_point` is
    /// `0` unless a prior partial commit narrowed the continuation set
    /// (spec §4.1/§4.2, `NodeCache::set_commit_point`). `cancel`, if given,
    /// is polled between input-index advances so a caller can abandon a
    /// stale call (spec §5's suspension-point requirement) without this
    /// session's beam state getting corrupted.
    pub fn decode(
        &mut self,
        proximity: &dyn ProximityState,
        input_size: usize,
        prev_word: Option<&[CodePoint]>,
        commit_point: usize,
        cancel: Option<&AtomicBool>,
    ) -> Result<Vec<Suggestion>, DecodeError> {
        if input_size == 0 {
            return Err(DecodeError::InvalidInputSize);
        }
        if let Some(pw) = prev_word {
            if pw.len() > self.config.max_word_length {
                return Err(DecodeError::PrevWordTooLong);
            }
        }

        let prev_word_pos = prev_word
            .map(|w| self.dict.get_terminal_pt_node_position_of_word(w, false))
            .unwrap_or(NOT_A_DICT_POS);

        self.initialize_search(proximity, input_size, prev_word_pos, commit_point);

        let allow_corrections = proximity.touch_position_correction_enabled();
        while self.cache.active_len() > 0 {
            if let Some(flag) = cancel {
                if flag.load(AtomicOrdering::Relaxed) {
                    debug!("decode cancelled mid-traversal");
                    return Ok(Vec::new());
                }
            }
            traversal::expand_current_dic_nodes(
                &mut self.cache,
                &mut self.bigram_cache,
                self.dict.as_ref(),
                &self.weighting,
                &self.digraphs,
                &self.config,
                proximity,
                input_size,
                allow_corrections,
            );
            self.cache.advance_active_dic_nodes();
            self.cache.advance_input_index(input_size);
        }

        if self.dict.is_corrupted() {
            warn!("dictionary corruption flag set during decode");
        }

        Ok(self.output_suggestions(input_size))
    }

    fn initialize_search(
        &mut self,
        proximity: &dyn ProximityState,
        input_size: usize,
        prev_word_pos: super::types::TriePos,
        commit_point: usize,
    ) {
        let continuous_possible = input_size >= self.config.min_continuous_suggestion_input_size
            && proximity.is_continuous_suggestion_possible();

        if continuous_possible {
            if commit_point > 0 {
                self.cache.set_commit_point(commit_point);
            }
            if self.cache.continue_search() {
                return;
            }
        }

        self.reset_and_seed_root(prev_word_pos);
    }

    fn reset_and_seed_root(&mut self, prev_word_pos: super::types::TriePos) {
        self.cache.reset(self.config.node_pool_capacity, self.config.max_results);
        let mut root = DicNode::default();
        root.init_as_root(self.dict.root_position(), prev_word_pos);
        self.cache.copy_push_active(&root);
    }

    /// Drain `terminals`, rank them by the §4.1 total order, convert each
    /// into a [`Suggestion`], attach any dictionary shortcuts, and apply the
    /// safety net before truncating to `max_results`.
    fn output_suggestions(&mut self, input_size: usize) -> Vec<Suggestion> {
        let mut terminals = self.cache.drain_terminals();
        terminals.sort();

        let mut suggestions = Vec::with_capacity(terminals.len());
        for (i, node) in terminals.iter().enumerate() {
            if node.is_blacklisted {
                continue;
            }
            let force_commit = i == 0
                && node.has_multiple_words()
                && self.scoring.auto_corrects_to_multi_word_suggestion_if_top();
            let score = self.scoring.calculate_final_score(node, input_size, &self.config, force_commit);
            suggestions.push(Suggestion {
                code_points: node.output.clone(),
                score,
                kind: self.scoring.suggestion_kind_for(node, false),
                has_multiple_words: node.has_multiple_words(),
                second_word_first_input_index: node.second_word_first_input_index(),
            });

            if node.prev_word.word_count == 0 {
                let shortcut_pos = self.dict.get_shortcut_position_of_pt_node(node.pos);
                if shortcut_pos != NOT_A_DICT_POS {
                    for shortcut in self.dict.shortcuts_policy().shortcuts_for(shortcut_pos) {
                        let kind = if shortcut.whitelist && shortcut.code_points == node.output {
                            SuggestionKind::Whitelist
                        } else {
                            SuggestionKind::Shortcut
                        };
                        suggestions.push(Suggestion {
                            code_points: shortcut.code_points.clone(),
                            score,
                            kind,
                            has_multiple_words: false,
                            second_word_first_input_index: 0,
                        });
                    }
                }
            }
        }

        if let Some(alt) = self.scoring.safety_net_for_most_probable_string(0, &terminals) {
            if alt < suggestions.len() {
                suggestions.swap(0, alt);
            }
        }

        suggestions.truncate(self.config.max_results);
        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::dict_policy::MemoryTrieDict;
    use crate::decoder::proximity::{GridProximityState, Key, KeyGrid};
    use crate::decoder::scoring::DefaultScoring;
    use crate::decoder::weighting::TypingWeighting;

    fn grid() -> KeyGrid {
        KeyGrid::new(vec![
            Key { code_point: 't', x: 0, y: 0, width: 10, height: 10 },
            Key { code_point: 'h', x: 10, y: 0, width: 10, height: 10 },
            Key { code_point: 'e', x: 20, y: 0, width: 10, height: 10 },
            Key { code_point: ' ', x: 30, y: 0, width: 10, height: 10 },
            Key { code_point: 'c', x: 40, y: 0, width: 10, height: 10 },
            Key { code_point: 'a', x: 50, y: 0, width: 10, height: 10 },
        ])
    }

    fn dict() -> Arc<MemoryTrieDict> {
        Arc::new(MemoryTrieDict::build(
            &[("the".to_string(), 100), ("cat".to_string(), 80)],
            &[("the".to_string(), "cat".to_string(), 8)],
        ))
    }

    fn session() -> DecodeSession<MemoryTrieDict, TypingWeighting, DefaultScoring> {
        DecodeSession::new(dict(), TypingWeighting::default(), DefaultScoring::default(), DecoderConfig::default())
    }

    #[test]
    fn empty_input_is_rejected() {
        let mut s = session();
        let proximity = GridProximityState::new(grid(), vec![]);
        let err = s.decode(&proximity, 0, None, 0, None).unwrap_err();
        assert_eq!(err, DecodeError::InvalidInputSize);
    }

    #[test]
    fn too_long_previous_word_is_rejected() {
        let mut s = session();
        let long_word: Vec<CodePoint> = std::iter::repeat('a').take(s.config().max_word_length + 1).collect();
        let proximity = GridProximityState::new(grid(), vec!['t']);
        let err = s.decode(&proximity, 1, Some(&long_word), 0, None).unwrap_err();
        assert_eq!(err, DecodeError::PrevWordTooLong);
    }

    #[test]
    fn exact_word_decodes_to_top_suggestion() {
        let mut s = session();
        let typed: Vec<CodePoint> = "the".chars().collect();
        let proximity = GridProximityState::new(grid(), typed);
        let suggestions = s.decode(&proximity, 3, None, 0, None).unwrap();
        assert!(!suggestions.is_empty());
        assert_eq!(suggestions[0].code_points, vec!['t', 'h', 'e']);
    }

    #[test]
    fn cancellation_short_circuits_with_empty_result() {
        let mut s = session();
        let typed: Vec<CodePoint> = "the".chars().collect();
        let proximity = GridProximityState::new(grid(), typed);
        let cancelled = AtomicBool::new(true);
        let suggestions = s.decode(&proximity, 3, None, 0, Some(&cancelled)).unwrap();
        assert!(suggestions.is_empty());
    }
}
