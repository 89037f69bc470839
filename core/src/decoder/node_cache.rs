//! `NodeCache`: the four-queue beam controller, grounded on
//! `dic_nodes_cache.h`'s `DicNodesCache`. Owns the single `NodePool` shared
//! by its `active`/`nextActive`/`terminals`/`continuation` queues.

use tracing::{debug, trace};

use super::dic_node::DicNode;
use super::node_pool::{NodePool, PriorityQueue};

/// Four-queue beam controller shared by `Traversal` across one decoding
/// call (and, via `continuation`, across calls on the same session).
pub struct NodeCache {
    pool: NodePool,
    active: PriorityQueue,
    next_active: PriorityQueue,
    terminals: PriorityQueue,
    continuation: PriorityQueue,
    input_index: usize,
    last_cached_input_index: Option<usize>,
    cache_back_length: usize,
}

impl NodeCache {
    pub fn new(pool_capacity: usize, terminal_size: usize, cache_back_length: usize) -> Self {
        NodeCache {
            pool: NodePool::new(pool_capacity),
            active: PriorityQueue::new(pool_capacity, pool_capacity),
            next_active: PriorityQueue::new(pool_capacity, pool_capacity),
            terminals: PriorityQueue::new(pool_capacity, terminal_size),
            continuation: PriorityQueue::new(pool_capacity, pool_capacity),
            input_index: 0,
            last_cached_input_index: None,
            cache_back_length,
        }
    }

    pub fn pool(&self) -> &NodePool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut NodePool {
        &mut self.pool
    }

    pub fn input_index(&self) -> usize {
        self.input_index
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn terminals_len(&self) -> usize {
        self.terminals.len()
    }

    /// Clear all four queues and reset their bounds and cursor state.
    pub fn reset(&mut self, next_active_size: usize, terminal_size: usize) {
        self.active.clear_and_resize(&mut self.pool, next_active_size);
        self.next_active.clear_and_resize(&mut self.pool, next_active_size);
        self.terminals.clear_and_resize(&mut self.pool, terminal_size);
        self.continuation.clear_and_resize(&mut self.pool, next_active_size);
        self.input_index = 0;
        self.last_cached_input_index = None;
        trace!(next_active_size, terminal_size, "node cache reset");
    }

    pub fn copy_push_active(&mut self, node: &DicNode) -> Option<u32> {
        self.active.copy_push(&mut self.pool, node)
    }

    pub fn copy_push_next_active(&mut self, node: &DicNode) -> Option<u32> {
        self.next_active.copy_push(&mut self.pool, node)
    }

    pub fn copy_push_terminal(&mut self, node: &DicNode) -> Option<u32> {
        self.terminals.copy_push(&mut self.pool, node)
    }

    pub fn copy_push_continuation(&mut self, node: &DicNode) -> Option<u32> {
        self.continuation.copy_push(&mut self.pool, node)
    }

    pub fn pop_active(&mut self) -> Option<DicNode> {
        self.active.copy_pop(&mut self.pool)
    }

    pub fn pop_terminal(&mut self) -> Option<DicNode> {
        self.terminals.copy_pop(&mut self.pool)
    }

    pub fn drain_terminals(&mut self) -> Vec<DicNode> {
        self.terminals.drain(&mut self.pool)
    }

    /// Swap `active` with `nextActive`, retaining each queue's configured
    /// bound, then clear whichever queue the swap turned into the new
    /// `nextActive` (it should already be empty in the steady state — this
    /// clear only matters if the traversal left leftovers on cancellation).
    pub fn advance_active_dic_nodes(&mut self) {
        std::mem::swap(&mut self.active, &mut self.next_active);
        self.next_active.clear(&mut self.pool);
    }

    pub fn advance_input_index(&mut self, input_size: usize) {
        self.input_index = (self.input_index + 1).min(input_size);
    }

    /// `true` iff we're exactly `cache_back_length` samples from the end of
    /// the input and haven't already taken a continuation snapshot here.
    pub fn is_cache_border_for_typing(&self, input_size: usize) -> bool {
        input_size >= self.cache_back_length
            && input_size - self.cache_back_length == self.input_index
            && self.last_cached_input_index != Some(self.input_index)
    }

    /// Record that a continuation snapshot was taken at the current input
    /// index, so `is_cache_border_for_typing` won't fire again at it.
    pub fn mark_cached_at_current_index(&mut self) {
        self.last_cached_input_index = Some(self.input_index);
    }

    /// Resume a previously cached beam: move everything from `continuation`
    /// into `active` and restore `input_index` to where it was cached.
    pub fn continue_search(&mut self) -> bool {
        if self.continuation.is_empty() {
            return false;
        }
        self.active.clear(&mut self.pool);
        self.next_active.clear(&mut self.pool);
        self.terminals.clear(&mut self.pool);
        let carried = self.continuation.drain(&mut self.pool);
        for node in &carried {
            self.active.copy_push(&mut self.pool, node);
        }
        self.input_index = self.last_cached_input_index.unwrap_or(0);
        debug!(carried = carried.len(), input_index = self.input_index, "resumed from continuation");
        true
    }

    /// Drain `continuation`, keep only nodes whose previous-word context
    /// still agrees with the top candidate's first `commit_point`
    /// non-space, non-apostrophe characters, and push the survivors back.
    /// Returns the top candidate (by the §4.1 total order) among the
    /// surviving set, if any.
    ///
    /// This mirrors a source routine the authors themselves flag as "may
    /// be defective" (spec Open Questions); this implementation keeps the
    /// filtering semantics but does not attempt to reproduce the original's
    /// exact input/prev-word truncation arithmetic, which was not fully
    /// specified. See DESIGN.md.
    pub fn set_commit_point(&mut self, commit_point: usize) -> Option<DicNode> {
        let drained = self.continuation.drain(&mut self.pool);
        if drained.is_empty() {
            return None;
        }
        // `DicNode`'s `Ord` ranks `Less` as "wins", so the top candidate is
        // the minimum of the drained set under that order.
        let top = drained.iter().min()?.clone();
        let reference_prefix = committed_prefix(&top.output, commit_point);

        for node in &drained {
            let candidate_prefix = committed_prefix(&node.output, commit_point);
            if candidate_prefix == reference_prefix {
                self.continuation.copy_push(&mut self.pool, node);
            }
        }
        Some(top)
    }
}

/// First `commit_point` code points of `word`, ignoring spaces and
/// apostrophes, as used by `set_commit_point`'s context matching.
fn committed_prefix(word: &[super::types::CodePoint], commit_point: usize) -> Vec<super::types::CodePoint> {
    word.iter()
        .copied()
        .filter(|&c| c != ' ' && c != '\'')
        .take(commit_point)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_queues_and_cursor() {
        let mut cache = NodeCache::new(8, 4, 3);
        let mut node = DicNode::default();
        node.init_as_root(0, super::super::types::NOT_A_DICT_POS);
        cache.copy_push_active(&node);
        cache.advance_input_index(10);
        cache.reset(8, 4);
        assert_eq!(cache.active_len(), 0);
        assert_eq!(cache.input_index(), 0);
    }

    #[test]
    fn advance_swaps_and_clears() {
        let mut cache = NodeCache::new(8, 4, 3);
        let mut a = DicNode::default();
        a.init_as_root(0, super::super::types::NOT_A_DICT_POS);
        cache.copy_push_next_active(&a);
        assert_eq!(cache.active_len(), 0);
        cache.advance_active_dic_nodes();
        assert_eq!(cache.active_len(), 1);
    }

    #[test]
    fn cache_border_detection() {
        let mut cache = NodeCache::new(8, 4, 3);
        assert!(!cache.is_cache_border_for_typing(5));
        cache.advance_input_index(5);
        cache.advance_input_index(5);
        assert!(cache.is_cache_border_for_typing(5));
        cache.mark_cached_at_current_index();
        assert!(!cache.is_cache_border_for_typing(5));
    }
}
