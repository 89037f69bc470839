//! `NodePool` (fixed-capacity slot arena with a free list) and
//! `PriorityQueue` (bounded max-heap of pool slots), kept as two distinct
//! types per the expanded spec — unlike the source's fused
//! `DicNodePriorityQueue`, which owns both the slot buffer and the heap.
//! A single `NodePool` is shared by all four of a `NodeCache`'s queues, so
//! slots migrate between queues (e.g. `advanceActiveDicNodes`) without ever
//! being copied out of the arena.

use std::collections::BinaryHeap;
use std::cmp::Ordering;

use super::dic_node::DicNode;
use super::types::CodePoint;

const NOT_A_SLOT: u32 = u32::MAX;

/// Fixed-capacity arena of `DicNode` slots with a singly-linked free list.
///
/// Invariant: every slot is either referenced by exactly one
/// [`PriorityQueue`] or sits on the free list — never both, never neither.
pub struct NodePool {
    slots: Vec<DicNode>,
    /// `unused_next[i]` is the next free slot after `i`, or `NOT_A_SLOT`.
    unused_next: Vec<u32>,
    next_unused: u32,
    used_count: usize,
}

impl NodePool {
    /// Build a pool with `capacity + 1` slots, matching the source's
    /// "capacity plus one" sizing (room for one in-flight node beyond the
    /// steady-state bound during eviction).
    pub fn new(capacity: usize) -> Self {
        let mut pool = NodePool {
            slots: (0..=capacity as u32).map(|_| DicNode::default()).collect(),
            unused_next: vec![NOT_A_SLOT; capacity + 1],
            next_unused: 0,
            used_count: 0,
        };
        pool.reset();
        pool
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn used_slots(&self) -> usize {
        self.used_count
    }

    /// Release every slot back to the free list, as at the start of a fresh
    /// `NodeCache::reset`.
    pub fn reset(&mut self) {
        let cap = self.slots.len();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            slot.used = false;
            slot.slot_id = i as u32;
            self.unused_next[i] = if i + 1 == cap { NOT_A_SLOT } else { (i + 1) as u32 };
        }
        self.next_unused = 0;
        self.used_count = 0;
    }

    /// Take the head of the free list and mark it used. Returns `None` when
    /// the pool is exhausted — a caller-visible programming error under the
    /// comparator invariant (queues never admit more live nodes than the
    /// pool can hold); callers should `debug_assert` on this in practice and
    /// treat a `None` in release builds as "expansion dropped".
    pub fn acquire(&mut self) -> Option<u32> {
        if self.next_unused == NOT_A_SLOT {
            return None;
        }
        let slot = self.next_unused;
        self.next_unused = self.unused_next[slot as usize];
        self.unused_next[slot as usize] = NOT_A_SLOT;
        self.slots[slot as usize].used = true;
        self.used_count += 1;
        Some(slot)
    }

    /// Return a slot to the free list. Releasing an already-free slot is a
    /// no-op, mirroring the source's idempotent `onReleased`.
    pub fn release(&mut self, slot: u32) {
        let s = &mut self.slots[slot as usize];
        if !s.used {
            return;
        }
        s.used = false;
        self.unused_next[slot as usize] = self.next_unused;
        self.next_unused = slot;
        self.used_count -= 1;
    }

    pub fn get(&self, slot: u32) -> &DicNode {
        &self.slots[slot as usize]
    }

    pub fn get_mut(&mut self, slot: u32) -> &mut DicNode {
        &mut self.slots[slot as usize]
    }

    /// Overwrite an acquired slot's content with `src`, keeping the slot's
    /// own identity (`slot_id`/`used`) intact.
    fn write(&mut self, slot: u32, src: &DicNode) {
        let slot_id = self.slots[slot as usize].slot_id;
        self.slots[slot as usize] = src.clone();
        self.slots[slot as usize].slot_id = slot_id;
        self.slots[slot as usize].used = true;
    }
}

/// Precomputed ordering key for a queued node (spec §4.1 rules 2–6; rule 1
/// — unused sorts after used — never applies here because only used slots
/// are ever pushed into a queue). Computed once at push time since a
/// queued `DicNode`'s content never changes while it sits in the heap.
#[derive(Debug, Clone)]
struct OrderKey {
    exact_match: bool,
    normalized_compound_distance: f32,
    depth: u16,
    output: Vec<CodePoint>,
    slot_id: u32,
}

impl OrderKey {
    fn from_node(node: &DicNode, slot_id: u32) -> Self {
        OrderKey {
            exact_match: node.scoring.exact_match,
            normalized_compound_distance: node.scoring.normalized_compound_distance,
            depth: node.depth,
            output: node.output.clone(),
            slot_id,
        }
    }
}

impl PartialEq for OrderKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for OrderKey {}

impl PartialOrd for OrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderKey {
    /// `Less` means `self` wins (stronger candidate); a `BinaryHeap` built
    /// from this `Ord` pops the *worst* key first, which is exactly the
    /// queue's eviction candidate.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.exact_match, other.exact_match) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        let dist = self
            .normalized_compound_distance
            .total_cmp(&other.normalized_compound_distance);
        if dist != Ordering::Equal {
            return dist;
        }
        let depth = other.depth.cmp(&self.depth);
        if depth != Ordering::Equal {
            return depth;
        }
        let word = self.output.cmp(&other.output);
        if word != Ordering::Equal {
            return word;
        }
        // A not-yet-acquired candidate compares with NOT_A_SLOT, which
        // sorts as "worse" than any real slot id on an exact tie: ties
        // favor the incumbent over an incoming candidate.
        self.slot_id.cmp(&other.slot_id)
    }
}

/// A bounded max-heap of pool slot references, ordered so the worst
/// admissible node is always at the top (ready to be evicted).
pub struct PriorityQueue {
    heap: BinaryHeap<OrderKey>,
    max_size: usize,
    capacity: usize,
}

impl PriorityQueue {
    pub fn new(capacity: usize, max_size: usize) -> Self {
        debug_assert!(max_size <= capacity);
        PriorityQueue { heap: BinaryHeap::new(), max_size: max_size.min(capacity), capacity }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn set_max_size(&mut self, max_size: usize) {
        debug_assert!(max_size <= self.capacity);
        self.max_size = max_size.min(self.capacity);
    }

    /// Drop every queued node, releasing its slot back to `pool`.
    pub fn clear(&mut self, pool: &mut NodePool) {
        while let Some(key) = self.heap.pop() {
            pool.release(key.slot_id);
        }
    }

    pub fn clear_and_resize(&mut self, pool: &mut NodePool, max_size: usize) {
        self.clear(pool);
        self.set_max_size(max_size);
    }

    /// Copy `src` into a pool slot and push it, evicting the current worst
    /// node if the queue is already at `max_size` and `src` beats it.
    /// Returns the slot id `src` landed in, or `None` if it was dropped.
    pub fn copy_push(&mut self, pool: &mut NodePool, src: &DicNode) -> Option<u32> {
        if self.max_size == 0 {
            return None;
        }
        if self.heap.len() < self.max_size {
            let slot = pool.acquire()?;
            pool.write(slot, src);
            self.heap.push(OrderKey::from_node(pool.get(slot), slot));
            return Some(slot);
        }
        let candidate = OrderKey::from_node(src, NOT_A_SLOT);
        let worst = self.heap.peek()?;
        if candidate >= *worst {
            return None;
        }
        let evicted = self.heap.pop().expect("peeked above");
        pool.release(evicted.slot_id);
        let slot = pool.acquire().expect("slot freed immediately above");
        pool.write(slot, src);
        self.heap.push(OrderKey::from_node(pool.get(slot), slot));
        Some(slot)
    }

    /// Pop the worst queued node, copying it out and releasing its slot.
    pub fn copy_pop(&mut self, pool: &mut NodePool) -> Option<DicNode> {
        let key = self.heap.pop()?;
        let node = pool.get(key.slot_id).clone();
        pool.release(key.slot_id);
        Some(node)
    }

    /// Remove and return every queued node, releasing their slots.
    pub fn drain(&mut self, pool: &mut NodePool) -> Vec<DicNode> {
        let mut out = Vec::with_capacity(self.heap.len());
        while let Some(key) = self.heap.pop() {
            out.push(pool.get(key.slot_id).clone());
            pool.release(key.slot_id);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn node(dist: f32, depth: u16) -> DicNode {
        let mut n = DicNode::default();
        n.scoring.normalized_compound_distance = dist;
        n.depth = depth;
        n
    }

    #[test]
    fn used_slots_never_exceed_max_size() {
        let mut pool = NodePool::new(8);
        let mut q = PriorityQueue::new(8, 3);
        for i in 0..10 {
            q.copy_push(&mut pool, &node(10.0 - i as f32, 1));
        }
        assert!(q.len() <= 3);
        assert_eq!(pool.used_slots(), q.len());
    }

    #[test]
    fn pop_returns_current_worst() {
        let mut pool = NodePool::new(8);
        let mut q = PriorityQueue::new(8, 4);
        q.copy_push(&mut pool, &node(1.0, 1));
        q.copy_push(&mut pool, &node(5.0, 1));
        q.copy_push(&mut pool, &node(2.0, 1));
        let popped = q.copy_pop(&mut pool).unwrap();
        assert_eq!(popped.scoring.normalized_compound_distance, 5.0);
    }

    #[test]
    fn release_returns_slot_to_free_list() {
        let mut pool = NodePool::new(2);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert!(pool.acquire().is_none());
        pool.release(a);
        assert!(pool.acquire().is_some());
        assert_eq!(pool.used_slots(), 2);
        pool.release(b);
    }

    #[test]
    fn eviction_drops_candidate_when_not_better_than_worst() {
        let mut pool = NodePool::new(4);
        let mut q = PriorityQueue::new(4, 2);
        q.copy_push(&mut pool, &node(1.0, 1));
        q.copy_push(&mut pool, &node(2.0, 1));
        // Worse than both current members: should be dropped, not evict.
        let slot = q.copy_push(&mut pool, &node(9.0, 1));
        assert!(slot.is_none());
        assert_eq!(q.len(), 2);
    }

    proptest::proptest! {
        /// Spec §8 invariant 1: a bounded queue never holds more live nodes
        /// than its configured `max_size`, regardless of push order or how
        /// many candidates are offered.
        #[test]
        fn queue_len_never_exceeds_max_size(
            distances in proptest::collection::vec(0.0f32..100.0, 0..64),
            max_size in 1usize..16,
        ) {
            let capacity = 16;
            let mut pool = NodePool::new(capacity);
            let mut q = PriorityQueue::new(capacity, max_size);
            for dist in &distances {
                q.copy_push(&mut pool, &node(*dist, 1));
                prop_assert!(q.len() <= max_size);
            }
            prop_assert_eq!(pool.used_slots(), q.len());
        }
    }
}
