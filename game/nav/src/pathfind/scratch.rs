use std::cmp::Ordering;
use std::collections::BinaryHeap;

use grid::DynamicGrid;

use crate::cell::GridDims;

/// Per-cell search bookkeeping. A node is live only while its stamp matches
/// the current generation, so a whole grid of stale nodes is discarded by
/// bumping a counter instead of clearing memory
#[derive(Clone, Copy, Default)]
struct SearchNode {
    g: u32,
    /// Grid index of the predecessor, self for the start node
    parent: u32,
    stamp: u64,
}

/// Reusable allocations for one pathfinder. Survives between searches
pub(crate) struct SearchScratch {
    nodes: DynamicGrid<SearchNode>,
    frontier: BinaryHeap<MinScored<f32, u32>>,
    /// Bumped by 2 per search: `generation` = open, `generation + 1` = closed
    generation: u64,
}

impl SearchScratch {
    pub fn new(dims: GridDims) -> Self {
        Self {
            nodes: DynamicGrid::new([dims.x() as usize, dims.z() as usize]),
            frontier: BinaryHeap::with_capacity(512),
            generation: 0,
        }
    }

    /// Logically resets all nodes and empties the frontier
    pub fn begin_search(&mut self, dims: GridDims) {
        let dims = [dims.x() as usize, dims.z() as usize];
        if self.nodes.dimensions() != dims {
            self.nodes = DynamicGrid::new(dims);
            self.generation = 0;
        }

        self.generation += 2;
        self.frontier.clear();
    }

    pub fn is_open(&self, idx: usize) -> bool {
        self.nodes[idx].stamp == self.generation
    }

    pub fn is_closed(&self, idx: usize) -> bool {
        self.nodes[idx].stamp == self.generation + 1
    }

    /// g cost of a live node. Garbage for untouched nodes
    pub fn g(&self, idx: usize) -> u32 {
        self.nodes[idx].g
    }

    pub fn parent(&self, idx: usize) -> usize {
        self.nodes[idx].parent as usize
    }

    /// Opens or improves a node and queues it at the given f score
    pub fn open(&mut self, idx: usize, g: u32, parent: usize, f: f32) {
        let node = &mut self.nodes[idx];
        node.g = g;
        node.parent = parent as u32;
        node.stamp = self.generation;
        self.frontier.push(MinScored(f, idx as u32));
    }

    pub fn close(&mut self, idx: usize) {
        self.nodes[idx].stamp = self.generation + 1;
    }

    /// Pops the cheapest queued node, skipping entries superseded by a later
    /// improvement or already closed
    pub fn pop(&mut self) -> Option<usize> {
        while let Some(MinScored(_, idx)) = self.frontier.pop() {
            let idx = idx as usize;
            if self.is_open(idx) {
                return Some(idx);
            }
        }
        None
    }

}

/// Score-value pair with a reversed total order, making `BinaryHeap` a
/// min-heap that tolerates float scores
#[derive(Copy, Clone, Debug)]
pub(crate) struct MinScored<K, T>(pub K, pub T);

impl<K: PartialOrd, T> PartialEq for MinScored<K, T> {
    #[inline]
    fn eq(&self, other: &MinScored<K, T>) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: PartialOrd, T> Eq for MinScored<K, T> {}

impl<K: PartialOrd, T> PartialOrd for MinScored<K, T> {
    #[inline]
    fn partial_cmp(&self, other: &MinScored<K, T>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[allow(clippy::eq_op)]
impl<K: PartialOrd, T> Ord for MinScored<K, T> {
    #[inline]
    fn cmp(&self, other: &MinScored<K, T>) -> Ordering {
        let a = &self.0;
        let b = &other.0;
        if a == b {
            Ordering::Equal
        } else if a < b {
            Ordering::Greater
        } else if a > b {
            Ordering::Less
        } else if a.ne(a) && b.ne(b) {
            // both NaN
            Ordering::Equal
        } else if a.ne(a) {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_heap_order() {
        let mut heap = BinaryHeap::new();
        heap.push(MinScored(3.0f32, "c"));
        heap.push(MinScored(1.0, "a"));
        heap.push(MinScored(2.0, "b"));

        assert_eq!(heap.pop().map(|MinScored(_, v)| v), Some("a"));
        assert_eq!(heap.pop().map(|MinScored(_, v)| v), Some("b"));
        assert_eq!(heap.pop().map(|MinScored(_, v)| v), Some("c"));
    }

    #[test]
    fn generation_reset_is_logical() {
        let dims = GridDims::new(4, 4);
        let mut scratch = SearchScratch::new(dims);

        scratch.begin_search(dims);
        scratch.open(5, 10, 5, 10.0);
        assert!(scratch.is_open(5));
        scratch.close(5);
        assert!(scratch.is_closed(5));

        scratch.begin_search(dims);
        assert!(!scratch.is_open(5));
        assert!(!scratch.is_closed(5));
        assert_eq!(scratch.pop(), None);
    }

    #[test]
    fn pop_skips_superseded_entries() {
        let dims = GridDims::new(4, 4);
        let mut scratch = SearchScratch::new(dims);
        scratch.begin_search(dims);

        scratch.open(3, 50, 3, 50.0);
        scratch.open(3, 20, 3, 20.0);

        assert_eq!(scratch.pop(), Some(3));
        assert_eq!(scratch.g(3), 20);
        scratch.close(3);

        // the stale 50.0 entry is dropped
        assert_eq!(scratch.pop(), None);
    }

    #[test]
    fn mid_search_restart_forgets_everything() {
        let dims = GridDims::new(4, 4);
        let mut scratch = SearchScratch::new(dims);
        scratch.begin_search(dims);

        scratch.open(1, 10, 1, 10.0);
        scratch.open(2, 20, 1, 20.0);
        scratch.close(2);

        // a restart invalidates open and closed nodes alike, and the stale
        // frontier entry for 1 no longer pops
        scratch.begin_search(dims);
        assert!(!scratch.is_open(1));
        assert!(!scratch.is_closed(2));
        assert_eq!(scratch.pop(), None);

        scratch.open(1, 3, 1, 3.0);
        assert_eq!(scratch.pop(), Some(1));
        assert_eq!(scratch.g(1), 3);
    }
}
