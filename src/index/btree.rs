//! B-tree-of-suffixes index: per hash slot, a B-tree of window positions
//! ordered lexicographically by the suffix starting at each position.
//!
//! Gated behind the `btree-index` feature — it is the most memory-hungry
//! index (one tree per hash slot, `O(window_size / average_key_density)`
//! nodes) and most callers are well served by the hash family. Nodes live
//! in an arena `Vec<Node>` indexed by `u32` rather than as heap-linked
//! objects, for cache locality and drop-free eviction.

use super::{hash_prefix, HashEntry, Mapper};

/// Suffix comparator: lexicographic order over `window[k1..]` vs
/// `window[k2..]`, supplied by the caller since the tree itself has no
/// access to window bytes.
pub trait SuffixSource {
    fn compare(&self, k1: u32, k2: u32) -> std::cmp::Ordering;
}

type NodeId = u32;
const NIL: NodeId = u32::MAX;

struct Node {
    keys: Vec<u32>,
    /// Empty for a leaf; otherwise `children.len() == keys.len() + 1`.
    children: Vec<NodeId>,
}

impl Node {
    fn leaf() -> Self {
        Node { keys: Vec::new(), children: Vec::new() }
    }

    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// One suffix-ordered B-tree of order `m >= 3` (Knuth's convention: at most
/// `m - 1` keys per node, at least `⌈m/2⌉ - 1` except the root).
pub struct SuffixBTree {
    arena: Vec<Node>,
    root: NodeId,
    order: usize,
    len: usize,
}

impl SuffixBTree {
    pub fn new(order: usize) -> Self {
        assert!(order >= 3);
        let mut arena = Vec::new();
        arena.push(Node::leaf());
        SuffixBTree { arena, root: 0, order, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn max_keys(&self) -> usize {
        self.order - 1
    }

    fn min_keys(&self) -> usize {
        self.order.div_ceil(2) - 1
    }

    /// Insert `key`, comparing suffixes via `src`.
    pub fn add(&mut self, key: u32, src: &impl SuffixSource) {
        if self.root_is_full() {
            self.split_root();
        }
        self.insert_nonfull(self.root, key, src);
        self.len += 1;
    }

    /// Insert a key already known to be lexicographically >= every existing
    /// key (amortized faster: always descends the rightmost path, with no
    /// comparisons needed along the way). Caller guarantees the ordering
    /// invariant; this is purely a performance specialization of
    /// [`add`](Self::add).
    pub fn add_max(&mut self, key: u32, _src: &impl SuffixSource) {
        if self.root_is_full() {
            self.split_root();
        }
        self.insert_max_nonfull(self.root, key);
        self.len += 1;
    }

    /// Descend only the rightmost spine, splitting the rightmost child when
    /// full, and append `key` to the rightmost leaf's key list.
    fn insert_max_nonfull(&mut self, node: NodeId, key: u32) {
        let is_leaf = self.arena[node as usize].is_leaf();
        if is_leaf {
            self.arena[node as usize].keys.push(key);
            return;
        }
        let last = self.arena[node as usize].children.len() - 1;
        let child = self.arena[node as usize].children[last];
        if self.arena[child as usize].keys.len() == self.max_keys() {
            self.split_child(node, last);
            let new_last = self.arena[node as usize].children.len() - 1;
            let next = self.arena[node as usize].children[new_last];
            self.insert_max_nonfull(next, key);
        } else {
            self.insert_max_nonfull(child, key);
        }
    }

    pub fn delete(&mut self, key: u32, src: &impl SuffixSource) -> bool {
        if !self.contains(key, src) {
            return false;
        }
        self.delete_key(self.root, key, src);
        self.len -= 1;
        if !self.arena[self.root as usize].is_leaf() && self.arena[self.root as usize].keys.is_empty() {
            self.root = self.arena[self.root as usize].children[0];
        }
        true
    }

    pub fn contains(&self, key: u32, src: &impl SuffixSource) -> bool {
        self.find(self.root, key, src).is_some()
    }

    /// In-order traversal: positions whose suffixes are strictly increasing.
    pub fn in_order(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.len);
        self.in_order_from(self.root, &mut out);
        out
    }

    fn in_order_from(&self, node: NodeId, out: &mut Vec<u32>) {
        let n = &self.arena[node as usize];
        if n.is_leaf() {
            out.extend_from_slice(&n.keys);
            return;
        }
        for i in 0..n.keys.len() {
            self.in_order_from(n.children[i], out);
            out.push(n.keys[i]);
        }
        self.in_order_from(n.children[n.keys.len()], out);
    }

    fn root_is_full(&self) -> bool {
        self.arena[self.root as usize].keys.len() == self.max_keys()
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        self.arena.push(node);
        (self.arena.len() - 1) as u32
    }

    fn split_root(&mut self) {
        let old_root = self.root;
        let mut new_root = Node::leaf();
        new_root.children.push(old_root);
        let new_root_id = self.alloc(new_root);
        self.root = new_root_id;
        self.split_child(new_root_id, 0);
    }

    /// Split `node.children[i]`, which must be full, promoting its median
    /// key into `node`.
    fn split_child(&mut self, node: NodeId, i: usize) {
        let child_id = self.arena[node as usize].children[i];
        let mid = self.max_keys() / 2;
        let (median, right_keys, right_children) = {
            let child = &mut self.arena[child_id as usize];
            let median = child.keys[mid];
            let right_keys = child.keys.split_off(mid + 1);
            child.keys.truncate(mid);
            let right_children = if child.is_leaf() { Vec::new() } else { child.children.split_off(mid + 1) };
            (median, right_keys, right_children)
        };
        let right_is_leaf = right_children.is_empty() && self.arena[child_id as usize].is_leaf();
        let right_node =
            if right_is_leaf { Node { keys: right_keys, children: Vec::new() } } else { Node { keys: right_keys, children: right_children } };
        let right_id = self.alloc(right_node);
        let parent = &mut self.arena[node as usize];
        parent.keys.insert(i, median);
        parent.children.insert(i + 1, right_id);
    }

    fn insert_nonfull(&mut self, node: NodeId, key: u32, src: &impl SuffixSource) {
        let is_leaf = self.arena[node as usize].is_leaf();
        if is_leaf {
            let keys = &mut self.arena[node as usize].keys;
            let pos = keys.partition_point(|&k| src.compare(k, key) == std::cmp::Ordering::Less);
            keys.insert(pos, key);
            return;
        }
        let pos = {
            let keys = &self.arena[node as usize].keys;
            keys.partition_point(|&k| src.compare(k, key) == std::cmp::Ordering::Less)
        };
        let child = self.arena[node as usize].children[pos];
        if self.arena[child as usize].keys.len() == self.max_keys() {
            self.split_child(node, pos);
            // Median may now be the right split point; re-decide which side.
            let keys = &self.arena[node as usize].keys;
            let new_pos = keys.partition_point(|&k| src.compare(k, key) == std::cmp::Ordering::Less);
            let next = self.arena[node as usize].children[new_pos];
            self.insert_nonfull(next, key, src);
        } else {
            self.insert_nonfull(child, key, src);
        }
    }

    fn find(&self, node: NodeId, key: u32, src: &impl SuffixSource) -> Option<(NodeId, usize)> {
        let n = &self.arena[node as usize];
        let pos = n.keys.partition_point(|&k| src.compare(k, key) == std::cmp::Ordering::Less);
        if pos < n.keys.len() && src.compare(n.keys[pos], key) == std::cmp::Ordering::Equal {
            return Some((node, pos));
        }
        if n.is_leaf() {
            None
        } else {
            self.find(n.children[pos], key, src)
        }
    }

    fn delete_key(&mut self, node: NodeId, key: u32, src: &impl SuffixSource) {
        let n = &self.arena[node as usize];
        let pos = n.keys.partition_point(|&k| src.compare(k, key) == std::cmp::Ordering::Less);
        let found = pos < n.keys.len() && src.compare(n.keys[pos], key) == std::cmp::Ordering::Equal;

        if self.arena[node as usize].is_leaf() {
            if found {
                self.arena[node as usize].keys.remove(pos);
            }
            return;
        }

        if found {
            // Replace with in-order predecessor from the left subtree, then
            // delete the predecessor there.
            let left_child = self.arena[node as usize].children[pos];
            let pred = self.max_key(left_child);
            self.arena[node as usize].keys[pos] = pred;
            self.delete_key(left_child, pred, src);
            self.fix_child(node, pos);
        } else {
            let child = self.arena[node as usize].children[pos];
            self.delete_key(child, key, src);
            self.fix_child(node, pos);
        }
    }

    fn max_key(&self, node: NodeId) -> u32 {
        let n = &self.arena[node as usize];
        if n.is_leaf() {
            *n.keys.last().unwrap()
        } else {
            self.max_key(*n.children.last().unwrap())
        }
    }

    /// After a delete in `node.children[i]`, rebalance if it dropped below
    /// `min_keys` by borrowing from a sibling or merging.
    fn fix_child(&mut self, node: NodeId, i: usize) {
        let child = self.arena[node as usize].children[i];
        if self.arena[child as usize].keys.len() >= self.min_keys() {
            return;
        }
        let has_left = i > 0;
        let has_right = i + 1 < self.arena[node as usize].children.len();

        if has_left && self.arena[self.arena[node as usize].children[i - 1] as usize].keys.len() > self.min_keys() {
            self.borrow_from_left(node, i);
        } else if has_right
            && self.arena[self.arena[node as usize].children[i + 1] as usize].keys.len() > self.min_keys()
        {
            self.borrow_from_right(node, i);
        } else if has_left {
            self.merge_children(node, i - 1);
        } else if has_right {
            self.merge_children(node, i);
        }
    }

    fn borrow_from_left(&mut self, node: NodeId, i: usize) {
        let left_id = self.arena[node as usize].children[i - 1];
        let child_id = self.arena[node as usize].children[i];
        let sep = self.arena[node as usize].keys[i - 1];

        let moved_key = self.arena[left_id as usize].keys.pop().unwrap();
        let moved_child = if !self.arena[left_id as usize].is_leaf() {
            Some(self.arena[left_id as usize].children.pop().unwrap())
        } else {
            None
        };

        self.arena[node as usize].keys[i - 1] = moved_key;
        let child = &mut self.arena[child_id as usize];
        child.keys.insert(0, sep);
        if let Some(c) = moved_child {
            child.children.insert(0, c);
        }
    }

    fn borrow_from_right(&mut self, node: NodeId, i: usize) {
        let right_id = self.arena[node as usize].children[i + 1];
        let child_id = self.arena[node as usize].children[i];
        let sep = self.arena[node as usize].keys[i];

        let moved_key = {
            let right = &mut self.arena[right_id as usize];
            right.keys.remove(0)
        };
        let moved_child = if !self.arena[right_id as usize].is_leaf() {
            Some(self.arena[right_id as usize].children.remove(0))
        } else {
            None
        };

        self.arena[node as usize].keys[i] = moved_key;
        let child = &mut self.arena[child_id as usize];
        child.keys.push(sep);
        if let Some(c) = moved_child {
            child.children.push(c);
        }
    }

    /// Merge `node.children[i]` and `node.children[i+1]` (plus the
    /// separating key `node.keys[i]`) into one node.
    fn merge_children(&mut self, node: NodeId, i: usize) {
        let left_id = self.arena[node as usize].children[i];
        let right_id = self.arena[node as usize].children[i + 1];
        let sep = self.arena[node as usize].keys.remove(i);
        self.arena[node as usize].children.remove(i + 1);

        let right_keys = std::mem::take(&mut self.arena[right_id as usize].keys);
        let right_children = std::mem::take(&mut self.arena[right_id as usize].children);

        let left = &mut self.arena[left_id as usize];
        left.keys.push(sep);
        left.keys.extend(right_keys);
        left.children.extend(right_children);
        // `right_id` is now an orphaned, empty arena slot; the arena never
        // compacts (matching the eviction-without-free cost the arena
        // layout is chosen for), so it is simply never revisited.
    }

    /// Rebuild the tree by discarding every key `< delta` and subtracting
    /// `delta` from the rest, reinserting via `add_max` in ascending order
    /// — the amortized-fast path, since in-order traversal already yields
    /// ascending suffix order among the surviving keys.
    pub fn shift(&mut self, delta: u32, src: &impl SuffixSource) {
        let survivors: Vec<u32> = self.in_order().into_iter().filter(|&k| k >= delta).map(|k| k - delta).collect();
        self.arena.clear();
        self.arena.push(Node::leaf());
        self.root = 0;
        self.len = 0;
        for k in survivors {
            self.add_max(k, src);
        }
    }
}

/// Per-hash-slot collection of [`SuffixBTree`]s, keyed by the same
/// multiplicative hash as the flat indexes.
///
/// This does **not** implement [`super::Mapper`]: true lexicographic suffix
/// ordering needs more than the 8-byte prefix value `Mapper::put`/`get`
/// carry, so every method here takes the window slice explicitly. Callers
/// (the matcher's B-tree-specialized path) own the window and pass it at
/// each call, matching how `RingBuffer::window()` already hands out a flat
/// borrow.
pub struct BTreeMapperIndex {
    slots: Vec<SuffixBTree>,
    input_len: u32,
    hash_bits: u32,
    order: usize,
}

struct WindowSource<'a> {
    window: &'a [u8],
}

impl SuffixSource for WindowSource<'_> {
    fn compare(&self, k1: u32, k2: u32) -> std::cmp::Ordering {
        self.window[k1 as usize..].cmp(&self.window[k2 as usize..])
    }
}

impl BTreeMapperIndex {
    pub fn new(input_len: u32, hash_bits: u32, order: usize) -> Self {
        assert!((2..=8).contains(&input_len));
        assert!(hash_bits <= (8 * input_len).min(24));
        let slots = (0..1usize << hash_bits).map(|_| SuffixBTree::new(order)).collect();
        BTreeMapperIndex { slots, input_len, hash_bits, order }
    }

    fn slot(&self, le64_value: u64) -> usize {
        hash_prefix(le64_value, self.input_len, self.hash_bits) as usize
    }

    pub fn put(&mut self, pos: u32, le64_value: u64, window: &[u8]) {
        let slot = self.slot(le64_value);
        let src = WindowSource { window };
        self.slots[slot].add_max(pos, &src);
    }

    pub fn get(&self, le64_value: u64, window: &[u8], out: &mut Vec<u32>) {
        let slot = self.slot(le64_value);
        out.extend(self.slots[slot].in_order());
        let _ = window; // retained for symmetry with `put`/`shift`; ordering alone suffices for a candidate scan.
    }

    pub fn shift(&mut self, delta: u32, window_after_shift: &[u8]) {
        let src = WindowSource { window: window_after_shift };
        for s in &mut self.slots {
            s.shift(delta, &src);
        }
    }

    pub fn reset(&mut self) {
        self.slots = (0..self.slots.len()).map(|_| SuffixBTree::new(self.order)).collect();
    }
}

/// Window-position order for live B-tree testing: a simple byte-prefix
/// comparator over a provided slice, standing in for the real window.
#[cfg(test)]
struct SliceSource<'a>(&'a [u8]);

#[cfg(test)]
impl SuffixSource for SliceSource<'_> {
    fn compare(&self, k1: u32, k2: u32) -> std::cmp::Ordering {
        self.0[k1 as usize..].cmp(&self.0[k2 as usize..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_invariants(tree: &SuffixBTree, is_root: bool, node: NodeId) -> usize {
        let n = &tree.arena[node as usize];
        if !is_root {
            assert!(n.keys.len() >= tree.min_keys(), "node below min-keys");
        }
        assert!(n.keys.len() <= tree.max_keys(), "node above max-keys");
        if n.is_leaf() {
            return 1;
        }
        assert_eq!(n.children.len(), n.keys.len() + 1);
        let mut depth = None;
        for &c in &n.children {
            let d = check_invariants(tree, false, c);
            if let Some(prev) = depth {
                assert_eq!(prev, d, "unbalanced leaf depth");
            }
            depth = Some(d);
        }
        depth.unwrap() + 1
    }

    #[test]
    fn add_and_in_order_is_strictly_increasing_by_suffix() {
        let data = b"banana$apple$cherry$";
        let src = SliceSource(data);
        let mut tree = SuffixBTree::new(4);
        for pos in [0u32, 7, 13] {
            tree.add(pos, &src);
        }
        let order = tree.in_order();
        assert_eq!(order.len(), 3);
        for w in order.windows(2) {
            assert_eq!(src.compare(w[0], w[1]), std::cmp::Ordering::Less);
        }
        check_invariants(&tree, true, tree.root);
    }

    #[test]
    fn delete_preserves_invariants_and_order() {
        let data: Vec<u8> = (0u8..40).collect();
        let src = SliceSource(&data);
        let mut tree = SuffixBTree::new(3);
        for pos in 0u32..30 {
            tree.add(pos, &src);
        }
        for pos in (0u32..30).step_by(2) {
            assert!(tree.delete(pos, &src));
        }
        check_invariants(&tree, true, tree.root);
        let order = tree.in_order();
        assert_eq!(order.len(), 15);
        for w in order.windows(2) {
            assert_eq!(src.compare(w[0], w[1]), std::cmp::Ordering::Less);
        }
    }

    #[test]
    fn shift_drops_keys_below_delta_and_renumbers_rest() {
        let data: Vec<u8> = (0u8..60).map(|i| i % 7).collect();
        let src = SliceSource(&data);
        let mut tree = SuffixBTree::new(4);
        for pos in 0u32..40 {
            tree.add(pos, &src);
        }
        tree.shift(10, &src);
        assert_eq!(tree.len(), 30);
        for k in tree.in_order() {
            assert!((k as usize) < data.len());
        }
    }
}
