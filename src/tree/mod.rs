//! Balanced multi-counter tree.
//!
//! An AVL tree over runs of elements. Each run carries one color, and every
//! node keeps, per color, the number of elements of that color in its
//! subtree. Those counters turn "index among the elements of colors X" into
//! an O(log n) descent, and the reverse into an O(log n) walk to the root.
//!
//! Structure:
//! - All nodes live in one `Vec` arena, addressed by `u32` indices
//! - Children and parents are arena indices (`NONE` for absent)
//! - Freed slots go on a free list and get a new generation
//!
//! Operations:
//! - add / remove / set at an index in any color space: O(log n) per run touched
//! - get / index_of / convert_index_color: O(log n)
//! - size: O(colors), read off the root
//!
//! ```text
//!             [C x2]                counts at root: A=5 B=8 C=5
//!            /      \
//!       [A x5]      [B x3]          sequence: AAAAA BBBBB CC BBB CCC
//!            \           \
//!           [B x5]      [C x3]
//! ```

mod iter;
mod node;
mod sorted;

use std::cmp::Ordering;
use std::fmt::Display;

use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::color::ColorCoder;
use crate::color::ColorMask;
use crate::color::check_mask;
use crate::color::check_single;
use crate::error::Result;
use crate::error::TreeError;

pub use iter::Iter;
pub use iter::TreeIterator;
pub use node::NodeId;
pub use node::NodeRef;
pub use sorted::Edge;

use node::Counts;
use node::Idx;
use node::NONE;
use node::Node;

/// Ordering used by the sorted operations.
pub type Comparator<V> = Box<dyn Fn(&V, &V) -> Ordering + Send + Sync>;

/// Where an index in some color space lands.
enum Spot {
    /// Between runs, right after the given node (`NONE` for the very front).
    Gap(Idx),
    /// Strictly inside a run, at this offset.
    Inside(Idx, usize),
}

/// A balanced tree of colored runs.
///
/// Mutations take `&mut self` and reads take `&self`, so the usual borrow
/// rules give the single-writer discipline for free. Wrap it in a lock to
/// share it between threads.
pub struct Tree<V, M = u8> {
    /// Node arena.
    nodes: Vec<Node<V, M>>,
    /// Vacant slots available for reuse.
    free_list: Vec<Idx>,
    root: Idx,
    /// Number of registered colors.
    colors: usize,
    /// Union of every registered color.
    all: M,
    /// Live nodes.
    len: usize,
    comparator: Option<Comparator<V>>,
}

impl<V, M: ColorMask> Tree<V, M> {
    /// An unordered tree over the coder's colors.
    pub fn new<L>(coder: &ColorCoder<L, M>) -> Tree<V, M>
    where
        L: Eq + std::hash::Hash + Clone + std::fmt::Debug,
    {
        return Tree::empty(coder.len());
    }

    /// An unordered tree over `colors` colors, for callers without a coder.
    /// Fails if `colors` exceeds the mask width.
    pub fn with_color_count(colors: usize) -> Result<Tree<V, M>> {
        if colors > M::BITS as usize {
            return Err(TreeError::violation(format!(
                "too many colors for a {}-bit mask",
                M::BITS
            )));
        }
        return Ok(Tree::empty(colors));
    }

    fn empty(colors: usize) -> Tree<V, M> {
        return Tree {
            nodes: Vec::new(),
            free_list: Vec::new(),
            root: NONE,
            colors,
            all: M::low_bits(colors),
            len: 0,
            comparator: None,
        };
    }

    /// A tree ordered by `comparator` for the sorted operations.
    pub fn with_comparator<L>(
        coder: &ColorCoder<L, M>,
        comparator: impl Fn(&V, &V) -> Ordering + Send + Sync + 'static,
    ) -> Tree<V, M>
    where
        L: Eq + std::hash::Hash + Clone + std::fmt::Debug,
    {
        let mut tree = Tree::new(coder);
        tree.comparator = Some(Box::new(comparator));
        return tree;
    }

    /// A tree ordered by `V`'s own `Ord`.
    pub fn ordered<L>(coder: &ColorCoder<L, M>) -> Tree<V, M>
    where
        L: Eq + std::hash::Hash + Clone + std::fmt::Debug,
        V: Ord + 'static,
    {
        return Tree::with_comparator(coder, |a: &V, b: &V| a.cmp(b));
    }

    /// Reserve arena space for `additional` more nodes.
    pub fn with_capacity(mut self, additional: usize) -> Tree<V, M> {
        self.nodes.reserve(additional);
        return self;
    }

    #[inline(always)]
    pub fn color_count(&self) -> usize {
        return self.colors;
    }

    #[inline(always)]
    pub fn all_colors(&self) -> M {
        return self.all;
    }

    /// Number of live nodes (runs), not elements.
    #[inline(always)]
    pub fn node_count(&self) -> usize {
        return self.len;
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        return self.root == NONE;
    }

    /// Number of elements whose color is in `colors`.
    #[inline]
    pub fn size(&self, colors: M) -> usize {
        return self.subtree_size(self.root, colors);
    }

    // --- Node access helpers ---

    #[inline(always)]
    pub(crate) fn node(&self, idx: Idx) -> &Node<V, M> {
        return &self.nodes[idx as usize];
    }

    #[inline(always)]
    fn node_mut(&mut self, idx: Idx) -> &mut Node<V, M> {
        return &mut self.nodes[idx as usize];
    }

    #[inline(always)]
    fn height(&self, idx: Idx) -> u8 {
        if idx == NONE {
            return 0;
        }
        return self.node(idx).height;
    }

    /// Elements of `colors` in the subtree rooted at `idx`.
    #[inline]
    fn subtree_size(&self, idx: Idx, colors: M) -> usize {
        if idx == NONE {
            return 0;
        }
        let counts = &self.node(idx).counts;
        if colors == self.all {
            return counts.iter().sum();
        }
        let mut size = 0;
        for (slot, count) in counts.iter().enumerate() {
            if colors.has_slot(slot) {
                size += count;
            }
        }
        return size;
    }

    #[inline(always)]
    fn own_size(&self, idx: Idx, colors: M) -> usize {
        return self.node(idx).own_size(colors);
    }

    fn id_of(&self, idx: Idx) -> NodeId {
        return NodeId { index: idx, generation: self.node(idx).generation };
    }

    /// Map a handle back to a live arena index.
    fn resolve(&self, id: NodeId) -> Result<Idx> {
        return match self.nodes.get(id.index as usize) {
            Some(node) if !node.is_vacant() && node.generation == id.generation => Ok(id.index),
            _ => Err(TreeError::violation(format!("stale node handle {id:?}"))),
        };
    }

    /// Borrow a live node by handle.
    pub fn node_ref(&self, id: NodeId) -> Result<NodeRef<'_, V, M>> {
        let idx = self.resolve(id)?;
        return Ok(NodeRef { tree: self, idx });
    }

    fn alloc(&mut self, color: M, count: usize, value: Option<V>, sorted: bool) -> Idx {
        self.len += 1;
        if let Some(idx) = self.free_list.pop() {
            let generation = self.node(idx).generation;
            self.nodes[idx as usize] = Node::new(self.colors, color, count, value, sorted, generation);
            return idx;
        }
        let idx = self.nodes.len() as Idx;
        self.nodes.push(Node::new(self.colors, color, count, value, sorted, 0));
        return idx;
    }

    /// Vacate a slot that is already unlinked, returning its payload.
    fn free(&mut self, idx: Idx) -> Option<V> {
        self.len -= 1;
        self.free_list.push(idx);
        let node = self.node_mut(idx);
        node.count = 0;
        node.generation = node.generation.wrapping_add(1);
        node.left = NONE;
        node.right = NONE;
        node.parent = NONE;
        return node.value.take();
    }

    // --- Navigation ---

    fn leftmost(&self, mut idx: Idx) -> Idx {
        while idx != NONE && self.node(idx).left != NONE {
            idx = self.node(idx).left;
        }
        return idx;
    }

    fn rightmost(&self, mut idx: Idx) -> Idx {
        while idx != NONE && self.node(idx).right != NONE {
            idx = self.node(idx).right;
        }
        return idx;
    }

    #[inline]
    pub(crate) fn first_idx(&self) -> Idx {
        return self.leftmost(self.root);
    }

    /// In-order successor.
    pub(crate) fn successor(&self, idx: Idx) -> Idx {
        let right = self.node(idx).right;
        if right != NONE {
            return self.leftmost(right);
        }
        let mut child = idx;
        let mut parent = self.node(idx).parent;
        while parent != NONE && self.node(parent).right == child {
            child = parent;
            parent = self.node(parent).parent;
        }
        return parent;
    }

    /// In-order predecessor.
    pub(crate) fn predecessor(&self, idx: Idx) -> Idx {
        let left = self.node(idx).left;
        if left != NONE {
            return self.rightmost(left);
        }
        let mut child = idx;
        let mut parent = self.node(idx).parent;
        while parent != NONE && self.node(parent).left == child {
            child = parent;
            parent = self.node(parent).parent;
        }
        return parent;
    }

    // --- Counter maintenance and rebalancing ---

    /// Recompute height and counters of `idx` from its children.
    fn update(&mut self, idx: Idx) {
        let (left, right) = {
            let node = self.node(idx);
            (node.left, node.right)
        };
        let height = 1 + self.height(left).max(self.height(right));
        let mut counts: Counts = smallvec::smallvec![0; self.colors];
        for child in [left, right] {
            if child != NONE {
                for (total, count) in counts.iter_mut().zip(&self.node(child).counts) {
                    *total += count;
                }
            }
        }
        let node = self.node_mut(idx);
        counts[node.slot()] += node.count;
        node.height = height;
        node.counts = counts;
    }

    /// Add `delta` to one color's counter on `idx` and all its ancestors.
    /// For count changes that leave the shape alone.
    fn adjust_counts(&mut self, idx: Idx, slot: usize, delta: isize) {
        let mut current = idx;
        while current != NONE {
            let node = self.node_mut(current);
            node.counts[slot] = (node.counts[slot] as isize + delta) as usize;
            current = node.parent;
        }
    }

    /// Point `parent`'s link that held `old` at `new` instead (or the root).
    fn replace_child(&mut self, parent: Idx, old: Idx, new: Idx) {
        if parent == NONE {
            self.root = new;
        } else if self.node(parent).left == old {
            self.node_mut(parent).left = new;
        } else {
            self.node_mut(parent).right = new;
        }
        if new != NONE {
            self.node_mut(new).parent = parent;
        }
    }

    fn rotate_left(&mut self, x: Idx) -> Idx {
        let y = self.node(x).right;
        let middle = self.node(y).left;
        self.node_mut(x).right = middle;
        if middle != NONE {
            self.node_mut(middle).parent = x;
        }
        let parent = self.node(x).parent;
        self.replace_child(parent, x, y);
        self.node_mut(y).left = x;
        self.node_mut(x).parent = y;
        self.update(x);
        self.update(y);
        return y;
    }

    fn rotate_right(&mut self, x: Idx) -> Idx {
        let y = self.node(x).left;
        let middle = self.node(y).right;
        self.node_mut(x).left = middle;
        if middle != NONE {
            self.node_mut(middle).parent = x;
        }
        let parent = self.node(x).parent;
        self.replace_child(parent, x, y);
        self.node_mut(y).right = x;
        self.node_mut(x).parent = y;
        self.update(x);
        self.update(y);
        return y;
    }

    /// Restore the AVL condition at `idx`, returning the subtree's new root.
    fn rebalance(&mut self, idx: Idx) -> Idx {
        let (left, right) = {
            let node = self.node(idx);
            (node.left, node.right)
        };
        let balance = self.height(left) as i32 - self.height(right) as i32;
        if balance > 1 {
            let inner = self.node(left);
            if self.height(inner.left) < self.height(inner.right) {
                self.rotate_left(left);
            }
            return self.rotate_right(idx);
        }
        if balance < -1 {
            let inner = self.node(right);
            if self.height(inner.right) < self.height(inner.left) {
                self.rotate_right(right);
            }
            return self.rotate_left(idx);
        }
        return idx;
    }

    /// Walk from `idx` to the root fixing counters, heights and balance.
    fn retrace(&mut self, idx: Idx) {
        let mut current = idx;
        while current != NONE {
            self.update(current);
            let top = self.rebalance(current);
            current = self.node(top).parent;
        }
    }

    /// Hang an allocated leaf right after `anchor` in order (`NONE`: first).
    fn link_after(&mut self, anchor: Idx, new: Idx) {
        if self.root == NONE {
            self.root = new;
            return;
        }
        let (parent, as_left) = if anchor == NONE {
            (self.first_idx(), true)
        } else if self.node(anchor).right == NONE {
            (anchor, false)
        } else {
            (self.leftmost(self.node(anchor).right), true)
        };
        if as_left {
            self.node_mut(parent).left = new;
        } else {
            self.node_mut(parent).right = new;
        }
        self.node_mut(new).parent = parent;
        self.retrace(parent);
    }

    /// Detach `idx` from the tree, keeping every other node's slot.
    fn unlink(&mut self, idx: Idx) {
        let (left, right, parent) = {
            let node = self.node(idx);
            (node.left, node.right, node.parent)
        };
        let retrace_from;
        if left == NONE || right == NONE {
            let child = if left != NONE { left } else { right };
            self.replace_child(parent, idx, child);
            retrace_from = parent;
        } else {
            // Splice the successor into this node's place.
            let successor = self.leftmost(right);
            if successor != right {
                let successor_parent = self.node(successor).parent;
                let successor_right = self.node(successor).right;
                self.replace_child(successor_parent, successor, successor_right);
                self.node_mut(successor).right = right;
                self.node_mut(right).parent = successor;
                retrace_from = successor_parent;
            } else {
                retrace_from = successor;
            }
            self.node_mut(successor).left = left;
            self.node_mut(left).parent = successor;
            self.replace_child(parent, idx, successor);
        }
        self.retrace(retrace_from);
    }

    // --- Positional queries ---

    /// The node holding `index` of `colors` space and the offset in its run.
    /// The caller guarantees `index < size(colors)`.
    fn locate_idx(&self, mut index: usize, colors: M) -> (Idx, usize) {
        let mut current = self.root;
        loop {
            let node = self.node(current);
            let left_size = self.subtree_size(node.left, colors);
            if index < left_size {
                current = node.left;
                continue;
            }
            index -= left_size;
            let own = node.own_size(colors);
            if index < own {
                return (current, index);
            }
            index -= own;
            current = node.right;
        }
    }

    /// Leftmost position whose rank in `colors` space is `index`.
    /// The caller guarantees `index <= size(colors)`.
    fn find_spot(&self, mut index: usize, colors: M) -> Spot {
        let mut current = self.root;
        let mut before = NONE;
        while current != NONE {
            let node = self.node(current);
            let left_size = self.subtree_size(node.left, colors);
            if index <= left_size {
                current = node.left;
                continue;
            }
            index -= left_size;
            let own = node.own_size(colors);
            if index < own {
                return Spot::Inside(current, index);
            }
            index -= own;
            before = current;
            current = node.right;
        }
        return Spot::Gap(before);
    }

    /// Number of `colors` elements before the node at `idx`.
    pub(crate) fn index_of_idx(&self, idx: Idx, colors: M) -> usize {
        let mut index = self.subtree_size(self.node(idx).left, colors);
        let mut child = idx;
        let mut parent = self.node(idx).parent;
        while parent != NONE {
            let node = self.node(parent);
            if node.right == child {
                index += self.subtree_size(node.left, colors) + node.own_size(colors);
            }
            child = parent;
            parent = node.parent;
        }
        return index;
    }

    fn check_index(&self, index: usize, colors: M) -> Result<()> {
        check_mask(colors, self.colors)?;
        let size = self.size(colors);
        if index >= size {
            return Err(TreeError::out_of_range(index, size));
        }
        return Ok(());
    }

    /// Check that `[index, index + count)` lies inside `colors` space.
    fn check_range(&self, index: usize, count: usize, colors: M) -> Result<()> {
        check_mask(colors, self.colors)?;
        let size = self.size(colors);
        if index > size || count > size - index {
            let last = index.saturating_add(count.max(1) - 1);
            return Err(TreeError::out_of_range(last, size));
        }
        return Ok(());
    }

    /// The node holding element `index` of `colors` space.
    pub fn get(&self, index: usize, colors: M) -> Result<NodeRef<'_, V, M>> {
        self.check_index(index, colors)?;
        let (idx, _) = self.locate_idx(index, colors);
        return Ok(NodeRef { tree: self, idx });
    }

    /// Like `get`, also returning the element's offset inside the run.
    pub fn locate(&self, index: usize, colors: M) -> Result<(NodeRef<'_, V, M>, usize)> {
        self.check_index(index, colors)?;
        let (idx, offset) = self.locate_idx(index, colors);
        return Ok((NodeRef { tree: self, idx }, offset));
    }

    /// Start index of a node in `colors` space.
    pub fn index_of(&self, id: NodeId, colors: M) -> Result<usize> {
        let idx = self.resolve(id)?;
        check_mask(colors, self.colors)?;
        return Ok(self.index_of_idx(idx, colors));
    }

    /// Express element `index` of `from` space as an index in `to` space.
    ///
    /// When the element's color is not in `to` this gives `None`, or with
    /// `simulated` the number of `to` elements before it, which is where it
    /// would sit if it were recolored into `to`.
    pub fn convert_index_color(
        &self,
        index: usize,
        from: M,
        to: M,
        simulated: bool,
    ) -> Result<Option<usize>> {
        self.check_index(index, from)?;
        check_mask(to, self.colors)?;
        let (idx, offset) = self.locate_idx(index, from);
        let start = self.index_of_idx(idx, to);
        if self.node(idx).color.intersects(to) {
            return Ok(Some(start + offset));
        }
        if simulated {
            return Ok(Some(start));
        }
        return Ok(None);
    }

    // --- Mutations that never compare values ---

    /// Remove `count` elements of `colors` starting at `index`.
    ///
    /// Elements of other colors lying between them stay put.
    pub fn remove(&mut self, index: usize, colors: M, count: usize) -> Result<()> {
        self.check_range(index, count, colors)?;
        self.remove_unchecked(index, colors, count);
        return Ok(());
    }

    fn remove_unchecked(&mut self, index: usize, colors: M, count: usize) {
        let mut remaining = count;
        let mut freed = 0usize;
        while remaining > 0 {
            let (idx, offset) = self.locate_idx(index, colors);
            let (run, slot) = {
                let node = self.node(idx);
                (node.count, node.slot())
            };
            let take = remaining.min(run - offset);
            if take == run {
                self.unlink(idx);
                self.free(idx);
                freed += 1;
            } else {
                self.node_mut(idx).count -= take;
                self.adjust_counts(idx, slot, -(take as isize));
            }
            remaining -= take;
        }
        trace!(index, count, freed, "removed elements");
        if freed > 1 {
            debug!(freed, nodes = self.len, "removal spanned several runs");
        }
    }

    /// Move a node to another color in place.
    pub fn set_color(&mut self, id: NodeId, color: M) -> Result<()> {
        let idx = self.resolve(id)?;
        let slot = check_single(color, self.colors)?;
        let (old_slot, count) = {
            let node = self.node(idx);
            (node.slot(), node.count)
        };
        if old_slot == slot {
            return Ok(());
        }
        self.node_mut(idx).color = color;
        self.adjust_counts(idx, old_slot, -(count as isize));
        self.adjust_counts(idx, slot, count as isize);
        return Ok(());
    }

    /// Include or exclude a node from sorted order.
    pub fn set_sorted(&mut self, id: NodeId, sorted: bool) -> Result<()> {
        let idx = self.resolve(id)?;
        self.node_mut(idx).sorted = sorted;
        return Ok(());
    }

    /// Replace the payload shared by every element of a run.
    pub fn set_value(&mut self, id: NodeId, value: Option<V>) -> Result<Option<V>> {
        let idx = self.resolve(id)?;
        return Ok(std::mem::replace(&mut self.node_mut(idx).value, value));
    }

    /// Remove everything. Outstanding handles become stale.
    pub fn clear(&mut self) {
        let live = self.len;
        for idx in 0..self.nodes.len() as Idx {
            if !self.node(idx).is_vacant() {
                self.free(idx);
            }
        }
        self.root = NONE;
        debug!(live, "cleared tree");
    }

    // --- Iteration and debugging ---

    /// Nodes whose color is in `colors`, in order.
    pub fn iter(&self, colors: M) -> Iter<'_, V, M> {
        return Iter::new(self, colors);
    }

    /// Values of the elements of `colors`, runs expanded.
    pub fn values(&self, colors: M) -> impl Iterator<Item = Option<&V>> + '_ {
        return self
            .iter(colors)
            .flat_map(|node| std::iter::repeat_n(node.value(), node.count()));
    }

    /// A cursor positioned before the first node.
    pub fn cursor(&self) -> TreeIterator<'_, V, M> {
        return TreeIterator::new(self);
    }

    /// One character per element: the first character of its color's label.
    /// For tests and debugging only.
    pub fn as_sequence_of_colors<L>(&self, coder: &ColorCoder<L, M>) -> String
    where
        L: Eq + std::hash::Hash + Clone + std::fmt::Debug + Display,
    {
        let mut result = String::new();
        for node in self.iter(self.all) {
            let letter = coder
                .byte_to_color(node.color())
                .ok()
                .and_then(|label| label.to_string().chars().next())
                .unwrap_or('?');
            for _ in 0..node.count() {
                result.push(letter);
            }
        }
        return result;
    }

    /// Check every structural invariant: links, heights, balance, counters.
    pub fn validate(&self) -> Result<()> {
        let result = self.validate_inner();
        if let Err(error) = &result {
            warn!(%error, "tree failed validation");
        }
        return result;
    }

    fn validate_inner(&self) -> Result<()> {
        if self.root != NONE && self.node(self.root).parent != NONE {
            return Err(TreeError::violation("root has a parent"));
        }
        let mut seen = 0usize;
        self.validate_subtree(self.root, &mut seen)?;
        if seen != self.len {
            return Err(TreeError::violation(format!(
                "reached {seen} nodes but {} are live",
                self.len
            )));
        }
        return Ok(());
    }

    /// Returns the subtree's height.
    fn validate_subtree(&self, idx: Idx, seen: &mut usize) -> Result<u8> {
        if idx == NONE {
            return Ok(0);
        }
        *seen += 1;
        let node = self.node(idx);
        if node.is_vacant() {
            return Err(TreeError::violation(format!("vacant node {idx} is linked")));
        }
        if !node.color.is_single() || node.slot() >= self.colors {
            return Err(TreeError::violation(format!("node {idx} has color {:#b}", node.color)));
        }
        for child in [node.left, node.right] {
            if child != NONE && self.node(child).parent != idx {
                return Err(TreeError::violation(format!("child {child} does not point back at {idx}")));
            }
        }
        let left = self.validate_subtree(node.left, seen)?;
        let right = self.validate_subtree(node.right, seen)?;
        if left.abs_diff(right) > 1 {
            return Err(TreeError::violation(format!("node {idx} is unbalanced ({left} vs {right})")));
        }
        let height = 1 + left.max(right);
        if node.height != height {
            return Err(TreeError::violation(format!(
                "node {idx} records height {} but has {height}",
                node.height
            )));
        }
        for slot in 0..self.colors {
            let mut expected = 0;
            for child in [node.left, node.right] {
                if child != NONE {
                    expected += self.node(child).counts[slot];
                }
            }
            if node.slot() == slot {
                expected += node.count;
            }
            if node.counts[slot] != expected {
                return Err(TreeError::violation(format!(
                    "node {idx} counts {} of color {slot}, expected {expected}",
                    node.counts[slot]
                )));
            }
        }
        return Ok(height);
    }
}

impl<V: Clone + PartialEq, M: ColorMask> Tree<V, M> {
    /// Whether a new run could be folded into the node at `idx`.
    fn can_merge(&self, idx: Idx, color: M, value: &Option<V>) -> bool {
        let node = self.node(idx);
        return node.sorted && node.color == color && node.value == *value;
    }

    /// Lengthen a run in place.
    fn grow(&mut self, idx: Idx, count: usize) {
        let slot = self.node(idx).slot();
        self.node_mut(idx).count += count;
        self.adjust_counts(idx, slot, count as isize);
    }

    /// Cut the run at `idx` after `offset` elements, the rest becoming a new
    /// node right after it.
    fn split(&mut self, idx: Idx, offset: usize) {
        let (color, rest, value, sorted) = {
            let node = self.node(idx);
            (node.color, node.count - offset, node.value.clone(), node.sorted)
        };
        self.node_mut(idx).count = offset;
        self.adjust_counts(idx, color.lowest_slot(), -(rest as isize));
        let tail = self.alloc(color, rest, value, sorted);
        self.link_after(idx, tail);
    }

    /// Put a run into the gap after `before`, merging into the left neighbor
    /// if it can, otherwise into the right one.
    fn insert_after(&mut self, before: Idx, color: M, value: Option<V>, count: usize) -> Idx {
        if before != NONE && self.can_merge(before, color, &value) {
            self.grow(before, count);
            trace!(count, "merged run into left neighbor");
            return before;
        }
        let after = if before == NONE { self.first_idx() } else { self.successor(before) };
        if after != NONE && self.can_merge(after, color, &value) {
            self.grow(after, count);
            trace!(count, "merged run into right neighbor");
            return after;
        }
        let idx = self.alloc(color, count, value, true);
        self.link_after(before, idx);
        trace!(count, nodes = self.len, "inserted new run");
        return idx;
    }

    /// Insert `count` elements of `value` colored `color` at `index` of
    /// `colors` space, returning the node that now holds them.
    pub fn add(
        &mut self,
        index: usize,
        colors: M,
        color: M,
        value: Option<V>,
        count: usize,
    ) -> Result<NodeId> {
        check_mask(colors, self.colors)?;
        check_single(color, self.colors)?;
        if count == 0 {
            return Err(TreeError::violation("cannot insert an empty run"));
        }
        let size = self.size(colors);
        if index > size {
            return Err(TreeError::out_of_range(index, size));
        }
        let idx = self.add_unchecked(index, colors, color, value, count);
        return Ok(self.id_of(idx));
    }

    fn add_unchecked(&mut self, index: usize, colors: M, color: M, value: Option<V>, count: usize) -> Idx {
        let (idx, offset) = match self.find_spot(index, colors) {
            Spot::Gap(before) => return self.insert_after(before, color, value, count),
            Spot::Inside(idx, offset) => (idx, offset),
        };
        if self.can_merge(idx, color, &value) {
            self.grow(idx, count);
            return idx;
        }
        self.split(idx, offset);
        trace!(offset, "split run");
        let new = self.alloc(color, count, value, true);
        self.link_after(idx, new);
        return new;
    }

    /// Replace `count` elements of `colors` starting at `index` with a run
    /// of `value` colored `color`, in the same place.
    pub fn set(
        &mut self,
        index: usize,
        colors: M,
        color: M,
        value: Option<V>,
        count: usize,
    ) -> Result<NodeId> {
        check_single(color, self.colors)?;
        if count == 0 {
            return Err(TreeError::violation("cannot set an empty run"));
        }
        self.check_range(index, count, colors)?;
        let (idx, offset) = self.locate_idx(index, colors);
        let at = self.index_of_idx(idx, self.all) + offset;
        self.remove_unchecked(index, colors, count);
        let all = self.all;
        let idx = self.add_unchecked(at, all, color, value, count);
        return Ok(self.id_of(idx));
    }
}
