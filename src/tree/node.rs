//! Arena nodes and the handles callers see.

use smallvec::SmallVec;
use smallvec::smallvec;

use crate::color::ColorMask;

use super::Tree;

/// Index into the node arena.
pub(crate) type Idx = u32;
/// Sentinel value for no parent / no child.
pub(crate) const NONE: Idx = Idx::MAX;

/// Per-color subtree counters, inline for up to 8 colors.
pub(crate) type Counts = SmallVec<[usize; 8]>;

/// A run of `count` identical elements.
#[derive(Clone, Debug)]
pub(crate) struct Node<V, M> {
    /// Exactly one bit.
    pub(crate) color: M,
    /// Elements in this run. Zero marks a vacant arena slot.
    pub(crate) count: usize,
    /// `None` when the payload is not tracked.
    pub(crate) value: Option<V>,
    /// Whether this node takes part in sorted order.
    pub(crate) sorted: bool,
    pub(crate) left: Idx,
    pub(crate) right: Idx,
    pub(crate) parent: Idx,
    /// AVL height, 1 for a leaf.
    pub(crate) height: u8,
    /// Bumped each time the slot is freed.
    pub(crate) generation: u32,
    /// Elements of each color in this subtree, this node included.
    pub(crate) counts: Counts,
}

impl<V, M: ColorMask> Node<V, M> {
    pub(crate) fn new(
        colors: usize,
        color: M,
        count: usize,
        value: Option<V>,
        sorted: bool,
        generation: u32,
    ) -> Node<V, M> {
        let mut counts: Counts = smallvec![0; colors];
        counts[color.lowest_slot()] = count;
        return Node {
            color,
            count,
            value,
            sorted,
            left: NONE,
            right: NONE,
            parent: NONE,
            height: 1,
            generation,
            counts,
        };
    }

    #[inline(always)]
    pub(crate) fn is_vacant(&self) -> bool {
        return self.count == 0;
    }

    #[inline(always)]
    pub(crate) fn slot(&self) -> usize {
        return self.color.lowest_slot();
    }

    /// Width of this run alone in `colors` space.
    #[inline(always)]
    pub(crate) fn own_size(&self, colors: M) -> usize {
        if self.color.intersects(colors) {
            return self.count;
        }
        return 0;
    }
}

/// A generation-checked handle to a node.
///
/// Handles are cheap to copy and stay valid while their node is alive, even
/// across unrelated mutations. Once the node is removed, every call taking
/// the handle fails with `InvariantViolation`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: Idx,
    pub(crate) generation: u32,
}

/// A borrowed view of a live node.
pub struct NodeRef<'a, V, M> {
    pub(crate) tree: &'a Tree<V, M>,
    pub(crate) idx: Idx,
}

impl<V, M> Clone for NodeRef<'_, V, M> {
    fn clone(&self) -> Self {
        return *self;
    }
}

impl<V, M> Copy for NodeRef<'_, V, M> {}

impl<'a, V, M: ColorMask> NodeRef<'a, V, M> {
    #[inline(always)]
    fn node(&self) -> &'a Node<V, M> {
        return self.tree.node(self.idx);
    }

    pub fn id(&self) -> NodeId {
        return NodeId { index: self.idx, generation: self.node().generation };
    }

    pub fn color(&self) -> M {
        return self.node().color;
    }

    pub fn count(&self) -> usize {
        return self.node().count;
    }

    pub fn value(&self) -> Option<&'a V> {
        return self.node().value.as_ref();
    }

    pub fn is_sorted(&self) -> bool {
        return self.node().sorted;
    }

    /// Start index of this run in `colors` space.
    pub fn index(&self, colors: M) -> usize {
        return self.tree.index_of_idx(self.idx, colors);
    }
}

impl<V: std::fmt::Debug, M: ColorMask> std::fmt::Debug for NodeRef<'_, V, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let node = self.node();
        return f
            .debug_struct("NodeRef")
            .field("color", &format_args!("{:#b}", node.color))
            .field("count", &node.count)
            .field("value", &node.value)
            .field("sorted", &node.sorted)
            .finish();
    }
}
