//! Walking the tree in order.

use crate::color::ColorMask;

use super::Tree;
use super::node::Idx;
use super::node::NONE;
use super::node::NodeRef;

impl<V, M: ColorMask> Tree<V, M> {
    /// The first node after `idx` holding an element of `colors`
    /// (`idx == NONE`: the first such node overall).
    fn next_node_in(&self, idx: Idx, colors: M) -> Idx {
        let index = if idx == NONE {
            0
        } else {
            self.index_of_idx(idx, colors) + self.own_size(idx, colors)
        };
        if index >= self.size(colors) {
            return NONE;
        }
        return self.locate_idx(index, colors).0;
    }

    /// The last node before `idx` holding an element of `colors`.
    fn previous_node_in(&self, idx: Idx, colors: M) -> Idx {
        let index = self.index_of_idx(idx, colors);
        if index == 0 {
            return NONE;
        }
        return self.locate_idx(index - 1, colors).0;
    }
}

/// A cursor over the elements of a tree.
///
/// Starts before the first element. Every step takes the mask it filters
/// by, so one cursor can walk several color spaces. A step that finds
/// nothing leaves the cursor where it was. Neighbors are found through the
/// subtree counters, so each step is O(log n) however sparse the color.
pub struct TreeIterator<'a, V, M> {
    tree: &'a Tree<V, M>,
    /// Current node, `NONE` before the first step.
    node: Idx,
    /// Offset of the current element inside `node`'s run.
    offset: usize,
}

impl<'a, V, M: ColorMask> TreeIterator<'a, V, M> {
    pub(crate) fn new(tree: &'a Tree<V, M>) -> TreeIterator<'a, V, M> {
        return TreeIterator { tree, node: NONE, offset: 0 };
    }

    #[inline(always)]
    fn in_colors(&self, colors: M) -> bool {
        return self.node != NONE && self.tree.node(self.node).color.intersects(colors);
    }

    pub fn has_next(&self, colors: M) -> bool {
        if self.in_colors(colors) && self.offset + 1 < self.tree.node(self.node).count {
            return true;
        }
        return self.has_next_node(colors);
    }

    /// Step to the next element of `colors`, returning its node.
    pub fn next(&mut self, colors: M) -> Option<NodeRef<'a, V, M>> {
        if self.in_colors(colors) && self.offset + 1 < self.tree.node(self.node).count {
            self.offset += 1;
            return Some(NodeRef { tree: self.tree, idx: self.node });
        }
        return self.next_node(colors);
    }

    pub fn has_next_node(&self, colors: M) -> bool {
        return self.tree.next_node_in(self.node, colors) != NONE;
    }

    /// Step to the first element of the next node of `colors`.
    pub fn next_node(&mut self, colors: M) -> Option<NodeRef<'a, V, M>> {
        let next = self.tree.next_node_in(self.node, colors);
        if next == NONE {
            return None;
        }
        self.node = next;
        self.offset = 0;
        return Some(NodeRef { tree: self.tree, idx: next });
    }

    pub fn has_previous(&self, colors: M) -> bool {
        if self.node == NONE {
            return false;
        }
        if self.in_colors(colors) && self.offset > 0 {
            return true;
        }
        return self.tree.previous_node_in(self.node, colors) != NONE;
    }

    /// Step back to the previous element of `colors`, returning its node.
    pub fn previous(&mut self, colors: M) -> Option<NodeRef<'a, V, M>> {
        if self.node == NONE {
            return None;
        }
        if self.in_colors(colors) && self.offset > 0 {
            self.offset -= 1;
            return Some(NodeRef { tree: self.tree, idx: self.node });
        }
        let previous = self.tree.previous_node_in(self.node, colors);
        if previous == NONE {
            return None;
        }
        self.node = previous;
        self.offset = self.tree.node(previous).count - 1;
        return Some(NodeRef { tree: self.tree, idx: previous });
    }

    /// Index of the current element in `colors` space. When the current
    /// node is not in `colors`, the number of `colors` elements before it.
    pub fn index(&self, colors: M) -> Option<usize> {
        if self.node == NONE {
            return None;
        }
        let start = self.tree.index_of_idx(self.node, colors);
        if self.in_colors(colors) {
            return Some(start + self.offset);
        }
        return Some(start);
    }

    pub fn node(&self) -> Option<NodeRef<'a, V, M>> {
        if self.node == NONE {
            return None;
        }
        return Some(NodeRef { tree: self.tree, idx: self.node });
    }

    #[inline(always)]
    pub fn offset(&self) -> usize {
        return self.offset;
    }
}

/// Iterator over the nodes of some colors, in order.
pub struct Iter<'a, V, M> {
    tree: &'a Tree<V, M>,
    next: Idx,
    colors: M,
}

impl<'a, V, M: ColorMask> Iter<'a, V, M> {
    pub(crate) fn new(tree: &'a Tree<V, M>, colors: M) -> Iter<'a, V, M> {
        return Iter { tree, next: tree.first_idx(), colors };
    }
}

impl<'a, V, M: ColorMask> Iterator for Iter<'a, V, M> {
    type Item = NodeRef<'a, V, M>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next != NONE {
            let idx = self.next;
            self.next = self.tree.successor(idx);
            if self.tree.node(idx).color.intersects(self.colors) {
                return Some(NodeRef { tree: self.tree, idx });
            }
        }
        return None;
    }
}
