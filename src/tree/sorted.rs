//! Value-ordered insertion and lookup.
//!
//! Only *considered* nodes take part in comparisons: sorted nodes with a
//! known value whose color is in the operation's mask. Everything else is an
//! opaque gap the descent steers around. With no opaque nodes on the path a
//! descent is a plain O(log n) binary search. An opaque node on the path
//! costs a counter-guided lookup of the nearest considered node in its
//! neighbor subtree, so runs of other colors are skipped wholesale and only
//! unsorted or unknown runs of the mask are stepped over one by one.

use std::cmp::Ordering;

use crate::color::ColorMask;
use crate::color::check_mask;
use crate::color::check_single;
use crate::error::Result;
use crate::error::TreeError;

use super::Comparator;
use super::NodeId;
use super::Tree;
use super::node::Idx;
use super::node::NONE;

/// Which end of a run of equal values `index_of_value` reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    First,
    Last,
}

impl<V, M: ColorMask> Tree<V, M> {
    fn comparator(&self) -> Result<&Comparator<V>> {
        return self.comparator.as_ref().ok_or(TreeError::Unordered);
    }

    #[inline]
    fn is_considered(&self, idx: Idx, colors: M) -> bool {
        let node = self.node(idx);
        return node.sorted && node.value.is_some() && node.color.intersects(colors);
    }

    /// Compare a considered node's value against `value`.
    #[inline]
    fn compare_node(&self, cmp: &Comparator<V>, idx: Idx, value: &V) -> Ordering {
        return match &self.node(idx).value {
            Some(stored) => cmp(stored, value),
            None => Ordering::Less,
        };
    }

    /// Rank in `colors` space of the first element of the subtree at `idx`.
    #[inline]
    fn subtree_start(&self, idx: Idx, colors: M) -> usize {
        return self.index_of_idx(idx, colors) - self.subtree_size(self.node(idx).left, colors);
    }

    /// First considered node of the subtree at `idx`, in order.
    ///
    /// Steps through the subtree's `colors` runs by rank, so nodes of other
    /// colors are never visited. Only unsorted or `None` runs of `colors`
    /// cost a step each.
    fn first_considered(&self, idx: Idx, colors: M) -> Idx {
        let size = self.subtree_size(idx, colors);
        if size == 0 {
            return NONE;
        }
        let mut rank = self.subtree_start(idx, colors);
        let end = rank + size;
        while rank < end {
            let (current, offset) = self.locate_idx(rank, colors);
            if self.is_considered(current, colors) {
                return current;
            }
            rank += self.node(current).count - offset;
        }
        return NONE;
    }

    /// Last considered node of the subtree at `idx`, in order.
    fn last_considered(&self, idx: Idx, colors: M) -> Idx {
        let size = self.subtree_size(idx, colors);
        if size == 0 {
            return NONE;
        }
        let start = self.subtree_start(idx, colors);
        let mut rank = start + size;
        while rank > start {
            let (current, offset) = self.locate_idx(rank - 1, colors);
            if self.is_considered(current, colors) {
                return current;
            }
            rank -= offset + 1;
        }
        return NONE;
    }

    /// The last considered node whose value is `<= value`.
    fn last_at_most(&self, cmp: &Comparator<V>, value: &V, colors: M) -> Idx {
        let mut best = NONE;
        let mut current = self.root;
        while current != NONE {
            let node = self.node(current);
            if self.is_considered(current, colors) {
                if self.compare_node(cmp, current, value) != Ordering::Greater {
                    best = current;
                    current = node.right;
                } else {
                    current = node.left;
                }
                continue;
            }
            // Opaque: the answer is on the right only if the right subtree
            // starts with a small enough value.
            let nearest = self.first_considered(node.right, colors);
            if nearest != NONE && self.compare_node(cmp, nearest, value) != Ordering::Greater {
                current = node.right;
            } else {
                current = node.left;
            }
        }
        return best;
    }

    /// The first considered node whose value is `>= value`.
    fn first_at_least(&self, cmp: &Comparator<V>, value: &V, colors: M) -> Idx {
        let mut best = NONE;
        let mut current = self.root;
        while current != NONE {
            let node = self.node(current);
            if self.is_considered(current, colors) {
                if self.compare_node(cmp, current, value) != Ordering::Less {
                    best = current;
                    current = node.left;
                } else {
                    current = node.right;
                }
                continue;
            }
            let nearest = self.last_considered(node.left, colors);
            if nearest != NONE && self.compare_node(cmp, nearest, value) != Ordering::Less {
                current = node.left;
            } else {
                current = node.right;
            }
        }
        return best;
    }

    /// Index in `colors` space of the first or last element equal to
    /// `value`, comparing only sorted nodes of `colors`.
    ///
    /// On a miss this is `None`, or with `simulated` the index at which
    /// `value` would be inserted. That answers "how many elements are below
    /// this value" without touching the tree.
    pub fn index_of_value(
        &self,
        value: &V,
        edge: Edge,
        simulated: bool,
        colors: M,
    ) -> Result<Option<usize>> {
        let cmp = self.comparator()?;
        check_mask(colors, self.colors)?;
        let anchor = self.last_at_most(cmp, value, colors);
        let end = if anchor == NONE {
            0
        } else {
            self.index_of_idx(anchor, colors) + self.node(anchor).count
        };
        let hit = anchor != NONE && self.compare_node(cmp, anchor, value) == Ordering::Equal;
        if !hit {
            // A miss reports where `add_in_sorted_order` would put `value`.
            return Ok(simulated.then_some(end));
        }
        return match edge {
            Edge::Last => Ok(Some(end - 1)),
            Edge::First => {
                let first = self.first_at_least(cmp, value, colors);
                Ok(Some(self.index_of_idx(first, colors)))
            }
        };
    }
}

impl<V: Clone + PartialEq, M: ColorMask> Tree<V, M> {
    /// Insert `count` elements of `value` colored `color`, after every
    /// sorted element of `allowed` that is not greater than `value`.
    ///
    /// Equal values keep insertion order, and the new run merges with the
    /// last equal run when it shares its color.
    pub fn add_in_sorted_order(
        &mut self,
        allowed: M,
        color: M,
        value: V,
        count: usize,
    ) -> Result<NodeId> {
        let cmp = self.comparator()?;
        check_mask(allowed, self.colors)?;
        check_single(color, self.colors)?;
        if count == 0 {
            return Err(TreeError::violation("cannot insert an empty run"));
        }
        let before = self.last_at_most(cmp, &value, allowed);
        let idx = self.insert_after(before, color, Some(value), count);
        return Ok(self.id_of(idx));
    }
}
