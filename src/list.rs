//! An ordinary indexable list on top of one color space.
//!
//! ```
//! use tinted::color::ColorCoder;
//! use tinted::tree::Tree;
//!
//! let coder: ColorCoder<&str> = ColorCoder::new(["hidden", "shown"]).unwrap();
//! let shown = coder.color_to_byte(&"shown").unwrap();
//! let hidden = coder.color_to_byte(&"hidden").unwrap();
//!
//! let mut tree = Tree::new(&coder);
//! tree.add(0, coder.all_colors(), hidden, Some("draft"), 1).unwrap();
//!
//! let mut list = tree.view(shown, shown).unwrap();
//! list.push("intro").unwrap();
//! list.push("outro").unwrap();
//! assert_eq!(list.len(), 2);
//! assert_eq!(list.get(1), Ok(Some(&"outro")));
//! assert_eq!(list.index_of(&"draft"), None);
//! ```

use crate::color::ColorMask;
use crate::color::check_mask;
use crate::color::check_single;
use crate::error::Result;
use crate::tree::NodeId;
use crate::tree::NodeRef;
use crate::tree::Tree;

/// A tree seen as a list of the elements of `colors`, with new elements
/// colored `color`.
pub struct ListView<'a, V, M = u8> {
    tree: &'a mut Tree<V, M>,
    colors: M,
    color: M,
}

impl<V, M: ColorMask> Tree<V, M> {
    /// Borrow the tree as a list indexed in `index_colors` space, inserting
    /// new elements as `color`.
    pub fn view(&mut self, index_colors: M, color: M) -> Result<ListView<'_, V, M>> {
        check_mask(index_colors, self.color_count())?;
        check_single(color, self.color_count())?;
        return Ok(ListView { tree: self, colors: index_colors, color });
    }
}

impl<'a, V, M: ColorMask> ListView<'a, V, M> {
    #[inline(always)]
    pub fn colors(&self) -> M {
        return self.colors;
    }

    #[inline(always)]
    pub fn color(&self) -> M {
        return self.color;
    }

    pub fn len(&self) -> usize {
        return self.tree.size(self.colors);
    }

    pub fn is_empty(&self) -> bool {
        return self.len() == 0;
    }

    /// The value at `index`, `None` if that element's value is untracked.
    pub fn get(&self, index: usize) -> Result<Option<&V>> {
        return Ok(self.tree.get(index, self.colors)?.value());
    }

    /// The runs of this list, in order.
    pub fn iter(&self) -> impl Iterator<Item = NodeRef<'_, V, M>> + '_ {
        return self.tree.iter(self.colors);
    }
}

impl<'a, V: Clone + PartialEq, M: ColorMask> ListView<'a, V, M> {
    /// Insert one element before `index`.
    pub fn add(&mut self, index: usize, value: V) -> Result<NodeId> {
        return self.tree.add(index, self.colors, self.color, Some(value), 1);
    }

    /// Append one element.
    pub fn push(&mut self, value: V) -> Result<NodeId> {
        let end = self.len();
        return self.add(end, value);
    }

    /// Remove the element at `index`, returning its value.
    pub fn remove(&mut self, index: usize) -> Result<Option<V>> {
        let value = self.tree.get(index, self.colors)?.value().cloned();
        self.tree.remove(index, self.colors, 1)?;
        return Ok(value);
    }

    /// Replace the element at `index`, returning the old value. The new
    /// element takes this view's color.
    pub fn set(&mut self, index: usize, value: V) -> Result<Option<V>> {
        let old = self.tree.get(index, self.colors)?.value().cloned();
        self.tree.set(index, self.colors, self.color, Some(value), 1)?;
        return Ok(old);
    }

    /// Index of the first element equal to `value`. Linear in the number of
    /// runs.
    pub fn index_of(&self, value: &V) -> Option<usize> {
        let mut index = 0;
        for node in self.tree.iter(self.colors) {
            if node.value() == Some(value) {
                return Some(index);
            }
            index += node.count();
        }
        return None;
    }
}
