//! Colors and the coder that maps labels onto them.
//!
//! A color is a single bit of a small unsigned integer. A set of colors is
//! the bitwise OR of their bits. The coder assigns bit `i` to the `i`-th
//! label it was built from, so a `u8` mask holds up to 8 colors, a `u16` up
//! to 16, and so on.
//!
//! ```
//! use tinted::color::ColorCoder;
//!
//! let coder: ColorCoder<&str> = ColorCoder::new(["filtered", "source"]).unwrap();
//! let filtered = coder.color_to_byte(&"filtered").unwrap();
//! assert_eq!(filtered, 0b01);
//! assert_eq!(coder.all_colors(), 0b11);
//! ```

use std::fmt::Binary;
use std::fmt::Debug;
use std::hash::Hash;
use std::ops::BitAnd;
use std::ops::BitOr;
use std::ops::Not;

use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::error::TreeError;

/// An unsigned integer used as a bit set of colors.
pub trait ColorMask:
    Copy
    + Eq
    + Hash
    + Debug
    + Binary
    + Default
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + Not<Output = Self>
    + Send
    + Sync
    + 'static
{
    /// Number of distinct colors this width can hold.
    const BITS: u32;

    /// The empty set.
    const EMPTY: Self;

    /// The mask with only bit `slot` set.
    fn bit(slot: usize) -> Self;

    /// The mask with the lowest `n` bits set.
    fn low_bits(n: usize) -> Self;

    /// Number of set bits.
    fn ones(self) -> u32;

    /// Index of the lowest set bit.
    fn lowest_slot(self) -> usize;

    #[inline(always)]
    fn is_single(self) -> bool {
        return self.ones() == 1;
    }

    /// Whether the two sets share any color.
    #[inline(always)]
    fn intersects(self, other: Self) -> bool {
        return self & other != Self::EMPTY;
    }

    #[inline(always)]
    fn has_slot(self, slot: usize) -> bool {
        return self.intersects(Self::bit(slot));
    }
}

macro_rules! impl_color_mask {
    ($($ty:ty),*) => {
        $(
            impl ColorMask for $ty {
                const BITS: u32 = <$ty>::BITS;
                const EMPTY: Self = 0;

                #[inline(always)]
                fn bit(slot: usize) -> Self {
                    return 1 << slot;
                }

                #[inline(always)]
                fn low_bits(n: usize) -> Self {
                    if n as u32 >= <$ty>::BITS {
                        return <$ty>::MAX;
                    }
                    return (1 << n) - 1;
                }

                #[inline(always)]
                fn ones(self) -> u32 {
                    return self.count_ones();
                }

                #[inline(always)]
                fn lowest_slot(self) -> usize {
                    return self.trailing_zeros() as usize;
                }
            }
        )*
    };
}

impl_color_mask!(u8, u16, u32, u64);

/// Reject masks that are empty, multi-bit, or outside the first `colors` bits.
pub(crate) fn check_single<M: ColorMask>(mask: M, colors: usize) -> Result<usize> {
    if !mask.is_single() || mask.intersects(!M::low_bits(colors)) {
        return Err(TreeError::unknown(format!("{mask:#b}")));
    }
    return Ok(mask.lowest_slot());
}

/// Reject masks with bits outside the first `colors` bits.
pub(crate) fn check_mask<M: ColorMask>(mask: M, colors: usize) -> Result<()> {
    if mask.intersects(!M::low_bits(colors)) {
        return Err(TreeError::unknown(format!("{mask:#b}")));
    }
    return Ok(());
}

/// Maps labels to color masks and back.
///
/// Built once from an ordered list of distinct labels and immutable after.
#[derive(Clone, Debug)]
pub struct ColorCoder<L, M = u8> {
    /// Map from label to bit index.
    label_to_slot: FxHashMap<L, usize>,
    /// Map from bit index to label.
    slot_to_label: Vec<L>,
    all: M,
}

impl<L, M> ColorCoder<L, M>
where
    L: Eq + Hash + Clone + Debug,
    M: ColorMask,
{
    /// Build a coder. Fails if a label repeats or there are more labels than
    /// the mask has bits.
    pub fn new(labels: impl IntoIterator<Item = L>) -> Result<ColorCoder<L, M>> {
        let mut label_to_slot = FxHashMap::default();
        let mut slot_to_label = Vec::new();
        for label in labels {
            let slot = slot_to_label.len();
            if slot as u32 >= M::BITS {
                return Err(TreeError::violation(format!(
                    "too many colors for a {}-bit mask",
                    M::BITS
                )));
            }
            if label_to_slot.insert(label.clone(), slot).is_some() {
                return Err(TreeError::violation(format!("duplicate color {label:?}")));
            }
            slot_to_label.push(label);
        }
        let all = M::low_bits(slot_to_label.len());
        return Ok(ColorCoder { label_to_slot, slot_to_label, all });
    }

    /// The single-bit mask for a label.
    pub fn color_to_byte(&self, label: &L) -> Result<M> {
        return match self.label_to_slot.get(label) {
            Some(&slot) => Ok(M::bit(slot)),
            None => Err(TreeError::unknown(format!("{label:?}"))),
        };
    }

    /// The label for a single-bit mask.
    pub fn byte_to_color(&self, mask: M) -> Result<&L> {
        let slot = check_single(mask, self.len())?;
        return Ok(&self.slot_to_label[slot]);
    }

    /// The union of the given labels' bits.
    pub fn colors_to_byte<'a>(&self, labels: impl IntoIterator<Item = &'a L>) -> Result<M>
    where
        L: 'a,
    {
        let mut mask = M::EMPTY;
        for label in labels {
            mask = mask | self.color_to_byte(label)?;
        }
        return Ok(mask);
    }

    /// The labels making up a mask, in registration order.
    pub fn byte_to_colors(&self, mask: M) -> Result<Vec<&L>> {
        check_mask(mask, self.len())?;
        return Ok(self
            .slot_to_label
            .iter()
            .enumerate()
            .filter(|(slot, _)| mask.has_slot(*slot))
            .map(|(_, label)| label)
            .collect());
    }

    /// The union of every registered color.
    #[inline(always)]
    pub fn all_colors(&self) -> M {
        return self.all;
    }

    /// Number of registered colors.
    #[inline(always)]
    pub fn len(&self) -> usize {
        return self.slot_to_label.len();
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        return self.slot_to_label.is_empty();
    }

    /// Labels in registration order.
    pub fn labels(&self) -> &[L] {
        return &self.slot_to_label;
    }
}
