//! Tinted - a balanced run-length tree whose elements carry colors.
//!
//! Each element belongs to exactly one color, and every index the tree hands
//! out is measured in a *color space*: the elements whose color is in some
//! mask, with everything else skipped. That makes one tree serve as the
//! backing store for several views of the same sequence (a source list, its
//! filtered view, its sorted view) and lets callers translate positions
//! between them in logarithmic time.
//!
//! # Quick Start
//!
//! ```
//! use tinted::color::ColorCoder;
//! use tinted::tree::Tree;
//!
//! let coder: ColorCoder<&str> = ColorCoder::new(["filtered", "visible"]).unwrap();
//! let filtered = coder.color_to_byte(&"filtered").unwrap();
//! let visible = coder.color_to_byte(&"visible").unwrap();
//! let all = coder.all_colors();
//!
//! let mut tree = Tree::new(&coder);
//! tree.add(0, all, visible, Some("a"), 3).unwrap();
//! tree.add(3, all, filtered, Some("b"), 2).unwrap();
//! tree.add(5, all, visible, Some("c"), 1).unwrap();
//!
//! assert_eq!(tree.as_sequence_of_colors(&coder), "vvvffv");
//! assert_eq!(tree.size(visible), 4);
//! // The "c" at position 5 overall is position 3 among the visible ones.
//! assert_eq!(tree.convert_index_color(5, all, visible, false), Ok(Some(3)));
//! ```

pub mod color;
pub mod error;
pub mod list;
pub mod tree;

pub use color::ColorCoder;
pub use color::ColorMask;
pub use error::Result;
pub use error::TreeError;
pub use list::ListView;
pub use tree::Edge;
pub use tree::NodeId;
pub use tree::NodeRef;
pub use tree::Tree;
