//! Connected-region segmentation of scalar images.
//!
//! Two 4-connected pixels are *linked* when their values are similar (equal
//! for a zero threshold, otherwise within the threshold). A [`Segmentation`]
//! is the partition of the image into the connected components of this
//! relation, each summarized by a [`Segment`].
//!
//! ```
//! use segchain_segment::Segmentation;
//! use segchain_core::PixelSlice;
//!
//! let pixels = [0u8, 0, 9, 0, 0, 9];
//! let seg = Segmentation::new(PixelSlice::U8(&pixels), 0, 3, 2, 3, 0.0)?;
//! assert_eq!(seg.len(), 2);
//! assert_eq!(seg.count(0)?, 4);
//! # Ok::<(), segchain_core::Error>(())
//! ```

pub mod links;
mod segment;
mod segmentation;

pub use links::{build_links, build_links_into, Link, LinkMap};
pub use segment::{Point, Segment};
pub use segmentation::{segment_from_links, RegionIndex, Segmentation};
