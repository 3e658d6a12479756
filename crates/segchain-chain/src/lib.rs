//! Detection of straight-line chains of image segments.
//!
//! A chain is a left-to-right sequence of segments of similar height whose
//! centers lie on a line of bounded slope, such as the glyphs of a line of
//! text. [`ChainBuilder`] finds the maximal chains of a
//! [`Segmentation`](segchain_segment::Segmentation) and fits, for each of
//! them, the vertical shear straightening the line and the horizontal shear
//! best separating its members.
//!
//! ```
//! use std::sync::Arc;
//!
//! use segchain_chain::{ChainParams, ChainPool};
//! use segchain_core::PixelSlice;
//! use segchain_segment::Segmentation;
//!
//! // Five 3x5 boxes ten pixels apart.
//! let (w, h) = (50, 9);
//! let mut pixels = vec![0u8; w * h];
//! for k in 0..5 {
//!     for y in 2..7 {
//!         for x in 1 + 10 * k..4 + 10 * k {
//!             pixels[y * w + x] = 1;
//!         }
//!     }
//! }
//! let seg = Arc::new(Segmentation::new(PixelSlice::U8(&pixels), 0, w, h, w, 0.0)?);
//! let pool = ChainPool::new(&seg, &ChainParams::default())?;
//! assert_eq!(pool.lengths(), vec![5]);
//! # Ok::<(), segchain_core::Error>(())
//! ```

mod builder;
mod graph;
mod line;
mod params;
mod pool;
mod shear;

pub use builder::ChainBuilder;
pub use line::{fit_line, LineFit};
pub use params::ChainParams;
pub use pool::{Chain, ChainPool};
