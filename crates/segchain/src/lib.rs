//! Facade crate for the `segchain-*` workspace.
//!
//! This crate provides:
//! - re-exports of the segmentation and chain detection crates,
//! - (feature-gated) helpers running both stages on an `image::DynamicImage`,
//! - serializable reports of a detection, used by the `segchain` binary.
//!
//! ## Quickstart
//!
//! ```no_run
//! use segchain::detect;
//! use segchain::ChainParams;
//!
//! # fn main() -> Result<(), segchain::SegchainError> {
//! let img = detect::open_image("page.png")?;
//! let pool = detect::detect_chains(&img, 0.0, &ChainParams::default())?;
//! println!("{} chains", pool.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `segchain::core`: pixel views, errors, allocation budget, checkpoint stack.
//! - `segchain::segment`: pixel links and the [`Segmentation`].
//! - `segchain::chain`: [`ChainParams`], [`ChainBuilder`] and [`ChainPool`].
//! - `segchain::report`: serializable summaries of a detection.
//! - `segchain::detect` (feature `image`): end-to-end helpers on decoded images.

pub use segchain_chain as chain;
pub use segchain_core as core;
pub use segchain_segment as segment;

pub use segchain_chain::{Chain, ChainBuilder, ChainParams, ChainPool};
pub use segchain_core::{AllocBudget, Error, PixelSlice};
pub use segchain_segment::{Segment, Segmentation};

mod error;
pub mod report;

pub use error::SegchainError;

#[cfg(feature = "image")]
pub mod detect;
