//! Core primitives shared by the segchain crates.
//!
//! - pixel element types, type-tagged pixel slices and strided views,
//! - the common [`Error`] type,
//! - allocation accounting ([`AllocBudget`], [`BudgetVec`]),
//! - the [`SlabPool`] block allocator and the [`CheckpointStack`] used to make
//!   multi-resource construction all-or-nothing,
//! - small geometry and sorting helpers.

mod budget;
mod checkpoint;
mod error;
mod geom;
mod image;
mod logger;
mod pool;
mod sort;

pub use budget::{AllocBudget, BudgetVec, Charge};
pub use checkpoint::{Checkpoint, CheckpointStack, EntryInfo};
pub use error::{check_index, Error, Result};
pub use geom::{shear_matrix, transform, BBox};
pub use image::{ImageView, Pixel, PixelSlice, PixelType, PixelVisitor};
pub use pool::{SlabPool, SlotId};
pub use sort::heap_sort_by_key;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
