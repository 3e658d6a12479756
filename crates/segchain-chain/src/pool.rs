use std::sync::Arc;

use nalgebra::Matrix2;
use segchain_core::{check_index, BBox, Result};
use segchain_segment::Segmentation;

use crate::shear::ShearFit;

/// Maximal chain of aligned segments.
#[derive(Clone, Debug, PartialEq)]
pub struct Chain {
    pub(crate) start: usize,
    pub(crate) length: usize,
    pub(crate) fit: ShearFit,
}

impl Chain {
    /// Number of segments.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Accumulated slope of the line through the segment centers.
    pub fn vertical_shear(&self) -> f64 {
        self.fit.vertical
    }

    /// Slant of the segments maximizing the gaps between them.
    pub fn horizontal_shear(&self) -> f64 {
        self.fit.horizontal
    }

    /// Linear transform `[[a0, a1], [a2, a3]]` straightening the chain:
    /// `x' = a0 x + a1 y`, `y' = a2 x + a3 y`.
    pub fn affine(&self) -> Matrix2<f64> {
        self.fit.affine
    }

    /// Coefficients of [`Chain::affine`] as `[a0, a1, a2, a3]`.
    pub fn coefficients(&self) -> [f64; 4] {
        let a = &self.fit.affine;
        [a[(0, 0)], a[(0, 1)], a[(1, 0)], a[(1, 1)]]
    }

    /// Bounding box of the chain pixels in transformed coordinates.
    pub fn bbox(&self) -> BBox {
        self.fit.bbox
    }
}

/// Chains found in one segmentation.
///
/// Keeps the segmentation alive; chain members are indices into it.
#[derive(Clone, Debug)]
pub struct ChainPool {
    pub(crate) segmentation: Arc<Segmentation>,
    pub(crate) members: Vec<usize>,
    pub(crate) chains: Vec<Chain>,
}

macro_rules! chain_accessors {
    ($($name:ident, $bulk:ident => $ty:ty, |$c:ident| $get:expr;)*) => {$(
        pub fn $name(&self, j: usize) -> Result<$ty> {
            let $c = self.chain(j)?;
            Ok($get)
        }

        pub fn $bulk(&self) -> Vec<$ty> {
            self.chains.iter().map(|$c| $get).collect()
        }
    )*};
}

impl ChainPool {
    /// Number of chains.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn chain(&self, j: usize) -> Result<&Chain> {
        check_index(j, self.chains.len()).map(|j| &self.chains[j])
    }

    /// Segment indices of chain `j`, from left to right.
    pub fn segments(&self, j: usize) -> Result<&[usize]> {
        let c = self.chain(j)?;
        Ok(&self.members[c.start..c.start + c.length])
    }

    pub fn segmentation(&self) -> &Arc<Segmentation> {
        &self.segmentation
    }

    pub fn image_width(&self) -> usize {
        self.segmentation.image_width()
    }

    pub fn image_height(&self) -> usize {
        self.segmentation.image_height()
    }

    chain_accessors! {
        length, lengths => usize, |c| c.length;
        vertical_shear, vertical_shears => f64, |c| c.fit.vertical;
        horizontal_shear, horizontal_shears => f64, |c| c.fit.horizontal;
        xmin, xmins => f64, |c| c.fit.bbox.xmin;
        xmax, xmaxs => f64, |c| c.fit.bbox.xmax;
        ymin, ymins => f64, |c| c.fit.bbox.ymin;
        ymax, ymaxs => f64, |c| c.fit.bbox.ymax;
    }
}
