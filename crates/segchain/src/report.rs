//! Serializable summaries of segments and chains.

use serde::{Deserialize, Serialize};

use segchain_chain::ChainPool;
use segchain_core::{BBox, Result};
use segchain_segment::Segmentation;

/// One segment: pixel count, bounding box and center.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentReport {
    pub index: usize,
    pub count: usize,
    pub xmin: usize,
    pub xmax: usize,
    pub ymin: usize,
    pub ymax: usize,
    pub xcen: f64,
    pub ycen: f64,
}

/// One chain: its members and fitted shears.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainReport {
    pub length: usize,
    pub segments: Vec<usize>,
    pub vertical_shear: f64,
    pub horizontal_shear: f64,
    /// `[a0, a1, a2, a3]` with `x' = a0 x + a1 y`, `y' = a2 x + a3 y`.
    pub affine: [f64; 4],
    pub bbox: BBox,
}

/// Result of running segmentation and chain detection on one image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub width: usize,
    pub height: usize,
    pub segments: usize,
    pub chains: Vec<ChainReport>,
    /// Segments requested explicitly, in request order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected: Vec<SegmentReport>,
}

impl SegmentReport {
    /// Summary of segment `j` of `seg`, reported under `index`.
    pub fn new(seg: &Segmentation, j: usize, index: usize) -> Result<Self> {
        let s = seg.segment(j)?;
        Ok(Self {
            index,
            count: s.count(),
            xmin: s.xmin(),
            xmax: s.xmax(),
            ymin: s.ymin(),
            ymax: s.ymax(),
            xcen: s.xcen(),
            ycen: s.ycen(),
        })
    }
}

impl Report {
    pub fn new(pool: &ChainPool) -> Result<Self> {
        let chains = (0..pool.len())
            .map(|j| {
                let chain = pool.chain(j)?;
                Ok(ChainReport {
                    length: chain.length(),
                    segments: pool.segments(j)?.to_vec(),
                    vertical_shear: chain.vertical_shear(),
                    horizontal_shear: chain.horizontal_shear(),
                    affine: chain.coefficients(),
                    bbox: chain.bbox(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            width: pool.image_width(),
            height: pool.image_height(),
            segments: pool.segmentation().len(),
            chains,
            selected: Vec::new(),
        })
    }

    /// Attach summaries of segments `indices`, copied out with
    /// [`Segmentation::select`].
    pub fn with_selection(mut self, seg: &Segmentation, indices: &[usize]) -> Result<Self> {
        let picked = seg.select(indices)?;
        self.selected = indices
            .iter()
            .enumerate()
            .map(|(k, &index)| SegmentReport::new(&picked, k, index))
            .collect::<Result<Vec<_>>>()?;
        Ok(self)
    }

    /// Multi-line human readable summary.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "image {}x{}: {} segments, {} chains\n",
            self.width,
            self.height,
            self.segments,
            self.chains.len()
        );
        for (j, c) in self.chains.iter().enumerate() {
            out.push_str(&format!(
                "chain {j}: length {}, segments {:?}, vertical {:.4}, horizontal {:.4}, \
                 bbox [{:.1}, {:.1}] x [{:.1}, {:.1}]\n",
                c.length,
                c.segments,
                c.vertical_shear,
                c.horizontal_shear,
                c.bbox.xmin,
                c.bbox.xmax,
                c.bbox.ymin,
                c.bbox.ymax
            ));
        }
        for s in &self.selected {
            out.push_str(&format!(
                "segment {}: count {}, bbox [{}, {}] x [{}, {}], center ({:.1}, {:.1})\n",
                s.index, s.count, s.xmin, s.xmax, s.ymin, s.ymax, s.xcen, s.ycen
            ));
        }
        out
    }
}
