use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::links::{Link, ALL};

/// One pixel of a segment with its link bits at segmentation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: usize,
    pub y: usize,
    pub link: Link,
}

impl Point {
    /// `true` unless all four neighbors belong to the same region.
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.link & ALL != ALL
    }
}

/// Connected region of similar pixels.
///
/// The center is the midpoint of the bounding box, not the centroid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub(crate) start: usize,
    pub(crate) count: usize,
    pub(crate) xmin: usize,
    pub(crate) xmax: usize,
    pub(crate) ymin: usize,
    pub(crate) ymax: usize,
}

impl Segment {
    /// Summarize the pixels `points[start..start + count]`.
    pub(crate) fn from_points(points: &[Point], start: usize) -> Self {
        let mut seg = Segment {
            start,
            count: points.len(),
            xmin: usize::MAX,
            xmax: 0,
            ymin: usize::MAX,
            ymax: 0,
        };
        for p in points {
            seg.xmin = seg.xmin.min(p.x);
            seg.xmax = seg.xmax.max(p.x);
            seg.ymin = seg.ymin.min(p.y);
            seg.ymax = seg.ymax.max(p.y);
        }
        seg
    }

    /// Number of pixels.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn xmin(&self) -> usize {
        self.xmin
    }

    pub fn xmax(&self) -> usize {
        self.xmax
    }

    pub fn ymin(&self) -> usize {
        self.ymin
    }

    pub fn ymax(&self) -> usize {
        self.ymax
    }

    pub fn width(&self) -> usize {
        self.xmax - self.xmin + 1
    }

    pub fn height(&self) -> usize {
        self.ymax - self.ymin + 1
    }

    pub fn xcen(&self) -> f64 {
        0.5 * (self.xmin + self.xmax) as f64
    }

    pub fn ycen(&self) -> f64 {
        0.5 * (self.ymin + self.ymax) as f64
    }

    pub fn center(&self) -> Point2<f64> {
        Point2::new(self.xcen(), self.ycen())
    }

    pub(crate) fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.count
    }
}
