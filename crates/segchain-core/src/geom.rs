//! Bounding boxes and the shear transform applied to chains.

use nalgebra::{Matrix2, Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Axis-aligned box in (possibly transformed) pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl Default for BBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BBox {
    /// Box containing nothing; any `include` makes it a single point.
    pub const EMPTY: BBox = BBox {
        xmin: f64::INFINITY,
        xmax: f64::NEG_INFINITY,
        ymin: f64::INFINITY,
        ymax: f64::NEG_INFINITY,
    };

    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Self {
        Self {
            xmin,
            xmax,
            ymin,
            ymax,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.xmin > self.xmax || self.ymin > self.ymax
    }

    #[inline]
    pub fn include(&mut self, p: Point2<f64>) {
        self.xmin = self.xmin.min(p.x);
        self.xmax = self.xmax.max(p.x);
        self.ymin = self.ymin.min(p.y);
        self.ymax = self.ymax.max(p.y);
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            xmin: self.xmin.min(other.xmin),
            xmax: self.xmax.max(other.xmax),
            ymin: self.ymin.min(other.ymin),
            ymax: self.ymax.max(other.ymax),
        }
    }

    /// Midpoint of the box (not a centroid).
    pub fn center(&self) -> Point2<f64> {
        Point2::new(0.5 * (self.xmin + self.xmax), 0.5 * (self.ymin + self.ymax))
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }
}

/// Linear part of the chain transform for the given shears.
///
/// `x' = x - horizontal * y` and `y' = y - vertical * x`.
pub fn shear_matrix(horizontal: f64, vertical: f64) -> Matrix2<f64> {
    Matrix2::new(1.0, -horizontal, -vertical, 1.0)
}

#[inline]
pub fn transform(m: &Matrix2<f64>, x: f64, y: f64) -> Point2<f64> {
    Point2::from(m * Vector2::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn include_grows_from_empty() {
        let mut b = BBox::EMPTY;
        assert!(b.is_empty());
        b.include(Point2::new(2.0, -1.0));
        b.include(Point2::new(-3.0, 4.0));
        assert_eq!(b, BBox::new(-3.0, 2.0, -1.0, 4.0));
        assert_relative_eq!(b.center().x, -0.5);
        assert_relative_eq!(b.height(), 5.0);
    }

    #[test]
    fn shear_matrix_moves_points_as_documented() {
        let m = shear_matrix(0.5, 0.25);
        let p = transform(&m, 4.0, 2.0);
        assert_relative_eq!(p.x, 3.0);
        assert_relative_eq!(p.y, 1.0);
        assert_eq!(transform(&shear_matrix(0.0, 0.0), 7.0, 3.0), Point2::new(7.0, 3.0));
    }
}
