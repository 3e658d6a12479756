//! Shear estimation for an accepted chain.
//!
//! The vertical shear straightens the line through the segment centers; the
//! horizontal shear then slants the segments so that the gaps between
//! consecutive ones are as wide as possible.

use nalgebra::Matrix2;
use segchain_core::{shear_matrix, transform, BBox, Error, Result};
use segchain_segment::{Point, Segmentation};

use crate::line::Moments;

/// Maximal number of refinements of the vertical shear.
const MAX_VERTICAL_ITER: usize = 10;

/// Result of [`fit_shears`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ShearFit {
    pub vertical: f64,
    pub horizontal: f64,
    pub affine: Matrix2<f64>,
    pub bbox: BBox,
}

/// Bounding box of the pixels of a segment after applying `m`.
///
/// Interior pixels cannot extend the box and are skipped; the first pixel is
/// always used.
pub(crate) fn transformed_bbox(points: &[Point], m: &Matrix2<f64>) -> BBox {
    let mut bbox = BBox::EMPTY;
    for (i, p) in points.iter().enumerate() {
        if i == 0 || p.is_boundary() {
            bbox.include(transform(m, p.x as f64, p.y as f64));
        }
    }
    bbox
}

/// Fit both shears of the chain made of `members`.
///
/// Returns `Singular` when the vertical fit degenerates or does not
/// converge within [`MAX_VERTICAL_ITER`] refinements.
pub(crate) fn fit_shears(seg: &Segmentation, members: &[usize], prec: f64) -> Result<ShearFit> {
    let (vertical, bbox) = fit_vertical_shear(seg, members, prec)?;
    fit_horizontal_shear(seg, members, vertical, &bbox)
}

fn fit_vertical_shear(seg: &Segmentation, members: &[usize], prec: f64) -> Result<(f64, BBox)> {
    let mut vertical = 0.0;
    let mut iter = 0;
    loop {
        let mut moments = Moments::default();
        let mut bbox = BBox::EMPTY;
        let m = shear_matrix(0.0, vertical);
        for &j in members {
            let b = if iter == 0 {
                let s = seg.segment(j)?;
                BBox::new(
                    s.xmin() as f64,
                    s.xmax() as f64,
                    s.ymin() as f64,
                    s.ymax() as f64,
                )
            } else {
                transformed_bbox(seg.points(j)?, &m)
            };
            let c = b.center();
            moments.add(c.x, c.y, 0.0);
            bbox = bbox.union(&b);
        }
        let slope = moments.fit()?.slope;
        let tol = prec / (1.0 + bbox.width());
        let converged = iter >= 1 && slope.abs() <= tol;
        vertical += slope;
        if converged {
            return Ok((vertical, bbox));
        }
        iter += 1;
        if iter > MAX_VERTICAL_ITER {
            log::debug!("vertical shear did not converge (last step {slope:e})");
            return Err(Error::Singular);
        }
    }
}

/// `k`-th candidate of the sweep `0, -step, +step, -2 step, +2 step, ...`.
fn sweep(k: usize, step: f64) -> f64 {
    if k % 2 == 0 {
        step * (k / 2) as f64
    } else {
        -step * ((k + 1) / 2) as f64
    }
}

fn fit_horizontal_shear(
    seg: &Segmentation,
    members: &[usize],
    vertical: f64,
    bbox: &BBox,
) -> Result<ShearFit> {
    let length = members.len() as f64;
    let width = (1.0 + bbox.width()) / length;
    let height = 1.0 + bbox.height();
    let step = 0.25 / height;
    let bound = 0.5 * width / height;
    let candidates = 2 * (bound / step).ceil() as usize;

    let mut best = (0.0, 0.0);
    for k in 0..=candidates {
        let shear = sweep(k, step);
        let m = shear_matrix(shear, vertical);
        let mut spacing = 0.0;
        let mut prev_xmax = None;
        for &j in members {
            let b = transformed_bbox(seg.points(j)?, &m);
            if let Some(prev) = prev_xmax {
                spacing += b.xmin - prev;
            }
            prev_xmax = Some(b.xmax);
        }
        if k == 0 || spacing > best.1 {
            best = (shear, spacing);
        }
    }

    let horizontal = best.0;
    let affine = shear_matrix(horizontal, vertical);
    let mut bbox = BBox::EMPTY;
    for &j in members {
        bbox = bbox.union(&transformed_bbox(seg.points(j)?, &affine));
    }
    Ok(ShearFit {
        vertical,
        horizontal,
        affine,
        bbox,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use segchain_core::PixelSlice;

    /// `n` filled `w x h` boxes; box `k` has its lower-left corner at
    /// `(x0 + k * dx, y0 + k * dy)`.
    fn boxes(n: usize, w: usize, h: usize, dx: usize, dy: usize) -> Segmentation {
        let (width, height) = (n * dx + w + 2, n * dy + h + 4);
        let mut data = vec![0u8; width * height];
        for k in 0..n {
            let (x0, y0) = (1 + k * dx, 2 + k * dy);
            for y in y0..y0 + h {
                for x in x0..x0 + w {
                    data[y * width + x] = 1;
                }
            }
        }
        Segmentation::new(PixelSlice::U8(&data), 0, width, height, width, 0.0)
            .expect("segmentation")
    }

    #[test]
    fn sweep_alternates_from_zero() {
        let s: Vec<f64> = (0..5).map(|k| sweep(k, 0.5)).collect();
        assert_eq!(s, vec![0.0, -0.5, 0.5, -1.0, 1.0]);
    }

    #[test]
    fn interior_pixels_do_not_change_the_box() {
        let seg = boxes(1, 4, 6, 10, 0);
        let m = shear_matrix(0.3, -0.2);
        let pts = seg.points(1).expect("points");
        let mut full = BBox::EMPTY;
        for p in pts {
            full.include(transform(&m, p.x as f64, p.y as f64));
        }
        assert_eq!(transformed_bbox(pts, &m), full);
    }

    #[test]
    fn aligned_boxes_need_no_shear() {
        let seg = boxes(5, 3, 5, 10, 0);
        let members: Vec<usize> = (1..6).collect();
        let fit = fit_shears(&seg, &members, 0.05).expect("fit");
        assert_relative_eq!(fit.vertical, 0.0, epsilon = 1e-12);
        assert_relative_eq!(fit.horizontal, 0.0, epsilon = 1e-12);
        assert_relative_eq!(fit.bbox.xmin, 1.0);
        assert_relative_eq!(fit.bbox.xmax, 43.0);
    }

    #[test]
    fn vertical_shear_undoes_a_rising_line() {
        let seg = boxes(5, 3, 5, 10, 1);
        let members: Vec<usize> = (1..6).collect();
        let fit = fit_shears(&seg, &members, 0.05).expect("fit");
        assert_relative_eq!(fit.vertical, 0.1, epsilon = 1e-9);
        assert_relative_eq!(fit.affine[(1, 0)], -0.1, epsilon = 1e-9);
        assert!(fit.bbox.height() < 6.5, "bbox={:?}", fit.bbox);
    }

    #[test]
    fn stacked_segments_are_singular() {
        let seg = boxes(3, 3, 2, 0, 4);
        let members: Vec<usize> = (1..4).collect();
        assert_eq!(
            fit_shears(&seg, &members, 0.05).map(|f| f.vertical),
            Err(Error::Singular)
        );
    }
}
