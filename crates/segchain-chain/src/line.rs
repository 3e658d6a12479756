//! Least-squares line through segment centers.

use segchain_core::{Error, Result};
use segchain_segment::Segment;

use crate::params::ChainParams;

/// Regression line `y = ym + slope * (x - xm)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineFit {
    pub xm: f64,
    pub ym: f64,
    pub slope: f64,
}

/// Fit a line minimizing the weighted vertical distance to a point set given
/// by its moments.
///
/// Fails with `InvalidArgument` when the total weight is not positive and
/// with `Singular` when the abscissae have no spread (vertical line).
pub fn fit_line(sw: f64, swx: f64, swy: f64, swxx: f64, swxy: f64) -> Result<LineFit> {
    if sw.is_nan() || sw <= 0.0 {
        return Err(Error::invalid("line fit needs a positive total weight"));
    }
    let q = 1.0 / sw;
    let xm = swx * q;
    let ym = swy * q;
    let r = swxx * q - xm * xm;
    if r.is_nan() || r <= 0.0 {
        return Err(Error::Singular);
    }
    Ok(LineFit {
        xm,
        ym,
        slope: (swxy * q - xm * ym) / r,
    })
}

/// Running moments over center abscissa, ordinate and height.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Moments {
    pub n: f64,
    pub sh: f64,
    pub sx: f64,
    pub sy: f64,
    pub sxx: f64,
    pub sxy: f64,
}

impl Moments {
    pub fn add(&mut self, x: f64, y: f64, h: f64) {
        self.n += 1.0;
        self.sh += h;
        self.sx += x;
        self.sy += y;
        self.sxx += x * x;
        self.sxy += x * y;
    }

    pub fn fit(&self) -> Result<LineFit> {
        fit_line(self.n, self.sx, self.sy, self.sxx, self.sxy)
    }
}

/// Moments of a partial chain, tested against candidate extensions.
pub(crate) struct ShortLine<'a> {
    segments: &'a [Segment],
    moments: Moments,
}

impl<'a> ShortLine<'a> {
    /// `members` index into `segments`.
    pub fn new(segments: &'a [Segment], members: &[usize]) -> Self {
        let mut moments = Moments::default();
        for &j in members {
            let s = &segments[j];
            moments.add(s.xcen(), s.ycen(), s.height() as f64);
        }
        Self { segments, moments }
    }

    /// Whether segment `candidate` can be appended to `members` (the list
    /// this line was built from) while keeping every segment within
    /// `aatol + artol * mean_height` of the refitted line.
    pub fn accepts(&self, members: &[usize], candidate: usize, params: &ChainParams) -> bool {
        let s = &self.segments[candidate];
        let (x, y) = (s.xcen(), s.ycen());
        let mut moments = self.moments;
        moments.add(x, y, s.height() as f64);
        let line = match moments.fit() {
            Ok(line) if line.slope.abs() <= params.slope => line,
            _ => return false,
        };
        let threshold = params.aatol + params.artol * moments.sh / moments.n;
        let off_line = |x: f64, y: f64| (line.slope * (x - line.xm) - (y - line.ym)).abs();
        off_line(x, y) <= threshold
            && members.iter().all(|&j| {
                let m = &self.segments[j];
                off_line(m.xcen(), m.ycen()) <= threshold
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fits_exact_line() {
        let mut m = Moments::default();
        for x in [0.0, 2.0, 5.0, 9.0] {
            m.add(x, 3.0 - 0.5 * x, 1.0);
        }
        let line = m.fit().expect("fit");
        assert_relative_eq!(line.slope, -0.5, epsilon = 1e-12);
        assert_relative_eq!(line.ym, 3.0 - 0.5 * line.xm, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_inputs_are_reported() {
        assert!(matches!(
            fit_line(0.0, 0.0, 0.0, 0.0, 0.0),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(fit_line(2.0, 2.0, 5.0, 2.0, 5.0), Err(Error::Singular));
    }

    #[test]
    fn short_line_rejects_off_line_candidates() {
        use segchain_core::PixelSlice;
        use segchain_segment::Segmentation;

        // Four 2x4 boxes on a row and a fifth one lifted by 10 pixels.
        let (w, h) = (40, 18);
        let mut data = vec![0u8; w * h];
        for (x0, y0) in [(1, 1), (9, 1), (17, 1), (25, 1), (33, 11)] {
            for y in y0..y0 + 4 {
                for x in x0..x0 + 2 {
                    data[y * w + x] = 1;
                }
            }
        }
        let seg = Segmentation::new(PixelSlice::U8(&data), 0, w, h, w, 0.0).expect("seg");
        let params = ChainParams::default();
        let members = [1, 2, 3];
        let line = ShortLine::new(seg.segments(), &members);
        assert!(line.accepts(&members, 4, &params));
        assert!(!line.accepts(&members, 5, &params));
    }
}
