use serde::{Deserialize, Serialize};

/// Tolerances of the chain builder.
///
/// Distances are relative to segment heights unless stated otherwise.
/// [`ChainParams::clamped`] maps every field into its valid domain; the
/// builder always works on the clamped copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainParams {
    /// Absolute size tolerance, in pixels.
    pub satol: f64,
    /// Relative size tolerance, in `[0, 1]`.
    pub srtol: f64,
    /// Minimal gap between consecutive segments, relative to their widths.
    pub drmin: f64,
    /// Maximal center distance between consecutive segments, relative to
    /// their heights.
    pub drmax: f64,
    /// Maximal absolute slope of a chain, in `[0, 2]`.
    pub slope: f64,
    /// Absolute alignment tolerance, in pixels.
    pub aatol: f64,
    /// Alignment tolerance relative to the mean segment height.
    pub artol: f64,
    /// Precision of the vertical shear fit, in pixels over the chain width.
    pub prec: f64,
    /// Minimal number of segments in a reported chain (at least 2).
    pub lmin: usize,
    /// Maximal number of segments in a reported chain (at least `lmin`).
    pub lmax: usize,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            satol: 2.0,
            srtol: 0.05,
            drmin: 0.4,
            drmax: 2.5,
            slope: 0.3,
            aatol: 2.0,
            artol: 0.05,
            prec: 0.05,
            lmin: 3,
            lmax: 10,
        }
    }
}

/// Non-negative value; NaN maps to zero.
fn non_negative(v: f64) -> f64 {
    if v > 0.0 {
        v
    } else {
        0.0
    }
}

impl ChainParams {
    /// Copy with every field in its valid domain.
    ///
    /// Negative tolerances become zero, `srtol` is capped to 1 and `slope`
    /// to 2, `drmin`/`drmax` are swapped if out of order, `lmin` is at least
    /// 2 and `lmax` at least `lmin`.
    pub fn clamped(&self) -> Self {
        let mut drmin = non_negative(self.drmin);
        let mut drmax = non_negative(self.drmax);
        if drmax < drmin {
            std::mem::swap(&mut drmin, &mut drmax);
        }
        let lmin = self.lmin.max(2);
        Self {
            satol: non_negative(self.satol),
            srtol: non_negative(self.srtol).min(1.0),
            drmin,
            drmax,
            slope: non_negative(self.slope).min(2.0),
            aatol: non_negative(self.aatol),
            artol: non_negative(self.artol),
            prec: non_negative(self.prec),
            lmin,
            lmax: self.lmax.max(lmin),
        }
    }
}

/// Pairing bounds derived from clamped parameters.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PairBounds {
    /// `1 + 2 * satol`
    sa: f64,
    /// `2 - srtol`
    sq: f64,
    /// `2 + srtol`
    sr: f64,
    /// `drmin / 2`
    pub rmin: f64,
    /// `drmax / 2`
    pub rmax: f64,
}

impl PairBounds {
    pub fn new(p: &ChainParams) -> Self {
        Self {
            sa: 1.0 + 2.0 * p.satol,
            sq: 2.0 - p.srtol,
            sr: 2.0 + p.srtol,
            rmin: 0.5 * p.drmin,
            rmax: 0.5 * p.drmax,
        }
    }

    /// Exclusive height range `(hmin, hmax)` of a right neighbor of a
    /// segment of height `h0`.
    pub fn height_range(&self, h0: f64) -> (f64, f64) {
        (
            (self.sq * h0 - self.sa) / self.sr,
            (self.sr * h0 + self.sa) / self.sq,
        )
    }
}
