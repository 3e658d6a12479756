//! Pixel link builder.
//!
//! Every pixel gets a 4-bit mask telling which of its 4-connected neighbors
//! hold a similar value. Links are always reciprocal: if a pixel links east,
//! its right neighbor links west.

use segchain_core::{
    AllocBudget, BudgetVec, Error, ImageView, Pixel, PixelSlice, PixelVisitor, Result,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Link bits of a single pixel.
pub type Link = u8;

pub const NONE: Link = 0;
/// Right neighbor, `(x + 1, y)`.
pub const EAST: Link = 1;
/// Left neighbor, `(x - 1, y)`.
pub const WEST: Link = 2;
/// Neighbor at `(x, y + 1)`.
pub const NORTH: Link = 4;
/// Neighbor at `(x, y - 1)`.
pub const SOUTH: Link = 8;
/// All four neighbors are similar: an interior pixel.
pub const ALL: Link = EAST | WEST | NORTH | SOUTH;
/// Set on pixels already claimed by a segment.
pub const OWNED: Link = 16;

/// Link bitmap of a `width x height` image, row-major and contiguous.
#[derive(Debug)]
pub struct LinkMap {
    width: usize,
    height: usize,
    bits: BudgetVec<Link>,
}

impl LinkMap {
    /// Compute the links of `view` with the given similarity threshold.
    pub fn from_view<T: Pixel>(view: &ImageView<'_, T>, threshold: f64) -> Result<Self> {
        Self::from_view_with_budget(view, threshold, &AllocBudget::unlimited())
    }

    pub fn from_view_with_budget<T: Pixel>(
        view: &ImageView<'_, T>,
        threshold: f64,
        budget: &AllocBudget,
    ) -> Result<Self> {
        let (width, height) = (view.width(), view.height());
        let mut bits = BudgetVec::filled(budget, view.len(), NONE)?;
        build_links_into(view, &mut bits, 0, width, threshold)?;
        Ok(Self {
            width,
            height,
            bits,
        })
    }

    /// Wrap precomputed link bits (row-major, `width * height` entries).
    pub fn from_raw(width: usize, height: usize, bits: &[Link]) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid(format!(
                "invalid link map dimensions (width={width}, height={height})"
            )));
        }
        if bits.len() != width * height {
            return Err(Error::invalid(format!(
                "link map has {} entries, expected {}",
                bits.len(),
                width * height
            )));
        }
        let mut buf = BudgetVec::with_capacity(&AllocBudget::unlimited(), bits.len())?;
        buf.extend_from_slice(bits)?;
        Ok(Self {
            width,
            height,
            bits: buf,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn as_slice(&self) -> &[Link] {
        &self.bits
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Link] {
        &mut self.bits
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Link> {
        (x < self.width && y < self.height).then(|| self.bits[y * self.width + x])
    }
}

struct BuildLinks {
    threshold: f64,
}

impl PixelVisitor for BuildLinks {
    type Output = LinkMap;

    fn visit<T: Pixel>(self, view: ImageView<'_, T>) -> Result<LinkMap> {
        LinkMap::from_view(&view, self.threshold)
    }
}

/// Compute the link bitmap of a type-tagged pixel buffer.
///
/// Pixel `(x, y)` is read at `pixels[offset + y * stride + x]`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(pixels), fields(ty = ?pixels.pixel_type()))
)]
pub fn build_links(
    pixels: PixelSlice<'_>,
    offset: usize,
    width: usize,
    height: usize,
    stride: usize,
    threshold: f64,
) -> Result<LinkMap> {
    pixels.visit(offset, width, height, stride, BuildLinks { threshold })
}

/// Write the links of `view` into a caller-provided buffer.
///
/// The link of pixel `(x, y)` goes to `links[link_offset + y * link_stride + x]`;
/// entries outside the image rectangle are left untouched.
pub fn build_links_into<T: Pixel>(
    view: &ImageView<'_, T>,
    links: &mut [Link],
    link_offset: usize,
    link_stride: usize,
    threshold: f64,
) -> Result<()> {
    let (width, height) = (view.width(), view.height());
    if links.is_empty() {
        return Err(Error::InvalidAddress {
            what: "link buffer",
        });
    }
    if link_stride < width {
        return Err(Error::invalid(format!(
            "link stride {link_stride} is smaller than width {width}"
        )));
    }
    let required = (height - 1) * link_stride + width + link_offset;
    if links.len() < required {
        return Err(Error::invalid(format!(
            "link buffer too short (expected at least {required}, got {})",
            links.len()
        )));
    }

    let t = T::threshold_from_f64(threshold);
    for y in 0..height {
        let row = view.row(y);
        let base = link_offset + y * link_stride;
        let out = &mut links[base..base + width];
        out.fill(NONE);
        for x in 1..width {
            if T::similar(row[x - 1], row[x], t) {
                out[x - 1] |= EAST;
                out[x] |= WEST;
            }
        }
        if y == 0 {
            continue;
        }
        let below = view.row(y - 1);
        let below_base = base - link_stride;
        for x in 0..width {
            if T::similar(below[x], row[x], t) {
                links[below_base + x] |= NORTH;
                links[base + x] |= SOUTH;
            }
        }
    }
    Ok(())
}
