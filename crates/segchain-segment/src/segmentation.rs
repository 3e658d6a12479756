//! Segmentation engine: flood fill over the link bitmap.

use segchain_core::{
    check_index, AllocBudget, BudgetVec, CheckpointStack, Error, ImageView, Pixel, PixelSlice,
    PixelVisitor, Result,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::links::{Link, LinkMap, EAST, NORTH, OWNED, SOUTH, WEST};
use crate::segment::{Point, Segment};

/// Partition of an image into connected segments of similar pixels.
///
/// Every pixel of the source image belongs to exactly one segment. Segments
/// are numbered in the raster order of their first pixel. Share it with
/// `Arc<Segmentation>`; the value itself is immutable.
#[derive(Clone, Debug)]
pub struct Segmentation {
    width: usize,
    height: usize,
    points: Vec<Point>,
    segments: Vec<Segment>,
}

/// Packed region list produced by [`segment_from_links`].
///
/// `index` holds, for each region in turn, its pixel count followed by the
/// raster indices of its pixels: `[n1, i.., n2, i.., ...]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionIndex {
    pub index: Vec<usize>,
    pub count: usize,
}

impl RegionIndex {
    /// Pixel indices of each region, in order.
    pub fn regions(&self) -> impl Iterator<Item = &[usize]> + '_ {
        let mut rest = self.index.as_slice();
        std::iter::from_fn(move || {
            let (&n, tail) = rest.split_first()?;
            let (region, tail) = tail.split_at(n);
            rest = tail;
            Some(region)
        })
    }
}

/// Scratch state grown by the flood fill, promoted to a [`Segmentation`].
struct Staging {
    width: usize,
    height: usize,
    points: BudgetVec<Point>,
    segments: BudgetVec<Segment>,
}

/// Neighbors of pixel `(x, y)` reachable through the set bits of `link`.
#[inline]
fn linked_neighbors(
    link: Link,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
) -> impl Iterator<Item = (usize, usize)> {
    let candidates = [
        (EAST, x + 1 < width, (x + 1, y)),
        (WEST, x > 0, (x.wrapping_sub(1), y)),
        (NORTH, y + 1 < height, (x, y + 1)),
        (SOUTH, y > 0, (x, y.wrapping_sub(1))),
    ];
    candidates
        .into_iter()
        .filter(move |&(bit, inside, _)| inside && link & bit != 0)
        .map(|(_, _, p)| p)
}

/// Label the regions of `links` in place.
///
/// Pixels are visited in raster order; each unclaimed pixel starts a region
/// that grows through the link bits. Claimed pixels get the `OWNED` bit.
pub fn segment_from_links(links: &mut LinkMap) -> Result<RegionIndex> {
    let (width, height) = (links.width(), links.height());
    let npixels = links.len();
    let mut index = Vec::new();
    index
        .try_reserve_exact(2 * npixels)
        .map_err(|_| Error::OutOfMemory {
            requested: 2 * npixels * std::mem::size_of::<usize>(),
        })?;
    let bits = links.as_mut_slice();
    let mut count = 0;
    for k in 0..npixels {
        if bits[k] & OWNED != 0 {
            continue;
        }
        let header = index.len();
        index.push(0);
        index.push(k);
        bits[k] |= OWNED;
        let mut cursor = header + 1;
        while cursor < index.len() {
            let p = index[cursor];
            let (x, y) = (p % width, p / width);
            for (nx, ny) in linked_neighbors(bits[p], x, y, width, height) {
                let q = ny * width + nx;
                if bits[q] & OWNED == 0 {
                    bits[q] |= OWNED;
                    index.push(q);
                }
            }
            cursor += 1;
        }
        index[header] = index.len() - header - 1;
        count += 1;
    }
    Ok(RegionIndex { index, count })
}

/// Grow every region of `links` into `staging`, marking pixels `OWNED`.
///
/// The point list doubles as the work queue of the flood fill.
fn flood_fill(links: &mut LinkMap, staging: &mut Staging) -> Result<()> {
    let (width, height) = (links.width(), links.height());
    let bits = links.as_mut_slice();
    for k in 0..bits.len() {
        if bits[k] & OWNED != 0 {
            continue;
        }
        let start = staging.points.len();
        bits[k] |= OWNED;
        staging.points.push(Point {
            x: k % width,
            y: k / width,
            link: bits[k] & !OWNED,
        })?;
        let mut cursor = start;
        while cursor < staging.points.len() {
            let p = staging.points[cursor];
            for (x, y) in linked_neighbors(p.link, p.x, p.y, width, height) {
                let q = y * width + x;
                if bits[q] & OWNED == 0 {
                    bits[q] |= OWNED;
                    staging.points.push(Point {
                        x,
                        y,
                        link: bits[q] & !OWNED,
                    })?;
                }
            }
            cursor += 1;
        }
        let segment = Segment::from_points(&staging.points[start..], start);
        staging.segments.push(segment)?;
    }
    Ok(())
}

struct Build<'b> {
    threshold: f64,
    budget: &'b AllocBudget,
}

impl PixelVisitor for Build<'_> {
    type Output = Segmentation;

    fn visit<T: Pixel>(self, view: ImageView<'_, T>) -> Result<Segmentation> {
        Segmentation::from_view_with_budget(&view, self.threshold, self.budget)
    }
}

macro_rules! segment_accessors {
    ($($(#[$doc:meta])* $name:ident, $bulk:ident, $into:ident => $ty:ty;)*) => {$(
        $(#[$doc])*
        pub fn $name(&self, j: usize) -> Result<$ty> {
            Ok(self.segment(j)?.$name())
        }

        pub fn $bulk(&self) -> Vec<$ty> {
            self.segments.iter().map(Segment::$name).collect()
        }

        pub fn $into(&self, out: &mut [$ty]) -> Result<()> {
            self.check_output(out.len())?;
            for (o, s) in out.iter_mut().zip(&self.segments) {
                *o = s.$name();
            }
            Ok(())
        }
    )*};
}

impl Segmentation {
    /// Segment a type-tagged pixel buffer.
    ///
    /// Pixel `(x, y)` is read at `pixels[offset + y * stride + x]`; two
    /// 4-connected pixels join the same segment when they are similar
    /// (`threshold == 0`: equal; otherwise `|a - b| <= threshold`).
    pub fn new(
        pixels: PixelSlice<'_>,
        offset: usize,
        width: usize,
        height: usize,
        stride: usize,
        threshold: f64,
    ) -> Result<Self> {
        Self::with_budget(
            pixels,
            offset,
            width,
            height,
            stride,
            threshold,
            &AllocBudget::unlimited(),
        )
    }

    /// Same as [`Segmentation::new`] with scratch memory charged to `budget`.
    #[allow(clippy::too_many_arguments)]
    pub fn with_budget(
        pixels: PixelSlice<'_>,
        offset: usize,
        width: usize,
        height: usize,
        stride: usize,
        threshold: f64,
        budget: &AllocBudget,
    ) -> Result<Self> {
        pixels.visit(offset, width, height, stride, Build { threshold, budget })
    }

    /// Segment a typed view.
    pub fn from_view<T: Pixel>(view: &ImageView<'_, T>, threshold: f64) -> Result<Self> {
        Self::from_view_with_budget(view, threshold, &AllocBudget::unlimited())
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(view, budget),
            fields(width = view.width(), height = view.height())
        )
    )]
    pub fn from_view_with_budget<T: Pixel>(
        view: &ImageView<'_, T>,
        threshold: f64,
        budget: &AllocBudget,
    ) -> Result<Self> {
        let links = LinkMap::from_view_with_budget(view, threshold, budget)?;
        Self::build(links, budget)
    }

    /// Segment a precomputed link bitmap.
    pub fn from_links(links: &LinkMap) -> Result<Self> {
        let copy = LinkMap::from_raw(links.width(), links.height(), links.as_slice())?;
        Self::build(copy, &AllocBudget::unlimited())
    }

    fn build(links: LinkMap, budget: &AllocBudget) -> Result<Self> {
        let (width, height) = (links.width(), links.height());
        let npixels = links.len();

        let mut stack = CheckpointStack::new();
        let links = stack.push_owned(links)?;
        let staging = stack.push_owned(Staging {
            width,
            height,
            points: BudgetVec::with_capacity(budget, npixels)?,
            segments: BudgetVec::with_capacity(budget, 0)?,
        })?;

        {
            let (links, staging) = stack.get_pair_mut(&links, &staging)?;
            flood_fill(links, staging)?;
        }

        let staging = stack.commit::<Staging>()?;
        log::debug!(
            "segmented {}x{} image into {} segments",
            width,
            height,
            staging.segments.len()
        );
        Ok(Self {
            width: staging.width,
            height: staging.height,
            points: staging.points.into_vec(),
            segments: staging.segments.into_vec(),
        })
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn image_width(&self) -> usize {
        self.width
    }

    pub fn image_height(&self) -> usize {
        self.height
    }

    pub fn segment(&self, j: usize) -> Result<&Segment> {
        check_index(j, self.segments.len()).map(|j| &self.segments[j])
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn check_output(&self, len: usize) -> Result<()> {
        if len == self.segments.len() {
            Ok(())
        } else {
            Err(Error::invalid(format!(
                "output holds {len} values for {} segments",
                self.segments.len()
            )))
        }
    }

    segment_accessors! {
        /// Center abscissa (bounding-box midpoint).
        xcen, xcens, xcens_into => f64;
        /// Center ordinate (bounding-box midpoint).
        ycen, ycens, ycens_into => f64;
        /// Number of pixels.
        count, counts, counts_into => usize;
        xmin, xmins, xmins_into => usize;
        xmax, xmaxs, xmaxs_into => usize;
        ymin, ymins, ymins_into => usize;
        ymax, ymaxs, ymaxs_into => usize;
        width, widths, widths_into => usize;
        height, heights, heights_into => usize;
    }

    /// Pixels of segment `j`, in flood-fill order.
    pub fn points(&self, j: usize) -> Result<&[Point]> {
        Ok(&self.points[self.segment(j)?.range()])
    }

    pub fn xs(&self, j: usize) -> Result<Vec<usize>> {
        Ok(self.points(j)?.iter().map(|p| p.x).collect())
    }

    pub fn ys(&self, j: usize) -> Result<Vec<usize>> {
        Ok(self.points(j)?.iter().map(|p| p.y).collect())
    }

    /// Link bits of the pixels of segment `j`.
    pub fn links(&self, j: usize) -> Result<Vec<Link>> {
        Ok(self.points(j)?.iter().map(|p| p.link).collect())
    }

    /// Independent copy holding only the segments listed in `indices`, in
    /// that order.
    pub fn select(&self, indices: &[usize]) -> Result<Segmentation> {
        if indices.is_empty() {
            return Err(Error::invalid("empty segment selection"));
        }
        let mut npoints = 0;
        for &j in indices {
            npoints += self.segment(j)?.count;
        }
        let mut points = Vec::with_capacity(npoints);
        let mut segments = Vec::with_capacity(indices.len());
        for &j in indices {
            let src = &self.segments[j];
            let start = points.len();
            points.extend_from_slice(&self.points[src.range()]);
            segments.push(Segment {
                start,
                ..src.clone()
            });
        }
        Ok(Segmentation {
            width: self.width,
            height: self.height,
            points,
            segments,
        })
    }
}
