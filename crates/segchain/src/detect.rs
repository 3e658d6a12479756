//! End-to-end helpers on images decoded by the `image` crate.

use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, GrayImage};
use segchain_chain::{ChainBuilder, ChainParams, ChainPool};
use segchain_core::{AllocBudget, ImageView, PixelSlice};
use segchain_segment::Segmentation;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::SegchainError;

/// Decode the image at `path`.
pub fn open_image(path: impl AsRef<Path>) -> Result<DynamicImage, SegchainError> {
    Ok(image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?)
}

/// Borrow an `image::GrayImage` as a `segchain-core` view.
pub fn gray_view(img: &GrayImage) -> Result<ImageView<'_, u8>, SegchainError> {
    let (width, height) = (img.width() as usize, img.height() as usize);
    Ok(ImageView::contiguous(img.as_raw(), width, height)?)
}

/// Segment an image, keeping its native precision where possible.
///
/// 8-bit, 16-bit and float gray images are segmented as they are; color
/// images are reduced to their luma at the same bit depth first.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img), fields(width = img.width(), height = img.height()))
)]
pub fn segment_image(
    img: &DynamicImage,
    threshold: f64,
    budget: &AllocBudget,
) -> Result<Segmentation, SegchainError> {
    let (width, height) = (img.width() as usize, img.height() as usize);
    let segment = |pixels: PixelSlice<'_>| {
        Segmentation::with_budget(pixels, 0, width, height, width, threshold, budget)
    };
    let seg = match img {
        DynamicImage::ImageLuma8(gray) => segment(PixelSlice::U8(gray.as_raw()))?,
        DynamicImage::ImageLuma16(gray) => segment(PixelSlice::U16(gray.as_raw()))?,
        DynamicImage::ImageLumaA16(_)
        | DynamicImage::ImageRgb16(_)
        | DynamicImage::ImageRgba16(_) => {
            let gray = img.to_luma16();
            segment(PixelSlice::U16(gray.as_raw()))?
        }
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            let gray = img.to_luma32f();
            segment(PixelSlice::F32(gray.as_raw()))?
        }
        _ => {
            let gray = img.to_luma8();
            segment(PixelSlice::U8(gray.as_raw()))?
        }
    };
    log::debug!("{width}x{height} image: {} segments", seg.len());
    Ok(seg)
}

/// Segment `img` and search the segmentation for chains.
pub fn detect_chains(
    img: &DynamicImage,
    threshold: f64,
    params: &ChainParams,
) -> Result<ChainPool, SegchainError> {
    let budget = AllocBudget::unlimited();
    let seg = Arc::new(segment_image(img, threshold, &budget)?);
    Ok(ChainBuilder::new(params.clone())
        .with_budget(&budget)
        .build(&seg)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgb, RgbImage};

    fn boxes_gray() -> GrayImage {
        ImageBuffer::from_fn(50, 9, |x, y| {
            let inside = (2..7).contains(&y) && x % 10 >= 1 && x % 10 < 4 && x < 44;
            Luma([if inside { 200 } else { 10 }])
        })
    }

    #[test]
    fn gray_and_color_inputs_agree() {
        let gray = boxes_gray();
        let color: RgbImage = ImageBuffer::from_fn(50, 9, |x, y| {
            let v = gray.get_pixel(x, y)[0];
            Rgb([v, v, v])
        });
        let budget = AllocBudget::unlimited();
        let a = segment_image(&DynamicImage::ImageLuma8(gray), 0.0, &budget).expect("gray");
        let b = segment_image(&DynamicImage::ImageRgb8(color), 0.0, &budget).expect("rgb");
        assert_eq!(a.len(), 6);
        assert_eq!(a.counts(), b.counts());
    }

    #[test]
    fn sixteen_bit_images_keep_their_precision() {
        let img: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_fn(4, 1, |x, _| Luma([1000 + x as u16]));
        let budget = AllocBudget::unlimited();
        let seg = segment_image(&DynamicImage::ImageLuma16(img), 0.0, &budget).expect("seg");
        assert_eq!(seg.len(), 4);
    }

    #[test]
    fn detects_the_row_of_boxes() {
        let pool = detect_chains(
            &DynamicImage::ImageLuma8(boxes_gray()),
            0.0,
            &ChainParams::default(),
        )
        .expect("chains");
        assert_eq!(pool.lengths(), vec![5]);
    }

    #[test]
    fn gray_view_matches_buffer() {
        let gray = boxes_gray();
        let view = gray_view(&gray).expect("view");
        assert_eq!((view.width(), view.height()), (50, 9));
        assert_eq!(view.get(2, 3), Some(200));
    }
}
