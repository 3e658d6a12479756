//! Pixel element types, type-tagged pixel slices and strided image views.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Pixel element types a caller may hand over.
///
/// Only the real scalar types can be segmented; complex and color tags exist
/// so that callers get a proper `InvalidArgument` instead of a reinterpretation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Complex32,
    Complex64,
    Rgb,
    Rgba,
}

impl PixelType {
    /// `true` for the scalar types supported by the link builder.
    pub fn is_scalar(self) -> bool {
        !matches!(
            self,
            PixelType::Complex32 | PixelType::Complex64 | PixelType::Rgb | PixelType::Rgba
        )
    }
}

/// Scalar pixel with a similarity predicate.
pub trait Pixel: Copy + PartialEq + PartialOrd + Send + Sync + 'static {
    const TYPE: PixelType;

    /// Convert a user threshold into the pixel domain.
    ///
    /// Integer pixels truncate toward zero and saturate at the type bounds.
    fn threshold_from_f64(threshold: f64) -> Self;

    /// `a` and `b` are similar when they are equal (zero threshold) or when
    /// their absolute difference does not exceed `threshold`.
    fn similar(a: Self, b: Self, threshold: Self) -> bool;
}

macro_rules! impl_int_pixel {
    ($($t:ty => $variant:ident),* $(,)?) => {$(
        impl Pixel for $t {
            const TYPE: PixelType = PixelType::$variant;

            #[inline]
            fn threshold_from_f64(threshold: f64) -> Self {
                threshold as $t
            }

            #[inline]
            fn similar(a: Self, b: Self, threshold: Self) -> bool {
                if threshold == 0 {
                    a == b
                } else {
                    threshold > 0 && a.abs_diff(b) as u128 <= threshold as u128
                }
            }
        }
    )*};
}

macro_rules! impl_float_pixel {
    ($($t:ty => $variant:ident),* $(,)?) => {$(
        impl Pixel for $t {
            const TYPE: PixelType = PixelType::$variant;

            #[inline]
            fn threshold_from_f64(threshold: f64) -> Self {
                threshold as $t
            }

            #[inline]
            fn similar(a: Self, b: Self, threshold: Self) -> bool {
                if threshold == 0.0 {
                    a == b
                } else {
                    (a - b).abs() <= threshold
                }
            }
        }
    )*};
}

impl_int_pixel!(
    i8 => I8, u8 => U8, i16 => I16, u16 => U16,
    i32 => I32, u32 => U32, i64 => I64, u64 => U64,
);
impl_float_pixel!(f32 => F32, f64 => F64);

/// Strided, read-only view on a rectangular block of pixels.
///
/// Pixel `(x, y)` lives at `data[offset + y * stride + x]`.
#[derive(Clone, Copy, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    offset: usize,
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T: Copy> ImageView<'a, T> {
    /// Validate the geometry against the buffer and build the view.
    pub fn from_slice(
        data: &'a [T],
        offset: usize,
        width: usize,
        height: usize,
        stride: usize,
    ) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::InvalidAddress {
                what: "pixel buffer",
            });
        }
        if width == 0 || height == 0 {
            return Err(Error::invalid(format!(
                "invalid image dimensions (width={width}, height={height})"
            )));
        }
        if stride < width {
            return Err(Error::invalid(format!(
                "stride {stride} is smaller than width {width}"
            )));
        }
        let required = (height - 1)
            .checked_mul(stride)
            .and_then(|n| n.checked_add(width))
            .and_then(|n| n.checked_add(offset))
            .ok_or_else(|| Error::invalid("image geometry overflows"))?;
        if required > data.len() {
            return Err(Error::invalid(format!(
                "pixel buffer too short (expected at least {required}, got {})",
                data.len()
            )));
        }
        Ok(Self {
            data,
            offset,
            width,
            height,
            stride,
        })
    }

    /// Contiguous row-major view (`stride == width`, no offset).
    pub fn contiguous(data: &'a [T], width: usize, height: usize) -> Result<Self> {
        Self::from_slice(data, 0, width, height, width)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row `y` as a slice of exactly `width` pixels.
    #[inline]
    pub fn row(&self, y: usize) -> &'a [T] {
        let start = self.offset + y * self.stride;
        &self.data[start..start + self.width]
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<T> {
        if x < self.width && y < self.height {
            Some(self.data[self.offset + y * self.stride + x])
        } else {
            None
        }
    }
}

/// Type-tagged pixel buffer, the runtime counterpart of `ImageView<T>`.
#[derive(Clone, Copy, Debug)]
pub enum PixelSlice<'a> {
    I8(&'a [i8]),
    U8(&'a [u8]),
    I16(&'a [i16]),
    U16(&'a [u16]),
    I32(&'a [i32]),
    U32(&'a [u32]),
    I64(&'a [i64]),
    U64(&'a [u64]),
    F32(&'a [f32]),
    F64(&'a [f64]),
    Complex32(&'a [[f32; 2]]),
    Complex64(&'a [[f64; 2]]),
    Rgb(&'a [[u8; 3]]),
    Rgba(&'a [[u8; 4]]),
}

/// Callback invoked with a typed view by [`PixelSlice::visit`].
pub trait PixelVisitor {
    type Output;

    fn visit<T: Pixel>(self, view: ImageView<'_, T>) -> Result<Self::Output>;
}

impl<'a> PixelSlice<'a> {
    pub fn pixel_type(&self) -> PixelType {
        match self {
            PixelSlice::I8(_) => PixelType::I8,
            PixelSlice::U8(_) => PixelType::U8,
            PixelSlice::I16(_) => PixelType::I16,
            PixelSlice::U16(_) => PixelType::U16,
            PixelSlice::I32(_) => PixelType::I32,
            PixelSlice::U32(_) => PixelType::U32,
            PixelSlice::I64(_) => PixelType::I64,
            PixelSlice::U64(_) => PixelType::U64,
            PixelSlice::F32(_) => PixelType::F32,
            PixelSlice::F64(_) => PixelType::F64,
            PixelSlice::Complex32(_) => PixelType::Complex32,
            PixelSlice::Complex64(_) => PixelType::Complex64,
            PixelSlice::Rgb(_) => PixelType::Rgb,
            PixelSlice::Rgba(_) => PixelType::Rgba,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PixelSlice::I8(d) => d.len(),
            PixelSlice::U8(d) => d.len(),
            PixelSlice::I16(d) => d.len(),
            PixelSlice::U16(d) => d.len(),
            PixelSlice::I32(d) => d.len(),
            PixelSlice::U32(d) => d.len(),
            PixelSlice::I64(d) => d.len(),
            PixelSlice::U64(d) => d.len(),
            PixelSlice::F32(d) => d.len(),
            PixelSlice::F64(d) => d.len(),
            PixelSlice::Complex32(d) => d.len(),
            PixelSlice::Complex64(d) => d.len(),
            PixelSlice::Rgb(d) => d.len(),
            PixelSlice::Rgba(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build a typed view with the given geometry and hand it to `visitor`.
    ///
    /// Non-scalar pixel types are rejected with `InvalidArgument`.
    pub fn visit<V: PixelVisitor>(
        self,
        offset: usize,
        width: usize,
        height: usize,
        stride: usize,
        visitor: V,
    ) -> Result<V::Output> {
        macro_rules! dispatch {
            ($data:expr) => {
                visitor.visit(ImageView::from_slice($data, offset, width, height, stride)?)
            };
        }
        match self {
            PixelSlice::I8(d) => dispatch!(d),
            PixelSlice::U8(d) => dispatch!(d),
            PixelSlice::I16(d) => dispatch!(d),
            PixelSlice::U16(d) => dispatch!(d),
            PixelSlice::I32(d) => dispatch!(d),
            PixelSlice::U32(d) => dispatch!(d),
            PixelSlice::I64(d) => dispatch!(d),
            PixelSlice::U64(d) => dispatch!(d),
            PixelSlice::F32(d) => dispatch!(d),
            PixelSlice::F64(d) => dispatch!(d),
            other => {
                log::warn!("rejecting unsupported pixel type {:?}", other.pixel_type());
                Err(Error::invalid(format!(
                    "unsupported pixel type {:?}",
                    other.pixel_type()
                )))
            }
        }
    }
}

macro_rules! impl_from_slice {
    ($($t:ty => $variant:ident),* $(,)?) => {$(
        impl<'a> From<&'a [$t]> for PixelSlice<'a> {
            fn from(data: &'a [$t]) -> Self {
                PixelSlice::$variant(data)
            }
        }
    )*};
}

impl_from_slice!(
    i8 => I8, u8 => U8, i16 => I16, u16 => U16, i32 => I32, u32 => U32,
    i64 => I64, u64 => U64, f32 => F32, f64 => F64,
    [f32; 2] => Complex32, [f64; 2] => Complex64, [u8; 3] => Rgb, [u8; 4] => Rgba,
);
