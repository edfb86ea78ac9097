use std::{fmt, io::Cursor};

use base64::{engine::general_purpose::STANDARD, Engine};
use get_size::GetSize;
use image::{imageops, GrayImage, ImageBuffer, ImageFormat, Pixel, PixelWithColorType, RgbaImage};
use ndarray::{ArrayView2, ArrayView3, ArrayViewD, Ix2, Ix3};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::geom::Vec2U;

pub const PNG_URI_PREFIX: &str = "data:image/png;base64,";

/// A self-contained image, usable directly as an image source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, GetSize)]
#[serde(transparent)]
pub struct EncodedSlice(String);

impl EncodedSlice {
    /// Wraps a payload as received from the other side. Not validated.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        EncodedSlice(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// The raw PNG bytes, if this is a base64 PNG data URI.
    pub fn png_bytes(&self) -> Option<Vec<u8>> {
        let b64 = self.0.strip_prefix(PNG_URI_PREFIX)?;
        STANDARD.decode(b64).ok()
    }
}

impl fmt::Display for EncodedSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EncodedSlice {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Expected a {expected} array, got shape {found:?}")]
    Format {
        expected: &'static str,
        found: Vec<usize>,
    },
    #[error("Cannot encode an empty image of shape {0:?}")]
    Empty(Vec<usize>),
    #[error("Image of shape {0:?} is too large to encode")]
    TooLarge(Vec<usize>),
    #[error("PNG encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Encodes a grayscale slice as a PNG data URI. Rows of the array become image rows.
#[instrument(skip(slice), fields(shape = ?slice.shape()))]
pub fn encode(slice: ArrayView2<'_, u8>) -> Result<EncodedSlice, EncodeError> {
    let img: GrayImage = to_image(slice.shape(), slice.iter().copied().collect())?;
    png_uri(&img)
}

/// Encodes an `(h, w, 4)` RGBA array as a PNG data URI.
#[instrument(skip(rgba), fields(shape = ?rgba.shape()))]
pub fn encode_rgba(rgba: ArrayView3<'_, u8>) -> Result<EncodedSlice, EncodeError> {
    if rgba.shape()[2] != 4 {
        return Err(EncodeError::Format {
            expected: "(h, w, 4) RGBA",
            found: rgba.shape().to_vec(),
        });
    }
    let img: RgbaImage = to_image(&rgba.shape()[..2], rgba.iter().copied().collect())?;
    png_uri(&img)
}

/// Encodes an array of unknown dimensionality: 2D is grayscale, `(h, w, 4)` is RGBA,
/// anything else is a format error.
pub fn encode_dyn(arr: ArrayViewD<'_, u8>) -> Result<EncodedSlice, EncodeError> {
    let found = arr.shape().to_vec();
    match arr.ndim() {
        2 => encode(arr.into_dimensionality::<Ix2>().map_err(|_| format_err(found))?),
        3 => encode_rgba(arr.into_dimensionality::<Ix3>().map_err(|_| format_err(found))?),
        _ => Err(format_err(found)),
    }
}

/// Like [`encode`], but downscaled to fit within `max` (never upscaled).
pub fn encode_thumbnail(slice: ArrayView2<'_, u8>, max: Vec2U) -> Result<EncodedSlice, EncodeError> {
    let img: GrayImage = to_image(slice.shape(), slice.iter().copied().collect())?;
    let size = thumbnail_size(Vec2U::new(img.width(), img.height()), max);
    if size == Vec2U::new(img.width(), img.height()) {
        return png_uri(&img);
    }
    png_uri(&imageops::thumbnail(&img, size.x, size.y))
}

/// The size an image of `size` (w, h) gets when shrunk to fit within `max`, keeping aspect.
pub fn thumbnail_size(size: Vec2U, max: Vec2U) -> Vec2U {
    if size.x <= max.x && size.y <= max.y {
        return size;
    }
    let scale = f64::min(
        f64::from(max.x) / f64::from(size.x),
        f64::from(max.y) / f64::from(size.y),
    );
    let w = (f64::from(size.x) * scale).round().max(1.0) as u32;
    let h = (f64::from(size.y) * scale).round().max(1.0) as u32;
    Vec2U::new(w.min(max.x), h.min(max.y))
}

fn format_err(found: Vec<usize>) -> EncodeError {
    EncodeError::Format {
        expected: "2D grayscale or (h, w, 4) RGBA",
        found,
    }
}

fn to_image<P>(shape: &[usize], raw: Vec<u8>) -> Result<ImageBuffer<P, Vec<u8>>, EncodeError>
where
    P: Pixel<Subpixel = u8>,
{
    let (h, w) = (shape[0], shape[1]);
    if h == 0 || w == 0 {
        return Err(EncodeError::Empty(shape.to_vec()));
    }
    let (Ok(w), Ok(h)) = (u32::try_from(w), u32::try_from(h)) else {
        return Err(EncodeError::TooLarge(shape.to_vec()));
    };
    ImageBuffer::from_raw(w, h, raw).ok_or_else(|| EncodeError::TooLarge(shape.to_vec()))
}

fn png_uri<P>(img: &ImageBuffer<P, Vec<u8>>) -> Result<EncodedSlice, EncodeError>
where
    P: Pixel<Subpixel = u8> + PixelWithColorType,
{
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    let mut uri = String::with_capacity(PNG_URI_PREFIX.len() + png.len() * 4 / 3 + 4);
    uri.push_str(PNG_URI_PREFIX);
    STANDARD.encode_string(&png, &mut uri);
    Ok(EncodedSlice(uri))
}
