use ndarray::{Array2, ArrayView2};
use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};

use crate::err::Error;
use crate::volume::Voxel;

/// How raw intensities are mapped onto the 8-bit display range.
///
/// Both modes are lossy but deterministic: the same slice always maps to the same bytes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Quantization {
    /// Divide by a fixed factor, then clip to `[0, 255]` and truncate.
    DisplayRange { factor: f32 },
    /// Scale so that the slice maximum becomes 255.
    Stretch,
}

impl Default for Quantization {
    fn default() -> Self {
        Quantization::DisplayRange { factor: 4.0 }
    }
}

impl Quantization {
    pub fn validate(&self) -> Result<(), Error> {
        match *self {
            Quantization::DisplayRange { factor } if !(factor.is_finite() && factor > 0.0) => {
                Err(Error::InvalidDisplayRange(factor))
            }
            _ => Ok(()),
        }
    }

    pub fn apply<T: Voxel>(&self, slice: ArrayView2<'_, T>) -> Array2<u8> {
        match *self {
            Quantization::DisplayRange { factor } => {
                slice.mapv(|v| to_ubyte(AsPrimitive::<f32>::as_(v) / factor))
            }
            Quantization::Stretch => {
                let max = slice
                    .iter()
                    .map(|v| AsPrimitive::<f32>::as_(*v))
                    .fold(f32::NEG_INFINITY, f32::max);
                if !(max.is_finite() && max > 0.0) {
                    return Array2::zeros(slice.raw_dim());
                }
                let scale = 255.0 / max;
                slice.mapv(|v| to_ubyte(AsPrimitive::<f32>::as_(v) * scale))
            }
        }
    }
}

// `as` saturates at the bounds and maps NaN to 0.
fn to_ubyte(v: f32) -> u8 {
    v.clamp(0.0, 255.0) as u8
}
