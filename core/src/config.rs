use serde::{Deserialize, Serialize};

use crate::err::Error;
use crate::geom::{Axis, Vec2U, Vec3F};
use crate::quantize::Quantization;

/// What the view shows while the slice for the active index is still in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placeholder {
    /// Keep the last rendered slice on screen.
    #[default]
    StaleFrame,
    /// Show the low resolution thumbnail of the active index.
    Thumbnail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlicerConfig {
    pub axis: usize,
    /// Voxel spacing per dimension, `zyx`.
    pub spacing: [f64; 3],
    /// Scene offset per dimension, `zyx`.
    pub origin: [f64; 3],
    /// Put the slice origin in the top-left instead of the bottom-left.
    pub reverse_y: bool,
    /// Slicers sharing a scene id show the same volume. Derived from the volume if unset.
    pub scene_id: Option<String>,
    pub quantization: Quantization,
    /// Bounding box of the pre-rendered thumbnails, or `None` to skip them.
    pub thumbnail_size: Option<(u32, u32)>,
    /// Maximum number of slices the client keeps. Unbounded if unset.
    pub cache_capacity: Option<usize>,
    pub placeholder: Placeholder,
}

impl Default for SlicerConfig {
    fn default() -> Self {
        Self {
            axis: 0,
            spacing: [1.0, 1.0, 1.0],
            origin: [0.0, 0.0, 0.0],
            reverse_y: true,
            scene_id: None,
            quantization: Quantization::default(),
            thumbnail_size: Some((32, 32)),
            cache_capacity: None,
            placeholder: Placeholder::default(),
        }
    }
}

impl SlicerConfig {
    pub fn with_axis(mut self, axis: usize) -> Self {
        self.axis = axis;
        self
    }

    /// Checks everything that does not depend on the volume.
    pub fn validate(&self) -> Result<ValidConfig, Error> {
        let axis = Axis::try_from(self.axis)?;
        self.quantization.validate()?;
        let thumbnail_size = match self.thumbnail_size {
            Some((w, h)) if w == 0 || h == 0 => return Err(Error::InvalidThumbnail(w, h)),
            other => other.map(Vec2U::from),
        };
        Ok(ValidConfig {
            axis,
            spacing: self.spacing.into(),
            origin: self.origin.into(),
            thumbnail_size,
        })
    }
}

/// The typed parts of a [`SlicerConfig`] after validation.
#[derive(Debug, Clone, Copy)]
pub struct ValidConfig {
    pub axis: Axis,
    pub spacing: Vec3F,
    pub origin: Vec3F,
    pub thumbnail_size: Option<Vec2U>,
}
