use serde::{Deserialize, Serialize};

use crate::geom::{Axis, Vec2U, Vec3F, Vec3U};
use crate::volume::SliceIndex;

/// Geometry of one slicer, shared with the client at construction.
///
/// `size`, `origin` and `spacing` are in the slice's local frame: `(x', y', out-of-plane)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceInfo {
    /// Volume shape in `zyx` order.
    pub shape: Vec3U,
    pub axis: Axis,
    pub size: Vec3U,
    pub origin: Vec3F,
    pub spacing: Vec3F,
    pub lowres_size: Option<Vec2U>,
}

impl SliceInfo {
    pub fn new(shape: Vec3U, axis: Axis, origin: Vec3F, spacing: Vec3F) -> Self {
        Self {
            shape,
            axis,
            size: shape.to_size2d(axis),
            origin: origin.to_size2d(axis),
            spacing: spacing.to_size2d(axis),
            lowres_size: None,
        }
    }

    /// Number of slices along the axis.
    pub fn len(&self) -> usize {
        self.size.z
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scene coordinate of the slice plane.
    pub fn position(&self, index: SliceIndex) -> f64 {
        self.origin.z + index.get() as f64 * self.spacing.z
    }

    /// Scene-space extent of a full resolution slice, `(width, height)`.
    pub fn extent(&self) -> (f64, f64) {
        (
            self.size.x as f64 * self.spacing.x,
            self.size.y as f64 * self.spacing.y,
        )
    }
}
