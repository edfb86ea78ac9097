use serde::{Deserialize, Serialize};
use volslicer_core::SliceInfo;

/// The single image layer of the figure. Its sources are replaced in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageLayer {
    pub source: String,
    /// Empty when the slice has no overlay.
    pub overlay: String,
    pub x0: f64,
    pub y0: f64,
    pub dx: f64,
    pub dy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axes {
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    /// Keep pixels square.
    pub scale_anchor: bool,
}

/// Line segments marking where other slicers of the same scene cut this slice.
///
/// `None` breaks the line, so each position becomes two short ticks just outside the
/// image, one on either side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorTrace {
    pub color: String,
    pub x: Vec<Option<f64>>,
    pub y: Vec<Option<f64>>,
}

impl IndicatorTrace {
    pub const COLOR: &'static str = "#ff00aa";

    /// Ticks for `rows` (scene `y` coordinates, drawn horizontally) and `cols` (scene `x`
    /// coordinates, drawn vertically). No positions, no trace.
    pub fn for_positions(info: &SliceInfo, rows: &[f64], cols: &[f64]) -> Option<Self> {
        if rows.is_empty() && cols.is_empty() {
            return None;
        }
        let (w, h) = info.extent();
        let (x1, y1) = (info.origin.x + w, info.origin.y + h);
        let (x0, y0) = (info.origin.x - info.spacing.x, info.origin.y - info.spacing.y);
        // Tick length, 5% of the mean side.
        let d = ((x1 - x0) + (y1 - y0)) * 0.5 * 0.05;

        let (mut x, mut y) = (Vec::new(), Vec::new());
        for &pos in rows {
            x.extend([Some(x0 - d), Some(x0), None, Some(x1), Some(x1 + d), None]);
            y.extend([Some(pos); 6]);
        }
        for &pos in cols {
            x.extend([Some(pos); 6]);
            y.extend([Some(y0 - d), Some(y0), None, Some(y1), Some(y1 + d), None]);
        }
        Some(Self {
            color: Self::COLOR.to_string(),
            x,
            y,
        })
    }
}

/// A figure with exactly one embedded image layer, plus the position indicators of the
/// other slicers in its scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub image: ImageLayer,
    pub axes: Axes,
    #[serde(default)]
    pub indicators: Vec<IndicatorTrace>,
}

impl Figure {
    /// An empty figure sized for slices described by `info`.
    pub fn new(info: &SliceInfo, reverse_y: bool) -> Self {
        let (x0, y0) = (info.origin.x, info.origin.y);
        let (w, h) = info.extent();
        // Pixel centers sit on the origin, so the image spans half a voxel either side.
        let x_range = (x0 - 0.5 * info.spacing.x, x0 + w - 0.5 * info.spacing.x);
        let y_lo = y0 - 0.5 * info.spacing.y;
        let y_hi = y0 + h - 0.5 * info.spacing.y;
        Self {
            image: ImageLayer {
                source: String::new(),
                overlay: String::new(),
                x0,
                y0,
                dx: info.spacing.x,
                dy: info.spacing.y,
            },
            axes: Axes {
                x_range,
                y_range: if reverse_y { (y_hi, y_lo) } else { (y_lo, y_hi) },
                scale_anchor: true,
            },
            indicators: Vec::new(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.image.source.is_empty()
    }

    pub fn shows(&self, source: &str, overlay: &str) -> bool {
        self.image.source == source && self.image.overlay == overlay
    }
}
