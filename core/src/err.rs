use miette::Diagnostic;
use thiserror::Error;

use crate::encode::EncodeError;
use crate::slicer::ContextId;

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Expected volume to be a 3D array, got {ndim} dimensions")]
    #[diagnostic(
        code(volslicer::volume::not_3d),
        help("Reshape or stack the data into a (z, y, x) array")
    )]
    NotThreeDimensional { ndim: usize },
    #[error("Volume has an empty dimension: {shape:?}")]
    #[diagnostic(code(volslicer::volume::empty))]
    EmptyVolume { shape: [usize; 3] },
    #[error("The given axis must be 0, 1, or 2, got {0}")]
    #[diagnostic(code(volslicer::config::invalid_axis))]
    InvalidAxis(usize),
    #[error("Slice index {index} out of range 0..{len}")]
    #[diagnostic(code(volslicer::request::out_of_range))]
    IndexOutOfRange { index: i64, len: usize },
    #[error("Overlay must have shape {expected:?}, but got {found:?}")]
    #[diagnostic(code(volslicer::overlay::shape))]
    OverlayShape {
        expected: [usize; 3],
        found: Vec<usize>,
    },
    #[error("Overlay colors must be 4 ints (0..255), got {0} components")]
    #[diagnostic(
        code(volslicer::overlay::color),
        help("Pass RGBA colors, e.g. [0, 255, 255, 100]")
    )]
    InvalidColor(usize),
    #[error("Overlay colormap is empty")]
    #[diagnostic(code(volslicer::overlay::empty_colormap))]
    EmptyColormap,
    #[error("Thumbnail size must be at least 1x1, got {0}x{1}")]
    #[diagnostic(code(volslicer::config::thumbnail))]
    InvalidThumbnail(u32, u32),
    #[error("Display range factor must be positive and finite, got {0}")]
    #[diagnostic(code(volslicer::config::display_range))]
    InvalidDisplayRange(f32),
    #[error("No slicer registered for context {0}")]
    #[diagnostic(code(volslicer::endpoint::unknown_context))]
    UnknownContext(ContextId),
    #[error("Failed to encode slice: {0}")]
    #[diagnostic(code(volslicer::encode))]
    Encode(#[from] EncodeError),
}
