#![warn(clippy::complexity)]
#![warn(clippy::correctness)]
#![warn(clippy::perf)]
#![warn(clippy::style)]
#![warn(clippy::suspicious)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod coordinator;
pub mod encode;
pub mod endpoint;
pub mod err;
pub mod geom;
pub mod info;
pub mod overlay;
pub mod quantize;
pub mod slicer;
pub mod volume;

pub use config::{Placeholder, SlicerConfig};
pub use coordinator::{Rejected, SliceCoordinator, SliceHandler, SliceReply, SliceResponse};
pub use encode::EncodedSlice;
pub use endpoint::{ResponseCell, SliceRequest, SlicerRegistry};
pub use err::Error;
pub use info::SliceInfo;
pub use slicer::{ContextId, SceneId, SlicerLayout, VolumeSlicer};
pub use volume::{SliceIndex, Voxel, Volume, VolumeStore};
