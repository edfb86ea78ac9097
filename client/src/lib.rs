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

pub mod cache;
pub mod figure;
pub mod scene;
pub mod session;
pub mod sync;
pub mod update;
pub mod view;

pub use cache::{CacheStats, SliceCache};
pub use figure::{Figure, ImageLayer, IndicatorTrace};
pub use scene::{SceneBoard, ScenePosition};
pub use session::{Session, SessionError};
pub use sync::{Shown, ViewSynchronizer};
pub use update::Update;
pub use view::{Effects, Message, SlicerView};

#[cfg(test)]
mod tests;
