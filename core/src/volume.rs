use std::{fmt, sync::Arc};

use ndarray::{Array3, ArrayD, ArrayView2, Ix3};
use get_size::GetSize;
use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};

use crate::err::Error;
use crate::geom::{Axis, Vec3U};

/// Any scalar type a volume can be made of.
pub trait Voxel: Copy + Send + Sync + AsPrimitive<f32> + 'static {}

impl<T> Voxel for T where T: Copy + Send + Sync + AsPrimitive<f32> + 'static {}

/// An immutable 3D array in `zyx` order.
///
/// Cloning is cheap and shares the backing array, so any number of workers can read
/// slices concurrently.
#[derive(Clone)]
pub struct Volume<T> {
    data: Arc<Array3<T>>,
}

impl<T: Voxel> Volume<T> {
    pub fn new(data: Array3<T>) -> Result<Self, Error> {
        let (z, y, x) = data.dim();
        if z == 0 || y == 0 || x == 0 {
            return Err(Error::EmptyVolume { shape: [z, y, x] });
        }
        Ok(Self {
            data: Arc::new(data),
        })
    }

    /// Accepts an array of any dimensionality, failing unless it is 3D.
    pub fn from_dyn(data: ArrayD<T>) -> Result<Self, Error> {
        let ndim = data.ndim();
        let data = data
            .into_dimensionality::<Ix3>()
            .map_err(|_| Error::NotThreeDimensional { ndim })?;
        Self::new(data)
    }

    pub fn shape(&self) -> Vec3U {
        self.data.dim().into()
    }

    pub fn array(&self) -> &Array3<T> {
        &self.data
    }

    /// Identifies the shared allocation, used to derive a default scene id.
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.data) as usize
    }
}

impl<T> fmt::Debug for Volume<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Volume")
            .field("shape", &self.data.shape())
            .finish()
    }
}

/// A validated position along the slicing axis.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    GetSize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct SliceIndex(usize);

impl SliceIndex {
    /// The only way to get a `SliceIndex` from untrusted input.
    pub fn checked(raw: i64, len: usize) -> Result<Self, Error> {
        match usize::try_from(raw) {
            Ok(index) if index < len => Ok(SliceIndex(index)),
            _ => Err(Error::IndexOutOfRange { index: raw, len }),
        }
    }

    /// Clamps `raw` into `[0, len - 1]`, as the slider does. `len` must be non-zero.
    pub fn clamped(raw: i64, len: usize) -> Self {
        let max = len.saturating_sub(1);
        SliceIndex(usize::try_from(raw.max(0)).map_or(max, |i| i.min(max)))
    }

    pub fn get(self) -> usize {
        self.0
    }

    pub fn as_i64(self) -> i64 {
        self.0 as i64
    }
}

/// Read-only access to one volume, sliced along a fixed axis.
#[derive(Debug, Clone)]
pub struct VolumeStore<T> {
    volume: Volume<T>,
    axis: Axis,
}

impl<T: Voxel> VolumeStore<T> {
    pub fn new(volume: Volume<T>, axis: Axis) -> Self {
        Self { volume, axis }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn volume(&self) -> &Volume<T> {
        &self.volume
    }

    /// Number of slices along the axis.
    pub fn len(&self) -> usize {
        self.volume.shape()[self.axis]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn check(&self, raw: i64) -> Result<SliceIndex, Error> {
        SliceIndex::checked(raw, self.len())
    }

    /// A view of the 2D slice at `index`. Rows are the first remaining volume dimension.
    pub fn get_slice(&self, index: SliceIndex) -> Result<ArrayView2<'_, T>, Error> {
        let len = self.len();
        if index.get() >= len {
            return Err(Error::IndexOutOfRange {
                index: index.as_i64(),
                len,
            });
        }
        Ok(self.volume.array().index_axis(self.axis.as_nd(), index.get()))
    }
}
