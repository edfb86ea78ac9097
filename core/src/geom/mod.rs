use std::ops::Index;

use derive_more::{Add, Constructor, Mul, Sub};
use serde::{Deserialize, Serialize};

use crate::err::Error;

/// One of the three volume dimensions, in `zyx` order.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum Axis {
    Z = 0,
    Y = 1,
    X = 2,
}

impl Axis {
    pub fn iter() -> impl Iterator<Item = Axis> {
        [Axis::Z, Axis::Y, Axis::X].into_iter()
    }

    pub fn as_usize(self) -> usize {
        self as usize
    }

    /// The two other axes in array order. A slice along `self` has the first as its rows
    /// (`y'`) and the second as its columns (`x'`).
    pub fn in_plane(self) -> [Axis; 2] {
        match self {
            Axis::Z => [Axis::Y, Axis::X],
            Axis::Y => [Axis::Z, Axis::X],
            Axis::X => [Axis::Z, Axis::Y],
        }
    }

    pub fn as_nd(self) -> ndarray::Axis {
        ndarray::Axis(self.as_usize())
    }
}

impl TryFrom<usize> for Axis {
    type Error = Error;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Axis::Z),
            1 => Ok(Axis::Y),
            2 => Ok(Axis::X),
            _ => Err(Error::InvalidAxis(value)),
        }
    }
}

impl From<Axis> for usize {
    fn from(axis: Axis) -> Self {
        axis.as_usize()
    }
}

#[derive(
    Add, Sub, Mul, Constructor, Default, PartialEq, Eq, Debug, Copy, Clone, Serialize, Deserialize,
)]
pub struct Vec2<T> {
    pub x: T,
    pub y: T,
}

pub type Vec2U = Vec2<u32>;

impl<T> From<(T, T)> for Vec2<T> {
    fn from((x, y): (T, T)) -> Self {
        Vec2 { x, y }
    }
}

impl<T> From<Vec2<T>> for (T, T) {
    fn from(v: Vec2<T>) -> Self {
        (v.x, v.y)
    }
}

/// A generic triple. The fields are positional, not spatial:
///
/// - for volume quantities (shape, spacing, origin) the triple is in array order, so
///   `x` holds the z component, `y` holds y and `z` holds x. Index with [`Axis`] rather
///   than reading fields directly.
/// - after [`Vec3::to_size2d`] the triple is in the local frame of a slice: `x` and `y`
///   are the in-plane image axes and `z` is the out-of-plane component.
#[derive(
    Add, Sub, Mul, Constructor, Default, PartialEq, Eq, Debug, Copy, Clone, Hash, Serialize,
    Deserialize,
)]
pub struct Vec3<T> {
    pub x: T,
    pub y: T,
    pub z: T,
}

pub type Vec3U = Vec3<usize>;
pub type Vec3F = Vec3<f64>;

impl Vec3F {
    pub const ZERO: Vec3F = Vec3F {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
    pub const ONE: Vec3F = Vec3F {
        x: 1.0,
        y: 1.0,
        z: 1.0,
    };
}

impl<T> From<(T, T, T)> for Vec3<T> {
    fn from((x, y, z): (T, T, T)) -> Self {
        Vec3 { x, y, z }
    }
}

impl<T> From<[T; 3]> for Vec3<T> {
    fn from([x, y, z]: [T; 3]) -> Self {
        Vec3 { x, y, z }
    }
}

impl<T> From<Vec3<T>> for [T; 3] {
    fn from(v: Vec3<T>) -> Self {
        [v.x, v.y, v.z]
    }
}

impl<T> From<Vec3<T>> for (T, T, T) {
    fn from(v: Vec3<T>) -> Self {
        (v.x, v.y, v.z)
    }
}

impl<T: Copy> Vec3<T> {
    pub fn iter<'a>(&self) -> impl Iterator<Item = T> + 'a
    where
        T: 'a,
    {
        [self.x, self.y, self.z].into_iter()
    }

    /// Turns a volume-ordered triple (z, y, x) into the local frame of a slice along `axis`:
    /// the two in-plane components reversed into (x', y'), followed by the out-of-plane one.
    pub fn to_size2d(&self, axis: Axis) -> Vec3<T> {
        let (z, y, x) = (self.x, self.y, self.z);
        match axis {
            Axis::Z => Vec3::new(x, y, z),
            Axis::Y => Vec3::new(x, z, y),
            Axis::X => Vec3::new(y, z, x),
        }
    }

    /// The in-plane part of the triple.
    pub fn xy(&self) -> Vec2<T> {
        Vec2::new(self.x, self.y)
    }
}

/// Array-order access: `Axis::Z` is the first component.
impl<T> Index<Axis> for Vec3<T> {
    type Output = T;

    fn index(&self, i: Axis) -> &T {
        match i {
            Axis::Z => &self.x,
            Axis::Y => &self.y,
            Axis::X => &self.z,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn axis_from_usize() {
        assert_eq!(Axis::try_from(0).unwrap(), Axis::Z);
        assert_eq!(Axis::try_from(2).unwrap(), Axis::X);
        assert!(matches!(Axis::try_from(3), Err(Error::InvalidAxis(3))));
    }

    #[test]
    fn size2d_reorders_zyx() {
        let shape = Vec3::new(12, 13, 14);
        assert_eq!(shape.to_size2d(Axis::Z), Vec3::new(14, 13, 12));
        assert_eq!(shape.to_size2d(Axis::Y), Vec3::new(14, 12, 13));
        assert_eq!(shape.to_size2d(Axis::X), Vec3::new(13, 12, 14));
    }

    #[test]
    fn size2d_matches_slice_dims() {
        let arr = ndarray::Array3::<u8>::zeros((3, 4, 5));
        let shape: Vec3U = arr.dim().into();
        for axis in Axis::iter() {
            let local = shape.to_size2d(axis);
            let slice = arr.index_axis(axis.as_nd(), 0);
            assert_eq!(slice.dim(), (local.y, local.x));
            assert_eq!(local.z, shape[axis]);

            let [rows, cols] = axis.in_plane();
            assert_eq!((shape[rows], shape[cols]), (local.y, local.x));
        }
    }

    #[test]
    fn index_by_axis() {
        let shape = Vec3::new(10, 64, 32);
        assert_eq!(shape[Axis::Z], 10);
        assert_eq!(shape[Axis::Y], 64);
        assert_eq!(shape[Axis::X], 32);
    }
}
