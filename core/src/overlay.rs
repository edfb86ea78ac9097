use std::sync::Arc;

use ndarray::{Array3, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::err::Error;
use crate::geom::{Axis, Vec3U};
use crate::volume::SliceIndex;

pub type Rgba = [u8; 4];

/// Maps mask values to colors. Values past the end reuse the last color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u8>>", into = "Vec<Vec<u8>>")]
pub struct Colormap(Vec<Rgba>);

impl Default for Colormap {
    fn default() -> Self {
        Colormap(vec![[0, 0, 0, 0], [0, 255, 255, 100]])
    }
}

impl Colormap {
    /// A transparent background with a single color for every non-zero mask value.
    pub fn single(color: Rgba) -> Self {
        Colormap(vec![[0, 0, 0, 0], color])
    }

    pub fn new(colors: Vec<Rgba>) -> Result<Self, Error> {
        if colors.is_empty() {
            return Err(Error::EmptyColormap);
        }
        Ok(Colormap(colors))
    }

    /// Accepts either one color or a list of colors, each of 4 components.
    pub fn from_components(colors: &[Vec<u8>]) -> Result<Self, Error> {
        match colors {
            [] => Err(Error::EmptyColormap),
            [single] => Ok(Colormap::single(to_rgba(single)?)),
            many => Ok(Colormap(
                many.iter()
                    .map(|c| to_rgba(c))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
        }
    }

    pub fn color(&self, value: u8) -> Rgba {
        let idx = usize::from(value).min(self.0.len() - 1);
        self.0[idx]
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.0
    }
}

fn to_rgba(c: &[u8]) -> Result<Rgba, Error> {
    <Rgba>::try_from(c).map_err(|_| Error::InvalidColor(c.len()))
}

impl TryFrom<Vec<Vec<u8>>> for Colormap {
    type Error = Error;

    fn try_from(value: Vec<Vec<u8>>) -> Result<Self, Self::Error> {
        Colormap::from_components(&value)
    }
}

impl From<Colormap> for Vec<Vec<u8>> {
    fn from(map: Colormap) -> Self {
        map.0.iter().map(|c| c.to_vec()).collect()
    }
}

/// A label mask for a volume. Its shape is checked when it is attached to a slicer.
#[derive(Debug, Clone)]
pub struct Overlay {
    mask: Arc<Array3<u8>>,
    colormap: Colormap,
}

impl Overlay {
    pub fn new(mask: Array3<u8>) -> Self {
        Self {
            mask: Arc::new(mask),
            colormap: Colormap::default(),
        }
    }

    pub fn from_bool(mask: &Array3<bool>) -> Self {
        Self::new(mask.mapv(u8::from))
    }

    pub fn shape(&self) -> Vec3U {
        self.mask.dim().into()
    }

    pub fn mask(&self) -> &Array3<u8> {
        &self.mask
    }

    pub fn with_colormap(mut self, colormap: Colormap) -> Self {
        self.colormap = colormap;
        self
    }

    pub fn set_colormap(&mut self, colormap: Colormap) {
        self.colormap = colormap;
    }

    pub fn colormap(&self) -> &Colormap {
        &self.colormap
    }

    /// The colored `(h, w, 4)` overlay for one slice, or `None` if the mask is empty there.
    pub fn slice_rgba(&self, axis: Axis, index: SliceIndex) -> Option<Array3<u8>> {
        let labels: ArrayView2<'_, u8> = self.mask.index_axis(axis.as_nd(), index.get());
        if labels.iter().all(|&v| v == 0) {
            return None;
        }
        let (h, w) = labels.dim();
        Some(Array3::from_shape_fn((h, w, 4), |(y, x, c)| {
            self.colormap.color(labels[(y, x)])[c]
        }))
    }
}

#[cfg(test)]
mod test {
    use ndarray::Array3;

    use super::*;
    use crate::geom::Vec3;

    #[test]
    fn shape_in_array_order() {
        let overlay = Overlay::new(Array3::<u8>::zeros((4, 3, 2)));
        assert_eq!(overlay.shape(), Vec3::new(4, 3, 2));
    }

    #[test]
    fn empty_slices_have_no_overlay() {
        let mut mask = Array3::<bool>::from_elem((4, 3, 2), false);
        mask[(1, 2, 1)] = true;
        let overlay = Overlay::from_bool(&mask);

        let idx = |i| SliceIndex::checked(i, 4).unwrap();
        assert!(overlay.slice_rgba(Axis::Z, idx(0)).is_none());

        let rgba = overlay.slice_rgba(Axis::Z, idx(1)).unwrap();
        assert_eq!(rgba.dim(), (3, 2, 4));
        assert_eq!(rgba.slice(ndarray::s![2, 1, ..]).to_vec(), vec![0, 255, 255, 100]);
        assert_eq!(rgba.slice(ndarray::s![0, 0, ..]).to_vec(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn colormap_repeats_last_color() {
        let map = Colormap::new(vec![[0, 0, 0, 0], [255, 0, 0, 255], [0, 255, 0, 255]]).unwrap();
        assert_eq!(map.color(1), [255, 0, 0, 255]);
        assert_eq!(map.color(2), [0, 255, 0, 255]);
        assert_eq!(map.color(7), [0, 255, 0, 255]);
    }

    #[test]
    fn colormap_from_components() {
        let single = Colormap::from_components(&[vec![1, 2, 3, 4]]).unwrap();
        assert_eq!(single.colors(), &[[0, 0, 0, 0], [1, 2, 3, 4]]);

        let many = Colormap::from_components(&[vec![0, 0, 0, 0], vec![9, 9, 9, 9]]).unwrap();
        assert_eq!(many.colors().len(), 2);

        assert!(matches!(
            Colormap::from_components(&[vec![1, 2, 3]]),
            Err(Error::InvalidColor(3))
        ));
        assert!(matches!(
            Colormap::from_components(&[]),
            Err(Error::EmptyColormap)
        ));
    }

    #[test]
    fn colormap_from_json() {
        let single: Colormap = serde_json::from_str("[[255, 0, 0, 255]]").unwrap();
        assert_eq!(single, Colormap::single([255, 0, 0, 255]));

        let many: Colormap = serde_json::from_str("[[0, 0, 0, 0], [1, 2, 3, 4], [5, 6, 7, 8]]").unwrap();
        assert_eq!(many.colors().len(), 3);

        assert!(serde_json::from_str::<Colormap>("[[1, 2, 3]]").is_err());
        assert!(serde_json::from_str::<Colormap>("[]").is_err());
    }
}
