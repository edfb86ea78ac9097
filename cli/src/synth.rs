use ndarray::Array3;

/// A synthetic test volume: a smooth ramp with a bright ball in the middle.
pub struct Phantom {
    pub volume: Array3<u16>,
    /// Voxels inside the ball.
    pub mask: Array3<bool>,
}

pub fn phantom((nz, ny, nx): (usize, usize, usize)) -> Phantom {
    let center = (nz as f64 / 2.0, ny as f64 / 2.0, nx as f64 / 2.0);
    let radius = nz.min(ny).min(nx) as f64 / 3.0;
    let inside = |(z, y, x): (usize, usize, usize)| {
        let d2 = (z as f64 - center.0).powi(2)
            + (y as f64 - center.1).powi(2)
            + (x as f64 - center.2).powi(2);
        d2 <= radius * radius
    };

    let mask = Array3::from_shape_fn((nz, ny, nx), inside);
    let volume = Array3::from_shape_fn((nz, ny, nx), |(z, y, x)| {
        let ramp = (z * 8 + (y + x) * 2).min(400) as u16;
        if mask[(z, y, x)] {
            ramp + 600
        } else {
            ramp
        }
    });
    Phantom { volume, mask }
}
