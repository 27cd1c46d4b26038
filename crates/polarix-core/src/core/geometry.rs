use nalgebra::{Point3, Vector3};

/// Resolves pair separations under the minimum image convention.
///
/// The solver never assumes a particular periodic geometry; it asks a
/// `MinimumImage` implementation for the displacement from a particle to the
/// periodic replica of another particle that lies nearest to it.
pub trait MinimumImage {
    /// Displacement from `to`'s nearest periodic image towards `from`,
    /// i.e. `from - image(to)`.
    fn separation(&self, from: &Point3<f64>, to: &Point3<f64>) -> Vector3<f64>;
}

/// Non-periodic geometry: separations are plain coordinate differences.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenBoundary;

impl MinimumImage for OpenBoundary {
    #[inline]
    fn separation(&self, from: &Point3<f64>, to: &Point3<f64>) -> Vector3<f64> {
        from - to
    }
}

/// An axis-aligned periodic box with edge lengths `lengths`.
#[derive(Debug, Clone, Copy)]
pub struct OrthorhombicBox {
    lengths: Vector3<f64>,
}

impl OrthorhombicBox {
    pub fn new(lengths: Vector3<f64>) -> Self {
        Self { lengths }
    }

    pub fn lengths(&self) -> &Vector3<f64> {
        &self.lengths
    }
}

impl MinimumImage for OrthorhombicBox {
    #[inline]
    fn separation(&self, from: &Point3<f64>, to: &Point3<f64>) -> Vector3<f64> {
        let mut d = from - to;
        for axis in 0..3 {
            let l = self.lengths[axis];
            d[axis] -= l * (d[axis] / l).round();
        }
        d
    }
}
