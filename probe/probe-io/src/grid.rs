//! Dense label lattice.

use nalgebra::{Matrix4, Point3, Vector3};
use probe_types::{VolumeSample, VolumeSource};

use crate::error::{IoError, IoResult};

/// A dense 3D lattice of scalar values with a voxel-to-world transform.
///
/// Values are stored x-fastest: the voxel `(i, j, k)` lives at
/// `i + nx * (j + ny * k)`, which is also the scan order reported through
/// [`VolumeSource`]. The affine maps integer voxel indices to the world
/// position of the voxel centre.
///
/// # Example
///
/// ```
/// use probe_io::LabelGrid;
/// use probe_types::VolumeSource;
/// use nalgebra::{Point3, Vector3};
///
/// let grid = LabelGrid::from_spacing(
///     [2, 1, 1],
///     Vector3::new(0.5, 0.5, 0.5),
///     Point3::new(10.0, 0.0, 0.0),
///     vec![0.0, 4.0],
/// )
/// .unwrap();
///
/// assert_eq!(grid.sample_count(), 2);
/// assert_eq!(grid.sample(1).position, Point3::new(10.5, 0.0, 0.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LabelGrid {
    dims: [usize; 3],
    affine: Matrix4<f64>,
    values: Vec<f64>,
}

impl LabelGrid {
    /// Creates a grid from dimensions, a voxel-to-world affine and values.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidContent`] if a dimension is zero or the
    /// value count does not match the dimensions.
    pub fn new(dims: [usize; 3], affine: Matrix4<f64>, values: Vec<f64>) -> IoResult<Self> {
        let expected = voxel_count(dims)?;
        if values.len() != expected {
            return Err(IoError::invalid_content(format!(
                "grid {}x{}x{} needs {expected} values, got {}",
                dims[0],
                dims[1],
                dims[2],
                values.len()
            )));
        }
        Ok(Self {
            dims,
            affine,
            values,
        })
    }

    /// Creates an axis-aligned grid from voxel spacing and the world
    /// position of voxel `(0, 0, 0)`.
    ///
    /// # Errors
    ///
    /// Same as [`LabelGrid::new`].
    pub fn from_spacing(
        dims: [usize; 3],
        spacing: Vector3<f64>,
        origin: Point3<f64>,
        values: Vec<f64>,
    ) -> IoResult<Self> {
        let mut affine = Matrix4::from_diagonal(&spacing.push(1.0));
        affine[(0, 3)] = origin.x;
        affine[(1, 3)] = origin.y;
        affine[(2, 3)] = origin.z;
        Self::new(dims, affine, values)
    }

    /// Grid dimensions `[nx, ny, nz]`.
    #[must_use]
    pub const fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Voxel-to-world transform.
    #[must_use]
    pub const fn affine(&self) -> &Matrix4<f64> {
        &self.affine
    }

    /// All values in scan order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// World position of voxel `(i, j, k)`. Indices outside the grid are
    /// extrapolated with the same affine.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn voxel_to_world(&self, i: usize, j: usize, k: usize) -> Point3<f64> {
        self.affine
            .transform_point(&Point3::new(i as f64, j as f64, k as f64))
    }

    /// Voxel `(i, j, k)` of a scan-order index.
    const fn voxel_of(&self, index: usize) -> (usize, usize, usize) {
        let [nx, ny, _] = self.dims;
        (index % nx, (index / nx) % ny, index / (nx * ny))
    }
}

impl VolumeSource for LabelGrid {
    fn sample_count(&self) -> usize {
        self.values.len()
    }

    fn sample(&self, index: usize) -> VolumeSample {
        let (i, j, k) = self.voxel_of(index);
        VolumeSample::new(self.voxel_to_world(i, j, k), self.values[index])
    }
}

/// Number of voxels in a grid, rejecting empty or overflowing dimensions.
pub(crate) fn voxel_count(dims: [usize; 3]) -> IoResult<usize> {
    if dims.contains(&0) {
        return Err(IoError::invalid_content(format!(
            "grid dimensions must be positive, got {}x{}x{}",
            dims[0], dims[1], dims[2]
        )));
    }
    dims[0]
        .checked_mul(dims[1])
        .and_then(|n| n.checked_mul(dims[2]))
        .ok_or_else(|| IoError::invalid_content("grid dimensions overflow"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid_2x3x2() -> LabelGrid {
        let values = (0..12).map(f64::from).collect();
        LabelGrid::from_spacing(
            [2, 3, 2],
            Vector3::new(1.0, 2.0, 3.0),
            Point3::new(-1.0, 0.0, 5.0),
            values,
        )
        .unwrap()
    }

    #[test]
    fn scan_order_is_x_fastest() {
        let grid = grid_2x3x2();
        assert_eq!(grid.voxel_of(1), (1, 0, 0));
        assert_eq!(grid.voxel_of(2), (0, 1, 0));
        assert_eq!(grid.voxel_of(6), (0, 0, 1));
        assert_eq!(grid.voxel_of(11), (1, 2, 1));
        assert_relative_eq!(grid.sample(11).value, 11.0);
    }

    #[test]
    fn world_positions_follow_spacing() {
        let grid = grid_2x3x2();
        let p = grid.voxel_to_world(1, 2, 1);
        assert_relative_eq!(p.x, 0.0);
        assert_relative_eq!(p.y, 4.0);
        assert_relative_eq!(p.z, 8.0);
    }

    #[test]
    fn sample_matches_voxel() {
        let grid = grid_2x3x2();
        let sample = grid.sample(7);
        assert_relative_eq!(sample.value, 7.0);
        assert_eq!(sample.position, grid.voxel_to_world(1, 0, 1));
    }

    #[test]
    fn value_count_mismatch() {
        let result = LabelGrid::from_spacing(
            [2, 2, 2],
            Vector3::new(1.0, 1.0, 1.0),
            Point3::origin(),
            vec![0.0; 7],
        );
        assert!(matches!(result, Err(IoError::InvalidContent { .. })));
    }

    #[test]
    fn zero_dimension_rejected() {
        assert!(voxel_count([4, 0, 4]).is_err());
        assert_eq!(voxel_count([4, 2, 3]).unwrap(), 24);
    }
}
