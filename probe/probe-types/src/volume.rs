//! Volume sampling interface.
//!
//! A label volume is consumed as an indexed sequence of samples: one
//! `(position, value)` pair per voxel, background included, in the volume's
//! own scan order. Random access by index lets consumers scan in parallel
//! while still reporting results in scan order.

use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One voxel of a scalar volume.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VolumeSample {
    /// World position of the voxel centre.
    pub position: Point3<f64>,
    /// Raw scalar value, before any rounding.
    pub value: f64,
}

impl VolumeSample {
    /// Creates a sample.
    #[inline]
    #[must_use]
    pub const fn new(position: Point3<f64>, value: f64) -> Self {
        Self { position, value }
    }
}

/// A volume that can enumerate its voxels.
///
/// Implementors must return the same sample for the same index for their
/// whole lifetime, and `sample` must accept every index in
/// `0..sample_count()`.
///
/// # Example
///
/// ```
/// use probe_types::{VolumeSample, VolumeSource, Point3};
///
/// struct Line(usize);
///
/// impl VolumeSource for Line {
///     fn sample_count(&self) -> usize {
///         self.0
///     }
///
///     fn sample(&self, index: usize) -> VolumeSample {
///         VolumeSample::new(Point3::new(index as f64, 0.0, 0.0), 1.0)
///     }
/// }
///
/// let line = Line(4);
/// assert_eq!(line.samples().count(), 4);
/// ```
pub trait VolumeSource: Sync {
    /// Number of voxels, background included.
    fn sample_count(&self) -> usize;

    /// The voxel at `index` in scan order.
    ///
    /// # Panics
    ///
    /// May panic if `index >= self.sample_count()`.
    fn sample(&self, index: usize) -> VolumeSample;

    /// Iterates every voxel in scan order.
    fn samples(&self) -> impl Iterator<Item = VolumeSample> + '_
    where
        Self: Sized,
    {
        (0..self.sample_count()).map(move |i| self.sample(i))
    }
}

impl VolumeSource for [VolumeSample] {
    fn sample_count(&self) -> usize {
        self.len()
    }

    fn sample(&self, index: usize) -> VolumeSample {
        self[index]
    }
}

impl VolumeSource for Vec<VolumeSample> {
    fn sample_count(&self) -> usize {
        self.len()
    }

    fn sample(&self, index: usize) -> VolumeSample {
        self[index]
    }
}

impl<V: VolumeSource + ?Sized> VolumeSource for &V {
    fn sample_count(&self) -> usize {
        (**self).sample_count()
    }

    fn sample(&self, index: usize) -> VolumeSample {
        (**self).sample(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<VolumeSample> {
        vec![
            VolumeSample::new(Point3::new(0.0, 0.0, 0.0), 0.0),
            VolumeSample::new(Point3::new(1.0, 0.0, 0.0), 2.0),
            VolumeSample::new(Point3::new(2.0, 0.0, 0.0), 0.4),
        ]
    }

    #[test]
    fn vec_source_preserves_order() {
        let source = samples();
        let values: Vec<f64> = source.samples().map(|s| s.value).collect();
        assert_eq!(values, vec![0.0, 2.0, 0.4]);
    }

    #[test]
    fn slice_source() {
        let source = samples();
        let slice: &[VolumeSample] = &source;
        assert_eq!(slice.sample_count(), 3);
        assert_eq!(slice.sample(1).position, Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn reference_source_forwards() {
        let source = samples();
        let by_ref = &source;
        assert_eq!(by_ref.sample_count(), 3);
        assert_eq!(by_ref.sample(2).value, 0.4);
    }
}
