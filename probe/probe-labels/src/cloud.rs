//! Labelled voxel point clouds.
//!
//! A label volume is reduced to the centres of its foreground voxels. Each
//! voxel value is rounded to the nearest integer (ties to even) and
//! kept only when the result is strictly positive, so background can never
//! be transferred onto a surface.

use nalgebra::Point3;
use probe_types::{Label, LabeledPoint, VolumeSource};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{ProbeError, ProbeResult};

/// Foreground voxel centres and their labels, in volume scan order.
///
/// Positions and labels are stored as parallel arrays so the positions can
/// be handed to a spatial index without copying labels along.
///
/// # Example
///
/// ```
/// use probe_labels::LabeledPointCloud;
/// use probe_types::{VolumeSample, Point3};
///
/// let volume = vec![
///     VolumeSample::new(Point3::new(0.0, 0.0, 0.0), 0.0),
///     VolumeSample::new(Point3::new(1.0, 0.0, 0.0), 4.2),
///     VolumeSample::new(Point3::new(2.0, 0.0, 0.0), 0.4),
/// ];
///
/// let cloud = LabeledPointCloud::build(&volume).unwrap();
/// assert_eq!(cloud.len(), 1);
/// assert_eq!(cloud.labels(), &[4]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledPointCloud {
    positions: Vec<Point3<f64>>,
    labels: Vec<Label>,
}

impl LabeledPointCloud {
    /// Scans a volume and keeps every voxel whose rounded value is positive.
    ///
    /// The scan runs in parallel; the result is still in scan order.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::LabelOutOfRange`] if a rounded value exceeds
    /// [`Label::MAX`]. An empty result is not an error here; building a
    /// [`SpatialIndex`](crate::SpatialIndex) over it is.
    pub fn build<V: VolumeSource + ?Sized>(volume: &V) -> ProbeResult<Self> {
        let total = volume.sample_count();

        let kept: Vec<LabeledPoint> = (0..total)
            .into_par_iter()
            .filter_map(|index| {
                let sample = volume.sample(index);
                round_label(sample.value)
                    .map(|label| label.map(|l| LabeledPoint::new(sample.position, l)))
                    .map_err(|value| ProbeError::LabelOutOfRange { index, value })
                    .transpose()
            })
            .collect::<ProbeResult<_>>()?;

        let cloud = Self::from_points(kept);
        info!(
            voxels = total,
            labelled = cloud.len(),
            distinct_labels = cloud.distinct_labels().len(),
            "Built labelled point cloud"
        );
        Ok(cloud)
    }

    /// Creates a cloud from already-filtered points.
    ///
    /// Points with label `0` are dropped to keep the foreground invariant.
    #[must_use]
    pub fn from_points<I: IntoIterator<Item = LabeledPoint>>(points: I) -> Self {
        let (positions, labels) = points
            .into_iter()
            .filter(|p| p.label > 0)
            .map(|p| (p.position, p.label))
            .unzip();
        Self { positions, labels }
    }

    /// Number of labelled points.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether no voxel carried a positive label.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Voxel centres, in scan order.
    #[inline]
    #[must_use]
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    /// Labels, parallel to [`positions`](Self::positions).
    #[inline]
    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Label of the point at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    #[inline]
    #[must_use]
    pub fn label(&self, index: usize) -> Label {
        self.labels[index]
    }

    /// The point at `index`, if any.
    #[must_use]
    pub fn point(&self, index: usize) -> Option<LabeledPoint> {
        Some(LabeledPoint::new(
            *self.positions.get(index)?,
            self.labels[index],
        ))
    }

    /// Sorted distinct labels present in the cloud.
    #[must_use]
    pub fn distinct_labels(&self) -> Vec<Label> {
        let mut labels = self.labels.clone();
        labels.par_sort_unstable();
        labels.dedup();
        labels
    }

    /// Whether any point carries `label`.
    #[must_use]
    pub fn contains_label(&self, label: Label) -> bool {
        self.labels.contains(&label)
    }
}

/// Rounds a voxel value to a label.
///
/// `Ok(None)` is background (including non-finite values), `Err` carries a
/// value too large for [`Label`].
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_label(value: f64) -> Result<Option<Label>, f64> {
    let rounded = value.round_ties_even();
    if !rounded.is_finite() || rounded < 1.0 {
        return Ok(None);
    }
    if rounded > f64::from(Label::MAX) {
        debug!(value, "Voxel value exceeds label range");
        return Err(value);
    }
    Ok(Some(rounded as Label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use probe_types::VolumeSample;

    fn volume(values: &[f64]) -> Vec<VolumeSample> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                #[allow(clippy::cast_precision_loss)]
                let x = i as f64;
                VolumeSample::new(Point3::new(x, 0.0, 0.0), v)
            })
            .collect()
    }

    #[test]
    fn background_is_dropped() {
        let cloud = LabeledPointCloud::build(&volume(&[0.0, 3.0, 0.0, 2.0])).unwrap();
        assert_eq!(cloud.labels(), &[3, 2]);
        assert_eq!(
            cloud.positions(),
            &[Point3::new(1.0, 0.0, 0.0), Point3::new(3.0, 0.0, 0.0)]
        );
    }

    #[test]
    fn values_are_rounded() {
        let cloud = LabeledPointCloud::build(&volume(&[0.49, 0.5, 1.49, 2.51, -3.0])).unwrap();
        assert_eq!(cloud.labels(), &[1, 3]);
    }

    #[test]
    fn halves_round_to_even() {
        let cloud = LabeledPointCloud::build(&volume(&[0.5, 2.5, 1.5, 3.5, -0.5])).unwrap();
        assert_eq!(cloud.labels(), &[2, 2, 4]);
        assert_eq!(
            cloud.positions(),
            &[
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(3.0, 0.0, 0.0)
            ]
        );
    }

    #[test]
    fn non_finite_values_are_background() {
        let cloud =
            LabeledPointCloud::build(&volume(&[f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1.0]))
                .unwrap();
        assert_eq!(cloud.labels(), &[1]);
    }

    #[test]
    fn scan_order_is_preserved() {
        let values: Vec<f64> = (0..10_000).map(|i| f64::from(i % 7)).collect();
        let cloud = LabeledPointCloud::build(&volume(&values)).unwrap();

        let expected: Vec<Label> = (0..10_000u32).map(|i| i % 7).filter(|&l| l > 0).collect();
        assert_eq!(cloud.labels(), expected.as_slice());
        assert!(
            cloud
                .positions()
                .windows(2)
                .all(|w| w[0].x < w[1].x)
        );
    }

    #[test]
    fn all_zero_volume_is_empty() {
        let cloud = LabeledPointCloud::build(&volume(&[0.0; 8])).unwrap();
        assert!(cloud.is_empty());
    }

    #[test]
    fn oversized_value_is_rejected() {
        let result = LabeledPointCloud::build(&volume(&[1.0, 1e12]));
        assert!(matches!(
            result,
            Err(ProbeError::LabelOutOfRange { index: 1, .. })
        ));
    }

    #[test]
    fn distinct_labels_sorted() {
        let cloud = LabeledPointCloud::build(&volume(&[9.0, 2.0, 9.0, 4.0, 2.0])).unwrap();
        assert_eq!(cloud.distinct_labels(), vec![2, 4, 9]);
        assert!(cloud.contains_label(4));
        assert!(!cloud.contains_label(5));
    }

    #[test]
    fn from_points_drops_background() {
        let cloud = LabeledPointCloud::from_points([
            LabeledPoint::from_coords(0.0, 0.0, 0.0, 0),
            LabeledPoint::from_coords(1.0, 0.0, 0.0, 6),
        ]);
        assert_eq!(cloud.len(), 1);
        assert_eq!(
            cloud.point(0),
            Some(LabeledPoint::from_coords(1.0, 0.0, 0.0, 6))
        );
        assert_eq!(cloud.point(1), None);
    }
}
