//! Region labels.

use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An anatomical region id. Zero is background and never stored.
pub type Label = u32;

/// A labelled voxel centre.
///
/// # Example
///
/// ```
/// use probe_types::{LabeledPoint, Point3};
///
/// let point = LabeledPoint::new(Point3::new(1.0, 2.0, 3.0), 42);
/// assert_eq!(point.label, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LabeledPoint {
    /// World position of the voxel centre.
    pub position: Point3<f64>,
    /// Region id, always `>= 1`.
    pub label: Label,
}

impl LabeledPoint {
    /// Creates a labelled point.
    #[inline]
    #[must_use]
    pub const fn new(position: Point3<f64>, label: Label) -> Self {
        Self { position, label }
    }

    /// Creates a labelled point from raw coordinates.
    #[inline]
    #[must_use]
    pub const fn from_coords(x: f64, y: f64, z: f64, label: Label) -> Self {
        Self {
            position: Point3::new(x, y, z),
            label,
        }
    }
}
