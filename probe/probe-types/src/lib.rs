//! Core data types for label probing.
//!
//! Label probing transfers region ids from a label volume onto the vertices
//! of surface meshes that live in the same world space, then votes across
//! meshes that share one vertex index space. This crate holds the types that
//! flow between those stages:
//!
//! - [`Label`] and [`LabeledPoint`] - A positive region id at a voxel centre
//! - [`VolumeSample`] and [`VolumeSource`] - Enumerable voxels of a label volume
//! - [`SurfaceMesh`] - Ordered vertex positions of one surface
//! - [`VertexVote`] - The voted label at one vertex and its agreement
//!
//! # Layer 0 Crate
//!
//! This crate has no I/O and no algorithms beyond trivial accessors. Readers
//! live in `probe-io`, the probing pipeline in `probe-labels`.
//!
//! # Coordinates
//!
//! All positions are world coordinates in `f64`. Volumes and meshes must
//! already be aligned; nothing here resamples or registers.
//!
//! # Example
//!
//! ```
//! use probe_types::{VolumeSample, VolumeSource, Point3};
//!
//! let samples = vec![
//!     VolumeSample::new(Point3::new(0.0, 0.0, 0.0), 0.0),
//!     VolumeSample::new(Point3::new(1.0, 0.0, 0.0), 3.0),
//! ];
//!
//! assert_eq!(samples.sample_count(), 2);
//! assert_eq!(samples.sample(1).value, 3.0);
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod label;
mod mesh;
mod volume;
mod vote;

pub use label::{Label, LabeledPoint};
pub use mesh::SurfaceMesh;
pub use volume::{VolumeSample, VolumeSource};
pub use vote::VertexVote;

// Re-export nalgebra types for convenience
pub use nalgebra::Point3;
