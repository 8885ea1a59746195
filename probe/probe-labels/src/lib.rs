//! Nearest-neighbour label transfer from a label volume onto surfaces.
//!
//! Given a volume whose voxels carry integer region ids and one or more
//! surface meshes in the same world space, every mesh vertex takes the label
//! of the closest labelled voxel centre. When several meshes share vertex
//! correspondence, the per-vertex labels are combined by majority vote and
//! the fraction of agreeing meshes is reported alongside.
//!
//! # Stages
//!
//! - [`LabeledPointCloud`] - Foreground voxel centres with rounded labels
//! - [`SpatialIndex`] - k-d tree over the cloud positions
//! - [`MeshLabelSampler`] - Per-vertex nearest-label lookup
//! - [`VoteAggregator`] - Per-vertex majority across meshes
//!
//! [`run`] drives all of them from files described by a [`ProbeConfig`];
//! [`probe`] does the same for data already in memory.
//!
//! # Example
//!
//! ```
//! use probe_labels::{LabeledPointCloud, MeshLabelSampler, SpatialIndex, VoteAggregator};
//! use probe_types::{Point3, VolumeSample};
//!
//! let volume = vec![
//!     VolumeSample::new(Point3::new(0.0, 0.0, 0.0), 5.0),
//!     VolumeSample::new(Point3::new(10.0, 0.0, 0.0), 7.0),
//! ];
//! let cloud = LabeledPointCloud::build(&volume).unwrap();
//! let index = SpatialIndex::build(cloud.positions()).unwrap();
//! let sampler = MeshLabelSampler::new(&index, &cloud);
//!
//! let a = sampler.sample(&[Point3::new(0.0, 0.0, 0.0), Point3::new(9.0, 0.0, 0.0)]);
//! let b = sampler.sample(&[Point3::new(1.0, 0.0, 0.0), Point3::new(4.0, 0.0, 0.0)]);
//!
//! let votes = VoteAggregator::aggregate(&[a, b]).unwrap();
//! assert_eq!(votes[1].voted_label, 5);
//! assert_eq!(votes[1].agreement, 0.5);
//! ```
//!
//! # Parallelism
//!
//! Voxel filtering, vertex sampling and voting are data-parallel on the
//! current rayon pool. Results always come back in input order, so output
//! does not depend on the thread count.

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod cloud;
mod config;
mod error;
mod index;
mod pipeline;
mod sample;
mod vote;

pub use cloud::LabeledPointCloud;
pub use config::ProbeConfig;
pub use error::{ProbeError, ProbeResult};
pub use index::{LinearScanIndex, NearestNeighbor, SpatialIndex};
pub use pipeline::{ProbeOutcome, ProbeSummary, probe, run};
pub use sample::{MeshLabelSampler, MeshVertexLabels};
pub use vote::{VoteAggregator, VoteSummary, vote};

pub use probe_types::{Label, LabeledPoint, SurfaceMesh, VertexVote};
