//! Per-vertex label sampling.

use nalgebra::Point3;
use probe_types::{Label, SurfaceMesh};
use rayon::prelude::*;
use tracing::debug;

use crate::cloud::LabeledPointCloud;
use crate::index::NearestNeighbor;

/// Labels assigned to the vertices of one mesh, in vertex order.
pub type MeshVertexLabels = Vec<Label>;

/// Transfers labels from a point cloud onto mesh vertices.
///
/// Each vertex takes the label of the closest labelled voxel centre. The
/// sampler borrows the index and the cloud it was built from; both are
/// read-only, so vertices are processed in parallel.
///
/// # Example
///
/// ```
/// use probe_labels::{LabeledPointCloud, MeshLabelSampler, SpatialIndex};
/// use probe_types::LabeledPoint;
/// use nalgebra::Point3;
///
/// let cloud = LabeledPointCloud::from_points([
///     LabeledPoint::from_coords(0.0, 0.0, 0.0, 5),
///     LabeledPoint::from_coords(10.0, 0.0, 0.0, 7),
/// ]);
/// let index = SpatialIndex::build(cloud.positions()).unwrap();
/// let sampler = MeshLabelSampler::new(&index, &cloud);
///
/// let labels = sampler.sample(&[Point3::new(0.0, 0.0, 0.0), Point3::new(9.0, 0.0, 0.0)]);
/// assert_eq!(labels, vec![5, 7]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct MeshLabelSampler<'a, I: NearestNeighbor> {
    index: &'a I,
    cloud: &'a LabeledPointCloud,
}

impl<'a, I: NearestNeighbor> MeshLabelSampler<'a, I> {
    /// Creates a sampler.
    ///
    /// `index` must have been built from `cloud.positions()`.
    #[must_use]
    pub fn new(index: &'a I, cloud: &'a LabeledPointCloud) -> Self {
        debug_assert_eq!(index.len(), cloud.len());
        Self { index, cloud }
    }

    /// Label of the closest labelled voxel for every vertex.
    ///
    /// The output has one entry per vertex, in vertex order.
    #[must_use]
    pub fn sample(&self, vertices: &[Point3<f64>]) -> MeshVertexLabels {
        let labels: MeshVertexLabels = vertices
            .par_iter()
            .map(|v| self.cloud.label(self.index.nearest(v)))
            .collect();
        debug!(vertices = labels.len(), "Sampled vertex labels");
        labels
    }

    /// Samples every vertex of a mesh.
    #[must_use]
    pub fn sample_mesh(&self, mesh: &SurfaceMesh) -> MeshVertexLabels {
        self.sample(&mesh.vertices)
    }

    /// Labels plus the distance from each vertex to the voxel it took its
    /// label from.
    #[must_use]
    pub fn sample_with_distances(&self, vertices: &[Point3<f64>]) -> (MeshVertexLabels, Vec<f64>) {
        vertices
            .par_iter()
            .map(|v| {
                let (nearest, distance) = self.index.nearest_with_distance(v);
                (self.cloud.label(nearest), distance)
            })
            .unzip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{LinearScanIndex, SpatialIndex};
    use approx::assert_relative_eq;
    use probe_types::LabeledPoint;
    use rand::{Rng, SeedableRng};

    fn two_label_cloud() -> LabeledPointCloud {
        LabeledPointCloud::from_points([
            LabeledPoint::from_coords(0.0, 0.0, 0.0, 5),
            LabeledPoint::from_coords(10.0, 0.0, 0.0, 7),
        ])
    }

    #[test]
    fn vertices_take_nearest_label() {
        let cloud = two_label_cloud();
        let index = SpatialIndex::build(cloud.positions()).unwrap();
        let sampler = MeshLabelSampler::new(&index, &cloud);

        let a = sampler.sample(&[Point3::new(0.0, 0.0, 0.0), Point3::new(9.0, 0.0, 0.0)]);
        let b = sampler.sample(&[Point3::new(1.0, 0.0, 0.0), Point3::new(11.0, 0.0, 0.0)]);

        assert_eq!(a, vec![5, 7]);
        assert_eq!(b, vec![5, 7]);
    }

    #[test]
    fn empty_mesh_gives_empty_labels() {
        let cloud = two_label_cloud();
        let index = SpatialIndex::build(cloud.positions()).unwrap();
        let sampler = MeshLabelSampler::new(&index, &cloud);

        assert!(sampler.sample_mesh(&SurfaceMesh::new()).is_empty());
    }

    #[test]
    fn labels_come_from_the_cloud() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let cloud = LabeledPointCloud::from_points((0..300).map(|_| {
            LabeledPoint::from_coords(
                rng.gen_range(0.0..20.0),
                rng.gen_range(0.0..20.0),
                rng.gen_range(0.0..20.0),
                rng.gen_range(1..=6),
            )
        }));
        let index = SpatialIndex::build(cloud.positions()).unwrap();
        let sampler = MeshLabelSampler::new(&index, &cloud);

        let vertices: Vec<Point3<f64>> = (0..1000)
            .map(|_| {
                Point3::new(
                    rng.gen_range(-5.0..25.0),
                    rng.gen_range(-5.0..25.0),
                    rng.gen_range(-5.0..25.0),
                )
            })
            .collect();
        let labels = sampler.sample(&vertices);

        assert_eq!(labels.len(), vertices.len());
        assert!(labels.iter().all(|&l| cloud.contains_label(l)));
    }

    #[test]
    fn kd_tree_and_linear_scan_sample_alike() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(21);
        let cloud = LabeledPointCloud::from_points((0..400).map(|i| {
            LabeledPoint::from_coords(
                rng.gen_range(0.0..10.0),
                rng.gen_range(0.0..10.0),
                rng.gen_range(0.0..10.0),
                i % 9 + 1,
            )
        }));
        let tree = SpatialIndex::build(cloud.positions()).unwrap();
        let scan = LinearScanIndex::build(cloud.positions()).unwrap();

        let vertices: Vec<Point3<f64>> = (0..300)
            .map(|_| {
                Point3::new(
                    rng.gen_range(0.0..10.0),
                    rng.gen_range(0.0..10.0),
                    rng.gen_range(0.0..10.0),
                )
            })
            .collect();

        let from_tree = MeshLabelSampler::new(&tree, &cloud).sample(&vertices);
        let from_scan = MeshLabelSampler::new(&scan, &cloud).sample(&vertices);
        assert_eq!(from_tree, from_scan);
    }

    #[test]
    fn distances_are_reported() {
        let cloud = two_label_cloud();
        let index = SpatialIndex::build(cloud.positions()).unwrap();
        let sampler = MeshLabelSampler::new(&index, &cloud);

        let (labels, distances) =
            sampler.sample_with_distances(&[Point3::new(0.0, 3.0, 4.0), Point3::new(12.0, 0.0, 0.0)]);

        assert_eq!(labels, vec![5, 7]);
        assert_relative_eq!(distances[0], 5.0);
        assert_relative_eq!(distances[1], 2.0);
    }
}
