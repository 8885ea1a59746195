//! Nearest-neighbour lookup over labelled voxel centres.
//!
//! [`SpatialIndex`] wraps an immutable k-d tree. Voxel lattices put thousands
//! of points on every axis-aligned plane, which an incrementally built tree
//! with fixed-size buckets cannot hold, so the tree is built in one pass from
//! the full position slice.
//!
//! [`LinearScanIndex`] answers the same queries by brute force and serves as
//! a conformance baseline.

use kiddo::{ImmutableKdTree, SquaredEuclidean};
use nalgebra::Point3;
use tracing::debug;

use crate::error::{ProbeError, ProbeResult};

/// Closest-point queries over a fixed set of positions.
///
/// Implementors are immutable after construction and may be queried from
/// many threads at once.
pub trait NearestNeighbor: Sync {
    /// Number of stored positions.
    fn len(&self) -> usize;

    /// Whether nothing is stored. Always `false` for indices built through
    /// this crate.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of the closest stored position and its Euclidean distance.
    ///
    /// Among equidistant candidates any one may be returned, but the same
    /// query always gives the same answer.
    fn nearest_with_distance(&self, query: &Point3<f64>) -> (usize, f64);

    /// Index of the closest stored position.
    fn nearest(&self, query: &Point3<f64>) -> usize {
        self.nearest_with_distance(query).0
    }
}

/// k-d tree index over point positions.
///
/// # Example
///
/// ```
/// use probe_labels::{NearestNeighbor, SpatialIndex};
/// use nalgebra::Point3;
///
/// let index = SpatialIndex::build(&[
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(10.0, 0.0, 0.0),
/// ])
/// .unwrap();
///
/// assert_eq!(index.nearest(&Point3::new(9.0, 0.0, 0.0)), 1);
/// ```
pub struct SpatialIndex {
    tree: ImmutableKdTree<f64, 3>,
    len: usize,
}

impl SpatialIndex {
    /// Builds the index.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::EmptyIndex`] if `positions` is empty.
    pub fn build(positions: &[Point3<f64>]) -> ProbeResult<Self> {
        if positions.is_empty() {
            return Err(ProbeError::EmptyIndex);
        }

        let entries: Vec<[f64; 3]> = positions.iter().map(|p| [p.x, p.y, p.z]).collect();
        let tree = ImmutableKdTree::new_from_slice(&entries);
        debug!(points = positions.len(), "Built k-d tree");

        Ok(Self {
            tree,
            len: positions.len(),
        })
    }
}

impl NearestNeighbor for SpatialIndex {
    fn len(&self) -> usize {
        self.len
    }

    fn nearest_with_distance(&self, query: &Point3<f64>) -> (usize, f64) {
        let nearest = self
            .tree
            .nearest_one::<SquaredEuclidean>(&[query.x, query.y, query.z]);
        #[allow(clippy::cast_possible_truncation)]
        let index = nearest.item as usize;
        (index, nearest.distance.sqrt())
    }
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

/// Brute-force index. Every query is `O(n)`.
///
/// Ties resolve to the lowest index.
#[derive(Debug, Clone)]
pub struct LinearScanIndex {
    positions: Vec<Point3<f64>>,
}

impl LinearScanIndex {
    /// Builds the index.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::EmptyIndex`] if `positions` is empty.
    pub fn build(positions: &[Point3<f64>]) -> ProbeResult<Self> {
        if positions.is_empty() {
            return Err(ProbeError::EmptyIndex);
        }
        Ok(Self {
            positions: positions.to_vec(),
        })
    }
}

impl NearestNeighbor for LinearScanIndex {
    fn len(&self) -> usize {
        self.positions.len()
    }

    fn nearest_with_distance(&self, query: &Point3<f64>) -> (usize, f64) {
        let mut best = (0, f64::INFINITY);
        for (i, p) in self.positions.iter().enumerate() {
            let d = (p - query).norm_squared();
            if d < best.1 {
                best = (i, d);
            }
        }
        (best.0, best.1.sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};

    fn random_points(count: usize, seed: u64) -> Vec<Point3<f64>> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                Point3::new(
                    rng.gen_range(-50.0..50.0),
                    rng.gen_range(-50.0..50.0),
                    rng.gen_range(-50.0..50.0),
                )
            })
            .collect()
    }

    /// Voxel centres of an `n`-cube lattice with unit spacing.
    fn lattice(n: u32) -> Vec<Point3<f64>> {
        let mut points = Vec::new();
        for k in 0..n {
            for j in 0..n {
                for i in 0..n {
                    points.push(Point3::new(f64::from(i), f64::from(j), f64::from(k)));
                }
            }
        }
        points
    }

    #[test]
    fn empty_index_is_an_error() {
        assert!(matches!(
            SpatialIndex::build(&[]),
            Err(ProbeError::EmptyIndex)
        ));
        assert!(matches!(
            LinearScanIndex::build(&[]),
            Err(ProbeError::EmptyIndex)
        ));
    }

    #[test]
    fn stored_points_find_themselves() {
        let points = random_points(500, 7);
        let index = SpatialIndex::build(&points).unwrap();

        for (i, p) in points.iter().enumerate() {
            let (found, distance) = index.nearest_with_distance(p);
            assert_eq!(found, i);
            assert_relative_eq!(distance, 0.0);
        }
    }

    #[test]
    fn lattice_points_find_themselves() {
        // 4096 points, 256 on every axis-aligned plane
        let points = lattice(16);
        let index = SpatialIndex::build(&points).unwrap();

        assert_eq!(index.len(), points.len());
        for (i, p) in points.iter().enumerate() {
            assert_eq!(index.nearest(p), i);
        }
    }

    #[test]
    fn agrees_with_linear_scan() {
        let points = random_points(2000, 11);
        let queries = random_points(500, 12);
        let tree = SpatialIndex::build(&points).unwrap();
        let scan = LinearScanIndex::build(&points).unwrap();

        for q in &queries {
            let (_, tree_distance) = tree.nearest_with_distance(q);
            let (_, scan_distance) = scan.nearest_with_distance(q);
            assert_relative_eq!(tree_distance, scan_distance, epsilon = 1e-9);
        }
    }

    #[test]
    fn off_lattice_queries_pick_the_nearest_voxel() {
        let points = lattice(8);
        let index = SpatialIndex::build(&points).unwrap();

        let query = Point3::new(3.2, 5.9, 0.1);
        let found = index.nearest(&query);
        assert_eq!(points[found], Point3::new(3.0, 6.0, 0.0));
    }

    #[test]
    fn repeated_queries_are_stable() {
        let points = lattice(6);
        let index = SpatialIndex::build(&points).unwrap();

        // Equidistant between two voxels
        let query = Point3::new(2.5, 1.0, 1.0);
        let first = index.nearest(&query);
        for _ in 0..10 {
            assert_eq!(index.nearest(&query), first);
        }
        assert!(
            points[first] == Point3::new(2.0, 1.0, 1.0)
                || points[first] == Point3::new(3.0, 1.0, 1.0)
        );
    }

    #[test]
    fn linear_scan_ties_go_to_lowest_index() {
        let points = [Point3::new(-1.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let scan = LinearScanIndex::build(&points).unwrap();
        assert_eq!(scan.nearest(&Point3::origin()), 0);
    }

    #[test]
    fn single_point_index() {
        let index = SpatialIndex::build(&[Point3::new(3.0, 3.0, 3.0)]).unwrap();
        assert!(!index.is_empty());
        let (found, distance) = index.nearest_with_distance(&Point3::origin());
        assert_eq!(found, 0);
        assert_relative_eq!(distance, 27f64.sqrt());
    }
}
