//! Surface meshes as seen by the prober.

use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A surface mesh reduced to what label probing needs.
///
/// Only vertex positions and their order matter for probing. Faces are kept
/// when the reader provides them so callers can write labelled meshes back
/// out, but nothing in the probing path reads them.
///
/// # Example
///
/// ```
/// use probe_types::{SurfaceMesh, Point3};
///
/// let mesh = SurfaceMesh::from_vertices(vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ]);
///
/// assert_eq!(mesh.vertex_count(), 3);
/// assert_eq!(mesh.face_count(), 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SurfaceMesh {
    /// Vertex positions in file order.
    pub vertices: Vec<Point3<f64>>,

    /// Triangle faces as indices into `vertices`, possibly empty.
    pub faces: Vec<[u32; 3]>,
}

impl SurfaceMesh {
    /// Creates an empty mesh.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Creates a mesh with pre-allocated capacity.
    #[inline]
    #[must_use]
    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
        }
    }

    /// Creates a face-less mesh from vertex positions.
    #[inline]
    #[must_use]
    pub const fn from_vertices(vertices: Vec<Point3<f64>>) -> Self {
        Self {
            vertices,
            faces: Vec::new(),
        }
    }

    /// Creates a mesh from vertices and faces.
    #[inline]
    #[must_use]
    pub const fn from_parts(vertices: Vec<Point3<f64>>, faces: Vec<[u32; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// Number of vertices.
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces.
    #[inline]
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Whether the mesh has no vertices.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Whether every face references an existing vertex.
    #[must_use]
    pub fn faces_in_bounds(&self) -> bool {
        let n = self.vertices.len();
        self.faces
            .iter()
            .all(|face| face.iter().all(|&i| (i as usize) < n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mesh() {
        let mesh = SurfaceMesh::new();
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
        assert!(mesh.faces_in_bounds());
    }

    #[test]
    fn faces_out_of_bounds() {
        let mesh = SurfaceMesh::from_parts(
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)],
            vec![[0, 1, 2]],
        );
        assert!(!mesh.faces_in_bounds());
    }

    #[test]
    fn with_capacity_is_empty() {
        let mesh = SurfaceMesh::with_capacity(16, 8);
        assert!(mesh.is_empty());
        assert_eq!(mesh.face_count(), 0);
    }
}
