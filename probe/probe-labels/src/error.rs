//! Error types for label probing.

use std::path::PathBuf;

use probe_io::IoError;
use thiserror::Error;

/// Errors that abort a probing run.
///
/// Every variant is terminal: nothing is retried and no output is written
/// once one is raised.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The label volume could not be read or decoded.
    #[error("failed to read label volume {path}: {source}")]
    InputFormat {
        /// Volume path.
        path: PathBuf,
        /// Underlying decode error.
        source: IoError,
    },

    /// A surface mesh could not be read or decoded.
    #[error("failed to read mesh {path}: {source}")]
    MeshFormat {
        /// Mesh path.
        path: PathBuf,
        /// Underlying decode error.
        source: IoError,
    },

    /// The label volume has no voxel with a positive label.
    #[error("label volume contains no positively labelled voxels")]
    EmptyIndex,

    /// Meshes do not share a vertex count, so votes cannot be aligned.
    #[error("mesh {mesh} has {found} vertices, expected {expected}")]
    InconsistentVertexCount {
        /// Position of the offending mesh in the vote order.
        mesh: usize,
        /// Vertex count of the first mesh.
        expected: usize,
        /// Vertex count of the offending mesh.
        found: usize,
    },

    /// No meshes were given to vote over.
    #[error("at least one mesh is required")]
    NoMeshes,

    /// A rounded voxel value does not fit a label.
    #[error("voxel {index} has value {value}, which does not fit a label")]
    LabelOutOfRange {
        /// Scan-order index of the voxel.
        index: usize,
        /// Raw voxel value.
        value: f64,
    },

    /// The run configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),

    /// A result file could not be written.
    #[error("failed to write {path}: {source}")]
    Output {
        /// Destination path.
        path: PathBuf,
        /// Underlying write error.
        source: IoError,
    },
}

/// Result type for probing operations.
pub type ProbeResult<T> = Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_file() {
        let err = ProbeError::MeshFormat {
            path: PathBuf::from("sub-01/lh.obj"),
            source: IoError::invalid_content("bad token"),
        };
        let message = err.to_string();
        assert!(message.contains("sub-01/lh.obj"));
        assert!(message.contains("bad token"));
    }

    #[test]
    fn source_is_exposed() {
        use std::error::Error as _;

        let err = ProbeError::InputFormat {
            path: PathBuf::from("labels.nii"),
            source: IoError::UnsupportedDatatype { code: 128 },
        };
        assert!(err.source().is_some());
    }

    #[test]
    fn vertex_count_message() {
        let err = ProbeError::InconsistentVertexCount {
            mesh: 2,
            expected: 40962,
            found: 40960,
        };
        assert_eq!(err.to_string(), "mesh 2 has 40960 vertices, expected 40962");
    }
}
