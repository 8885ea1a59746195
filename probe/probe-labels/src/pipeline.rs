//! End-to-end probing runs.
//!
//! A run moves through four stages, each finishing before the next starts:
//!
//! 1. Read the label volume, reduce it to a point cloud and index it
//! 2. Read each mesh in vote order and sample its vertices
//! 3. Vote per vertex across meshes
//! 4. Write the results
//!
//! Any error aborts the run before stage 4, so a failed run leaves no output
//! behind.

use std::borrow::Borrow;
use std::path::Path;

use probe_io::{IoError, StagedResults};
use probe_types::{Label, SurfaceMesh, VertexVote, VolumeSource};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cloud::LabeledPointCloud;
use crate::config::ProbeConfig;
use crate::error::{ProbeError, ProbeResult};
use crate::index::SpatialIndex;
use crate::sample::{MeshLabelSampler, MeshVertexLabels};
use crate::vote::{VoteAggregator, VoteSummary};

/// Votes produced by a run, with summary statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// One vote per mesh vertex, in vertex order.
    pub votes: Vec<VertexVote>,
    /// Run statistics.
    pub summary: ProbeSummary,
}

impl ProbeOutcome {
    /// Voted label per vertex.
    #[must_use]
    pub fn labels(&self) -> Vec<Label> {
        self.votes.iter().map(|v| v.voted_label).collect()
    }

    /// Agreement per vertex.
    #[must_use]
    pub fn proportions(&self) -> Vec<f64> {
        self.votes.iter().map(|v| v.agreement).collect()
    }
}

/// Statistics about a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeSummary {
    /// Voxels that carried a positive label.
    pub labelled_points: usize,
    /// Distinct labels in the volume, sorted.
    pub distinct_labels: Vec<Label>,
    /// Vote statistics.
    pub votes: VoteSummary,
}

/// Runs a probe from files and writes the results.
///
/// Outputs are written only after every mesh has been sampled and voted on.
///
/// # Errors
///
/// - [`ProbeError::NoMeshes`] or [`ProbeError::InvalidConfig`] if the
///   config does not validate
/// - [`ProbeError::ThreadPool`] if the worker pool cannot be created
/// - [`ProbeError::InputFormat`] if the volume cannot be read
/// - [`ProbeError::EmptyIndex`] if the volume has no labelled voxels; no
///   mesh is read in that case
/// - [`ProbeError::MeshFormat`] if a mesh cannot be read
/// - [`ProbeError::InconsistentVertexCount`] at the first mesh whose vertex
///   count differs from the first mesh
/// - [`ProbeError::Output`] if a result file cannot be written
pub fn run(config: &ProbeConfig) -> ProbeResult<ProbeOutcome> {
    config.validate()?;

    let outcome = match config.threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| ProbeError::ThreadPool(e.to_string()))?;
            debug!(threads, "Created worker pool");
            pool.install(|| probe_files(config))?
        }
        None => probe_files(config)?,
    };

    // Nothing lands unless every file stages
    let mut staged = StagedResults::new();
    staged
        .labels(&config.output, &outcome.labels())
        .map_err(|source| output_error(&config.output, source))?;
    if let Some(path) = &config.proportion_output {
        staged
            .proportions(path, &outcome.proportions())
            .map_err(|source| output_error(path, source))?;
    }
    staged
        .commit()
        .map_err(|source| output_error(&config.output, source))?;

    info!(
        output = %config.output.display(),
        vertices = outcome.votes.len(),
        "Wrote results"
    );
    Ok(outcome)
}

/// Runs a probe over an in-memory volume and meshes.
///
/// Nothing is read from or written to disk.
///
/// # Errors
///
/// - [`ProbeError::NoMeshes`] if `meshes` is empty
/// - [`ProbeError::LabelOutOfRange`] if a voxel value does not fit a label
/// - [`ProbeError::EmptyIndex`] if the volume has no labelled voxels
/// - [`ProbeError::InconsistentVertexCount`] if the meshes differ in vertex
///   count
///
/// # Example
///
/// ```
/// use probe_labels::probe;
/// use probe_types::{Point3, SurfaceMesh, VolumeSample};
///
/// let volume = vec![
///     VolumeSample::new(Point3::new(0.0, 0.0, 0.0), 5.0),
///     VolumeSample::new(Point3::new(10.0, 0.0, 0.0), 7.0),
/// ];
/// let a = SurfaceMesh::from_vertices(vec![Point3::new(0.0, 0.0, 0.0), Point3::new(9.0, 0.0, 0.0)]);
/// let b = SurfaceMesh::from_vertices(vec![Point3::new(1.0, 0.0, 0.0), Point3::new(11.0, 0.0, 0.0)]);
///
/// let outcome = probe(&volume, &[a, b]).unwrap();
/// assert_eq!(outcome.labels(), vec![5, 7]);
/// assert_eq!(outcome.proportions(), vec![1.0, 1.0]);
/// ```
pub fn probe<V: VolumeSource + ?Sized>(
    volume: &V,
    meshes: &[SurfaceMesh],
) -> ProbeResult<ProbeOutcome> {
    if meshes.is_empty() {
        return Err(ProbeError::NoMeshes);
    }
    probe_meshes(volume, meshes.iter().map(Ok))
}

fn probe_files(config: &ProbeConfig) -> ProbeResult<ProbeOutcome> {
    let volume = probe_io::load_volume(&config.label_volume).map_err(|source| {
        ProbeError::InputFormat {
            path: config.label_volume.clone(),
            source,
        }
    })?;
    info!(
        path = %config.label_volume.display(),
        dims = ?volume.dims(),
        "Loaded label volume"
    );

    let meshes = config.meshes.iter().map(|path| {
        let mesh = probe_io::load_mesh(path).map_err(|source| ProbeError::MeshFormat {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), vertices = mesh.vertex_count(), "Loaded mesh");
        Ok(mesh)
    });

    probe_meshes(&volume, meshes)
}

/// Shared core of [`run`] and [`probe`].
///
/// Meshes are pulled from the iterator one at a time, only after the index
/// exists, so an empty volume fails before any mesh is read.
fn probe_meshes<V, I, M>(volume: &V, meshes: I) -> ProbeResult<ProbeOutcome>
where
    V: VolumeSource + ?Sized,
    I: IntoIterator<Item = ProbeResult<M>>,
    M: Borrow<SurfaceMesh>,
{
    let cloud = LabeledPointCloud::build(volume)?;
    let index = SpatialIndex::build(cloud.positions())?;
    let sampler = MeshLabelSampler::new(&index, &cloud);

    let mut per_mesh: Vec<MeshVertexLabels> = Vec::new();
    for (mesh_index, mesh) in meshes.into_iter().enumerate() {
        let mesh = mesh?;
        let mesh = mesh.borrow();

        if let Some(first) = per_mesh.first() {
            if mesh.vertex_count() != first.len() {
                return Err(ProbeError::InconsistentVertexCount {
                    mesh: mesh_index,
                    expected: first.len(),
                    found: mesh.vertex_count(),
                });
            }
        } else if mesh.is_empty() {
            warn!("First mesh has no vertices");
        }

        per_mesh.push(sampler.sample_mesh(mesh));
    }

    let votes = VoteAggregator::aggregate(&per_mesh)?;
    let summary = ProbeSummary {
        labelled_points: cloud.len(),
        distinct_labels: cloud.distinct_labels(),
        votes: VoteSummary::from_votes(&votes),
    };
    info!(
        meshes = summary.votes.mesh_count,
        vertices = summary.votes.vertex_count,
        unanimous = summary.votes.unanimous,
        mean_agreement = summary.votes.mean_agreement,
        "Voted vertex labels"
    );

    Ok(ProbeOutcome { votes, summary })
}

fn output_error(path: &Path, source: IoError) -> ProbeError {
    let path = match &source {
        IoError::Write { path, .. } => path.clone(),
        _ => path.to_path_buf(),
    };
    ProbeError::Output { path, source }
}
