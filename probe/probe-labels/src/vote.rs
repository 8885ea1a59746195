//! Cross-mesh majority voting.
//!
//! Several surfaces of the same subject share vertex correspondence: vertex
//! `i` of one mesh is the same anatomical location as vertex `i` of every
//! other. Voting over the labels each mesh sampled at `i` yields one
//! consensus label plus the fraction of meshes that agreed with it.
//!
//! Ties go to the label that appears first in mesh order. With meshes
//! `[1, 2]` and `[2, 1]`, vertex 0 votes `1` and vertex 1 votes `2`.

use probe_types::{Label, VertexVote};
use rayon::prelude::*;
use tracing::debug;

use crate::error::{ProbeError, ProbeResult};
use crate::sample::MeshVertexLabels;

/// Combines per-mesh vertex labels into per-vertex votes.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoteAggregator;

impl VoteAggregator {
    /// Votes at every vertex.
    ///
    /// `per_mesh[m][v]` is the label mesh `m` assigned to vertex `v`. The
    /// result has one entry per vertex, in vertex order.
    ///
    /// # Errors
    ///
    /// - [`ProbeError::NoMeshes`] if `per_mesh` is empty
    /// - [`ProbeError::InconsistentVertexCount`] if the meshes differ in
    ///   length
    ///
    /// # Example
    ///
    /// ```
    /// use probe_labels::VoteAggregator;
    ///
    /// let votes = VoteAggregator::aggregate(&[vec![5, 7], vec![5, 5]]).unwrap();
    ///
    /// assert_eq!(votes[0].voted_label, 5);
    /// assert_eq!(votes[0].agreement, 1.0);
    /// assert_eq!(votes[1].voted_label, 5);
    /// assert_eq!(votes[1].agreement, 0.5);
    /// ```
    pub fn aggregate(per_mesh: &[MeshVertexLabels]) -> ProbeResult<Vec<VertexVote>> {
        let Some(first) = per_mesh.first() else {
            return Err(ProbeError::NoMeshes);
        };
        let vertex_count = first.len();
        check_vertex_counts(per_mesh.iter().map(Vec::len), vertex_count)?;

        let votes: Vec<VertexVote> = (0..vertex_count)
            .into_par_iter()
            .map_init(
                || Vec::with_capacity(per_mesh.len()),
                |column, vertex| {
                    column.clear();
                    column.extend(per_mesh.iter().map(|labels| labels[vertex]));
                    tally(column)
                },
            )
            .collect();

        debug!(
            meshes = per_mesh.len(),
            vertices = vertex_count,
            "Aggregated vertex votes"
        );
        Ok(votes)
    }
}

/// Majority vote over the labels observed at one vertex, in mesh order.
///
/// Returns `None` for an empty slice.
///
/// ```
/// use probe_labels::vote;
///
/// let v = vote(&[3, 4, 4, 3]).unwrap();
/// assert_eq!(v.voted_label, 3);
/// assert_eq!(v.votes, 2);
/// ```
#[must_use]
pub fn vote(labels: &[Label]) -> Option<VertexVote> {
    if labels.is_empty() {
        None
    } else {
        Some(tally(labels))
    }
}

/// Counts labels in first-seen order and keeps the first with the highest
/// count. `labels` must be non-empty.
fn tally(labels: &[Label]) -> VertexVote {
    // Few meshes per run, so a linear table beats hashing
    let mut counts: Vec<(Label, usize)> = Vec::with_capacity(labels.len());
    for &label in labels {
        match counts.iter_mut().find(|(l, _)| *l == label) {
            Some((_, count)) => *count += 1,
            None => counts.push((label, 1)),
        }
    }

    let mut best = counts[0];
    for &entry in &counts[1..] {
        if entry.1 > best.1 {
            best = entry;
        }
    }
    VertexVote::new(best.0, best.1, labels.len())
}

/// Fails on the first length that differs from `expected`.
fn check_vertex_counts<I>(counts: I, expected: usize) -> ProbeResult<()>
where
    I: IntoIterator<Item = usize>,
{
    for (mesh, found) in counts.into_iter().enumerate() {
        if found != expected {
            return Err(ProbeError::InconsistentVertexCount {
                mesh,
                expected,
                found,
            });
        }
    }
    Ok(())
}

/// Aggregate statistics over a set of votes.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VoteSummary {
    /// Number of vertices voted on.
    pub vertex_count: usize,
    /// Number of meshes that voted.
    pub mesh_count: usize,
    /// Mean agreement over all vertices, `0.0` when there are none.
    pub mean_agreement: f64,
    /// Vertices where every mesh agreed.
    pub unanimous: usize,
}

impl VoteSummary {
    /// Summarises `votes`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_votes(votes: &[VertexVote]) -> Self {
        let vertex_count = votes.len();
        let mean_agreement = if vertex_count == 0 {
            0.0
        } else {
            votes.iter().map(|v| v.agreement).sum::<f64>() / vertex_count as f64
        };
        Self {
            vertex_count,
            mesh_count: votes.first().map_or(0, |v| v.mesh_count),
            mean_agreement,
            unanimous: votes.iter().filter(|v| v.is_unanimous()).count(),
        }
    }
}
