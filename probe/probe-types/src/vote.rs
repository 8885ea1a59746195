//! Per-vertex vote results.

use crate::Label;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The outcome of voting across meshes at one vertex.
///
/// `agreement` is always `votes / mesh_count`, so it lies in `(0, 1]`.
///
/// # Example
///
/// ```
/// use probe_types::VertexVote;
///
/// let vote = VertexVote::new(5, 2, 3);
/// assert_eq!(vote.voted_label, 5);
/// assert!((vote.agreement - 2.0 / 3.0).abs() < 1e-12);
/// assert!(!vote.is_unanimous());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VertexVote {
    /// The majority label.
    pub voted_label: Label,
    /// Fraction of meshes that assigned `voted_label`.
    pub agreement: f64,
    /// Number of meshes that assigned `voted_label`.
    pub votes: usize,
    /// Number of meshes that voted.
    pub mesh_count: usize,
}

impl VertexVote {
    /// Creates a vote from its counts.
    ///
    /// `votes` must be in `1..=mesh_count`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(voted_label: Label, votes: usize, mesh_count: usize) -> Self {
        debug_assert!(votes >= 1 && votes <= mesh_count);
        Self {
            voted_label,
            agreement: votes as f64 / mesh_count as f64,
            votes,
            mesh_count,
        }
    }

    /// Whether every mesh agreed.
    #[inline]
    #[must_use]
    pub const fn is_unanimous(&self) -> bool {
        self.votes == self.mesh_count
    }
}
