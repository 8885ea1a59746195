//! Run configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, ProbeResult};

/// Configuration for a probing run.
///
/// # Example
///
/// ```
/// use probe_labels::ProbeConfig;
///
/// let config = ProbeConfig::new("labels.nii", "labels.txt")
///     .with_mesh("white.obj")
///     .with_mesh("gray.obj")
///     .with_proportion_output("agreement.txt");
///
/// assert_eq!(config.meshes.len(), 2);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Label volume to sample from.
    pub label_volume: PathBuf,

    /// Surfaces to sample, in vote order.
    pub meshes: Vec<PathBuf>,

    /// Destination for the voted labels.
    pub output: PathBuf,

    /// Optional destination for per-vertex agreement.
    #[serde(default)]
    pub proportion_output: Option<PathBuf>,

    /// Worker thread count (`None` = rayon default).
    #[serde(default)]
    pub threads: Option<usize>,
}

impl ProbeConfig {
    /// Creates a config with no meshes.
    #[must_use]
    pub fn new(label_volume: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            label_volume: label_volume.into(),
            meshes: Vec::new(),
            output: output.into(),
            proportion_output: None,
            threads: None,
        }
    }

    /// Appends a mesh to the vote order.
    #[must_use]
    pub fn with_mesh(mut self, mesh: impl Into<PathBuf>) -> Self {
        self.meshes.push(mesh.into());
        self
    }

    /// Replaces the mesh list.
    #[must_use]
    pub fn with_meshes<I, P>(mut self, meshes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.meshes = meshes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the agreement output.
    #[must_use]
    pub fn with_proportion_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.proportion_output = Some(path.into());
        self
    }

    /// Sets the worker thread count.
    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Checks the configuration before any file is touched.
    ///
    /// # Errors
    ///
    /// - [`ProbeError::NoMeshes`] if the mesh list is empty
    /// - [`ProbeError::InvalidConfig`] for a zero thread count or an output
    ///   path that collides with an input
    pub fn validate(&self) -> ProbeResult<()> {
        if self.meshes.is_empty() {
            return Err(ProbeError::NoMeshes);
        }
        if self.threads == Some(0) {
            return Err(ProbeError::InvalidConfig(
                "thread count must be positive".to_string(),
            ));
        }
        if self.proportion_output.as_deref() == Some(self.output.as_path()) {
            return Err(ProbeError::InvalidConfig(format!(
                "label and proportion outputs are both {}",
                self.output.display()
            )));
        }
        for output in self.outputs() {
            if self.inputs().any(|input| input == output) {
                return Err(ProbeError::InvalidConfig(format!(
                    "output {} would overwrite an input",
                    output.display()
                )));
            }
        }
        Ok(())
    }

    fn inputs(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.label_volume.as_path()).chain(self.meshes.iter().map(PathBuf::as_path))
    }

    fn outputs(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.output.as_path()).chain(self.proportion_output.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProbeConfig {
        ProbeConfig::new("labels.nii", "out.txt").with_mesh("a.obj")
    }

    #[test]
    fn builders() {
        let config = ProbeConfig::new("labels.nii", "out.txt")
            .with_meshes(["a.obj", "b.obj"])
            .with_proportion_output("p.txt")
            .with_threads(4);

        assert_eq!(
            config.meshes,
            vec![PathBuf::from("a.obj"), PathBuf::from("b.obj")]
        );
        assert_eq!(config.proportion_output, Some(PathBuf::from("p.txt")));
        assert_eq!(config.threads, Some(4));
    }

    #[test]
    fn valid_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn needs_a_mesh() {
        let config = ProbeConfig::new("labels.nii", "out.txt");
        assert!(matches!(config.validate(), Err(ProbeError::NoMeshes)));
    }

    #[test]
    fn zero_threads_rejected() {
        assert!(matches!(
            config().with_threads(0).validate(),
            Err(ProbeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn outputs_must_differ() {
        assert!(matches!(
            config().with_proportion_output("out.txt").validate(),
            Err(ProbeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn output_cannot_overwrite_input() {
        let config = ProbeConfig::new("labels.nii", "a.obj").with_mesh("a.obj");
        assert!(matches!(
            config.validate(),
            Err(ProbeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn serde_roundtrip() {
        let config = config().with_proportion_output("p.txt").with_threads(2);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ProbeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn optional_fields_default() {
        let parsed: ProbeConfig = serde_json::from_str(
            r#"{"label_volume": "labels.nii", "meshes": ["a.obj"], "output": "out.txt"}"#,
        )
        .unwrap();
        assert_eq!(parsed, config());
    }
}
