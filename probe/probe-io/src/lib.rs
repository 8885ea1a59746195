//! Input readers and result writers for label probing.
//!
//! Label probing needs two external inputs, a label volume and one or more
//! surfaces, and produces plain-text per-vertex results. This crate provides:
//!
//! - **Volumes**: NIfTI-1 single-file images (`.nii`) decoded into a
//!   [`LabelGrid`], which implements [`probe_types::VolumeSource`]
//! - **Surfaces**: PLY (ASCII and binary) and OBJ (MNI polygon objects and
//!   Wavefront) decoded into a [`probe_types::SurfaceMesh`]
//! - **Results**: one-value-per-line writers for labels and agreement
//!
//! # Format Detection
//!
//! ```no_run
//! use probe_io::{load_mesh, load_volume};
//!
//! let volume = load_volume("labels.nii").unwrap();
//! let mesh = load_mesh("mid_surface.obj").unwrap();
//! ```
//!
//! Compressed volumes (`.nii.gz`) are reported as an unsupported format;
//! decompress them first.

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod error;
mod grid;
mod nifti;
mod obj;
mod output;
mod ply;

pub use error::{IoError, IoResult};
pub use grid::LabelGrid;
pub use nifti::{load_nifti, parse_nifti, save_nifti};
pub use obj::{load_obj, parse_obj};
pub use output::{StagedResults, format_proportion, write_labels, write_proportions};
pub use ply::load_ply;

use std::path::Path;

use probe_types::SurfaceMesh;

/// Supported surface file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshFormat {
    /// PLY (Polygon File Format), ASCII or binary.
    Ply,
    /// OBJ, either MNI polygon object or Wavefront.
    Obj,
}

impl MeshFormat {
    /// Detect format from file extension.
    #[must_use]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        match extension(path.as_ref())?.as_str() {
            "ply" => Some(Self::Ply),
            "obj" => Some(Self::Obj),
            _ => None,
        }
    }
}

/// Supported volume file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeFormat {
    /// Single-file NIfTI-1.
    Nifti,
}

impl VolumeFormat {
    /// Detect format from file extension.
    #[must_use]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        match extension(path.as_ref())?.as_str() {
            "nii" => Some(Self::Nifti),
            _ => None,
        }
    }
}

/// Load a surface, detecting format from extension.
///
/// # Errors
///
/// Returns an error if:
/// - The file format cannot be determined from the extension
/// - The file cannot be read
/// - The file content is invalid for the detected format
pub fn load_mesh<P: AsRef<Path>>(path: P) -> IoResult<SurfaceMesh> {
    let path = path.as_ref();
    match MeshFormat::from_path(path).ok_or_else(|| unknown_format(path))? {
        MeshFormat::Ply => load_ply(path),
        MeshFormat::Obj => load_obj(path),
    }
}

/// Load a label volume, detecting format from extension.
///
/// # Errors
///
/// Returns an error if:
/// - The file format cannot be determined from the extension
/// - The file cannot be read
/// - The file content is invalid for the detected format
pub fn load_volume<P: AsRef<Path>>(path: P) -> IoResult<LabelGrid> {
    let path = path.as_ref();
    match VolumeFormat::from_path(path).ok_or_else(|| unknown_format(path))? {
        VolumeFormat::Nifti => load_nifti(path),
    }
}

/// Lower-cased extension, with `.gz` kept together with the inner extension.
fn extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    if ext == "gz" {
        let stem = Path::new(path.file_stem()?);
        let inner = stem.extension()?.to_str()?.to_lowercase();
        return Some(format!("{inner}.gz"));
    }
    Some(ext)
}

fn unknown_format(path: &Path) -> IoError {
    IoError::UnknownFormat {
        extension: extension(path).unwrap_or_else(|| "(none)".to_string()),
    }
}
