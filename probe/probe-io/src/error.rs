//! Error types for volume and mesh I/O.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for probe I/O operations.
pub type IoResult<T> = Result<T, IoError>;

/// Errors that can occur while reading inputs or writing results.
#[derive(Debug, Error)]
pub enum IoError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was not found.
        path: PathBuf,
    },

    /// Unknown or unsupported file format.
    #[error("unsupported file format: .{extension}")]
    UnknownFormat {
        /// The unrecognized extension.
        extension: String,
    },

    /// Invalid file content (parse error).
    #[error("invalid file content: {message}")]
    InvalidContent {
        /// Description of what was invalid.
        message: String,
    },

    /// Unexpected end of file.
    #[error("unexpected end of file at position {position}")]
    UnexpectedEof {
        /// Position in the file where EOF was encountered.
        position: u64,
    },

    /// Volume voxel type this reader cannot decode.
    #[error("unsupported voxel datatype code {code}")]
    UnsupportedDatatype {
        /// The NIfTI datatype code.
        code: i16,
    },

    /// A result file could not be written or moved into place.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Float parsing error.
    #[error("float parsing error: {0}")]
    ParseFloat(#[from] std::num::ParseFloatError),

    /// Integer parsing error.
    #[error("integer parsing error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),
}

impl IoError {
    /// Create an `InvalidContent` error with the given message.
    #[must_use]
    pub fn invalid_content(message: impl Into<String>) -> Self {
        Self::InvalidContent {
            message: message.into(),
        }
    }

    /// Map an open failure to `FileNotFound` when the file is missing.
    pub(crate) fn from_open(path: &std::path::Path, error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_maps_to_not_found() {
        let err = IoError::from_open(
            std::path::Path::new("missing.nii"),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(matches!(err, IoError::FileNotFound { .. }));
        assert!(err.to_string().contains("missing.nii"));
    }

    #[test]
    fn other_open_errors_stay_io() {
        let err = IoError::from_open(
            std::path::Path::new("locked.nii"),
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, IoError::Io(_)));
    }

    #[test]
    fn datatype_message() {
        let err = IoError::UnsupportedDatatype { code: 128 };
        assert_eq!(err.to_string(), "unsupported voxel datatype code 128");
    }
}
