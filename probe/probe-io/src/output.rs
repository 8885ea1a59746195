//! Plain-text result files.
//!
//! Results are written one value per line, joined by `\n` with no trailing
//! newline. Each file is first written to a hidden sibling and then renamed
//! into place, so an interrupted run never leaves a truncated result behind.
//! [`StagedResults`] extends that to several files that must land together.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use probe_types::Label;
use tracing::debug;

use crate::error::{IoError, IoResult};

/// Write one label per line.
///
/// # Errors
///
/// Returns an error if the file cannot be written or renamed into place.
///
/// # Example
///
/// ```no_run
/// use probe_io::write_labels;
///
/// write_labels("voted.txt", &[5, 7, 7]).unwrap();
/// ```
pub fn write_labels<P: AsRef<Path>>(path: P, labels: &[Label]) -> IoResult<()> {
    let mut staged = StagedResults::new();
    staged.labels(path, labels)?;
    staged.commit()
}

/// Write one agreement proportion per line, formatted by
/// [`format_proportion`].
///
/// # Errors
///
/// Returns an error if the file cannot be written or renamed into place.
pub fn write_proportions<P: AsRef<Path>>(path: P, proportions: &[f64]) -> IoResult<()> {
    let mut staged = StagedResults::new();
    staged.proportions(path, proportions)?;
    staged.commit()
}

/// Shortest round-trip decimal with at least one fractional digit.
///
/// # Example
///
/// ```
/// use probe_io::format_proportion;
///
/// assert_eq!(format_proportion(1.0), "1.0");
/// assert_eq!(format_proportion(0.5), "0.5");
/// assert_eq!(format_proportion(2.0 / 3.0), "0.6666666666666666");
/// ```
#[must_use]
pub fn format_proportion(value: f64) -> String {
    let mut out = String::new();
    // Debug formatting of f64 keeps the ".0" that Display drops
    let _ = write!(out, "{value:?}");
    out
}

/// A set of result files that land together.
///
/// Each file is written to its hidden sibling first. [`commit`] renames
/// them all into place; dropping the set without committing removes every
/// staged file, so a run that fails halfway leaves no result behind.
///
/// [`commit`]: StagedResults::commit
///
/// # Example
///
/// ```no_run
/// use probe_io::StagedResults;
///
/// let mut staged = StagedResults::new();
/// staged.labels("labels.txt", &[5, 7])?;
/// staged.proportions("agreement.txt", &[1.0, 0.5])?;
/// staged.commit()?;
/// # Ok::<(), probe_io::IoError>(())
/// ```
#[derive(Debug, Default)]
pub struct StagedResults {
    files: Vec<(PathBuf, PathBuf)>,
}

impl StagedResults {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages one label per line for `path`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Write`] if the staging file cannot be written.
    pub fn labels<P: AsRef<Path>>(&mut self, path: P, labels: &[Label]) -> IoResult<()> {
        self.stage(path.as_ref(), labels.iter().map(ToString::to_string))
    }

    /// Stages one proportion per line for `path`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Write`] if the staging file cannot be written.
    pub fn proportions<P: AsRef<Path>>(&mut self, path: P, proportions: &[f64]) -> IoResult<()> {
        self.stage(
            path.as_ref(),
            proportions.iter().map(|&p| format_proportion(p)),
        )
    }

    /// Renames every staged file into place, in staging order.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Write`] for the first rename that fails. Files
    /// not yet renamed at that point are removed.
    pub fn commit(mut self) -> IoResult<()> {
        let mut files = std::mem::take(&mut self.files).into_iter();
        while let Some((staging, path)) = files.next() {
            if let Err(source) = fs::rename(&staging, &path) {
                let _ = fs::remove_file(&staging);
                for (rest, _) in files {
                    let _ = fs::remove_file(rest);
                }
                return Err(IoError::Write { path, source });
            }
            debug!(path = %path.display(), "Committed result file");
        }
        Ok(())
    }

    fn stage<I>(&mut self, path: &Path, lines: I) -> IoResult<()>
    where
        I: Iterator<Item = String>,
    {
        let staging = staging_path(path);
        match write_staged(&staging, lines) {
            Ok(count) => {
                debug!(path = %path.display(), lines = count, "Staged result file");
                self.files.push((staging, path.to_path_buf()));
                Ok(())
            }
            Err(source) => {
                let _ = fs::remove_file(&staging);
                Err(IoError::Write {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }
}

impl Drop for StagedResults {
    fn drop(&mut self) {
        for (staging, _) in &self.files {
            let _ = fs::remove_file(staging);
        }
    }
}

fn write_staged<I>(staging: &Path, lines: I) -> std::io::Result<usize>
where
    I: Iterator<Item = String>,
{
    let mut writer = BufWriter::new(File::create(staging)?);
    let mut count = 0;
    for line in lines {
        if count > 0 {
            writer.write_all(b"\n")?;
        }
        writer.write_all(line.as_bytes())?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

/// Hidden sibling of `path` used while writing.
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "output".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.partial"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_have_no_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");

        write_labels(&path, &[5, 7, 12]).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "5\n7\n12");
    }

    #[test]
    fn proportions_keep_fraction_digit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("props.txt");

        write_proportions(&path, &[1.0, 0.5, 1.0 / 3.0]).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "1.0\n0.5\n0.3333333333333333"
        );
    }

    #[test]
    fn empty_sequence_writes_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");

        write_labels(&path, &[]).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn staging_file_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");

        write_labels(&path, &[1]).unwrap();

        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn unwritable_destination_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing_dir").join("labels.txt");

        assert!(write_labels(&path, &[1, 2]).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn staged_files_land_together() {
        let dir = tempfile::tempdir().unwrap();
        let labels = dir.path().join("labels.txt");
        let props = dir.path().join("props.txt");

        let mut staged = StagedResults::new();
        staged.labels(&labels, &[4, 4]).unwrap();
        staged.proportions(&props, &[1.0, 0.5]).unwrap();
        assert!(!labels.exists());
        assert!(!props.exists());

        staged.commit().unwrap();
        assert_eq!(fs::read_to_string(&labels).unwrap(), "4\n4");
        assert_eq!(fs::read_to_string(&props).unwrap(), "1.0\n0.5");
        assert!(!staging_path(&labels).exists());
    }

    #[test]
    fn failed_stage_discards_earlier_files() {
        let dir = tempfile::tempdir().unwrap();
        let labels = dir.path().join("labels.txt");
        let props = dir.path().join("missing_dir").join("props.txt");

        let mut staged = StagedResults::new();
        staged.labels(&labels, &[1]).unwrap();
        let err = staged.proportions(&props, &[1.0]).unwrap_err();
        drop(staged);

        assert!(matches!(err, IoError::Write { ref path, .. } if *path == props));
        assert!(!labels.exists());
        assert!(!staging_path(&labels).exists());
    }

    #[test]
    fn staging_path_is_hidden_sibling() {
        let staged = staging_path(Path::new("/tmp/out/labels.txt"));
        assert_eq!(staged, PathBuf::from("/tmp/out/.labels.txt.partial"));
    }
}
