//! `label-probe`: transfer volume labels onto surface vertices.
//!
//! ```text
//! label-probe labels.nii labels.txt -m white.obj gray.obj -p agreement.txt
//! ```
//!
//! Each mesh vertex takes the label of the nearest labelled voxel. With more
//! than one mesh, the label written per vertex is the majority across meshes
//! and the optional proportion file holds the fraction that agreed.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use probe_labels::ProbeConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Label surface vertices from a label volume
///
/// Meshes must share vertex correspondence and live in the volume's world
/// space.
#[derive(Debug, Parser)]
#[command(name = "label-probe")]
#[command(about = "Label surface vertices from a label volume", long_about = None)]
#[command(version)]
struct Cli {
    /// Label volume, uncompressed NIfTI-1 (.nii)
    ///
    /// Compressed .nii.gz and MINC .mnc volumes are not read; decompress or
    /// convert them to .nii first.
    #[arg(name = "LABEL_FILE")]
    label_file: PathBuf,

    /// Destination for the voted labels, one per line
    #[arg(name = "OUTPUT_FILE")]
    output_file: PathBuf,

    /// Surface meshes (.obj or .ply), in vote order
    #[arg(short = 'm', long = "mesh", name = "MESH", required = true, num_args = 1..)]
    meshes: Vec<PathBuf>,

    /// Destination for the per-vertex fraction of agreeing meshes
    #[arg(
        short = 'p',
        long = "proportion",
        alias = "proportion_file",
        name = "PROPORTION_FILE"
    )]
    proportion_file: Option<PathBuf>,

    /// Worker threads (defaults to one per core)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> ProbeConfig {
        let mut config = ProbeConfig::new(&self.label_file, &self.output_file)
            .with_meshes(&self.meshes);
        if let Some(path) = &self.proportion_file {
            config = config.with_proportion_output(path);
        }
        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        config
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    // RUST_LOG directives override the flag
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config();
    let outcome = probe_labels::run(&config).with_context(|| {
        format!(
            "probing {} with {} mesh(es) failed",
            config.label_volume.display(),
            config.meshes.len()
        )
    })?;

    info!(
        vertices = outcome.votes.len(),
        labels = outcome.summary.distinct_labels.len(),
        mean_agreement = outcome.summary.votes.mean_agreement,
        "Done"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn full_invocation() {
        let cli = Cli::try_parse_from([
            "label-probe",
            "labels.nii",
            "out.txt",
            "-m",
            "a.obj",
            "--mesh",
            "b.ply",
            "-p",
            "agree.txt",
            "-j",
            "3",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let config = cli.config();
        assert_eq!(config.label_volume, PathBuf::from("labels.nii"));
        assert_eq!(config.output, PathBuf::from("out.txt"));
        assert_eq!(
            config.meshes,
            vec![PathBuf::from("a.obj"), PathBuf::from("b.ply")]
        );
        assert_eq!(config.proportion_output, Some(PathBuf::from("agree.txt")));
        assert_eq!(config.threads, Some(3));
    }

    #[test]
    fn one_flag_takes_several_meshes() {
        let cli = Cli::try_parse_from([
            "label-probe",
            "labels.nii",
            "out.txt",
            "-m",
            "a.obj",
            "b.obj",
            "c.obj",
            "--proportion_file",
            "p.txt",
        ])
        .unwrap();

        let config = cli.config();
        assert_eq!(
            config.meshes,
            vec![
                PathBuf::from("a.obj"),
                PathBuf::from("b.obj"),
                PathBuf::from("c.obj")
            ]
        );
        assert_eq!(config.proportion_output, Some(PathBuf::from("p.txt")));
    }

    #[test]
    fn mesh_lists_accumulate() {
        let cli = Cli::try_parse_from([
            "label-probe", "labels.nii", "out.txt", "-m", "a.obj", "b.obj", "-m", "c.obj", "-p",
            "p.txt",
        ])
        .unwrap();
        assert_eq!(cli.meshes.len(), 3);
        assert_eq!(cli.proportion_file, Some(PathBuf::from("p.txt")));
    }

    #[test]
    fn mesh_is_required() {
        assert!(Cli::try_parse_from(["label-probe", "labels.nii", "out.txt"]).is_err());
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["label-probe", "labels.nii", "out.txt", "-m", "a.obj"])
            .unwrap();
        let config = cli.config();
        assert_eq!(config.proportion_output, None);
        assert_eq!(config.threads, None);
        assert_eq!(cli.verbose, 0);
    }
}
