//! Dependency alignment binary.
//!
//! Rewrites the `dependencies:` block of package descriptors in place so
//! that every package pins the same canonical versions. Run it before
//! `gallery-publisher build`; in CI, `--check` fails the job when a
//! descriptor was committed out of alignment.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use gallery_publisher::align::DependencyAligner;
use gallery_publisher::descriptor::DESCRIPTOR_FILE;
use gallery_publisher::error::PublisherError;
use gallery_publisher::output::write_stderr_line;
use std::io::Write;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Align descriptor dependencies with the canonical pins.
#[derive(Parser, Debug)]
#[command(name = "gallery-align-deps")]
#[command(version, about = "Align package.yaml dependencies with the canonical pins")]
struct AlignCli {
    /// Report descriptors that would change without rewriting them.
    #[arg(long)]
    check: bool,

    /// Descriptor files, or package directories holding a package.yaml.
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<Utf8PathBuf>,
}

fn main() {
    let cli = AlignCli::parse();
    init_logging();
    let mut stderr = std::io::stderr();
    let exit_code = run(&cli, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .is_err()
    {
        // A subscriber is already installed; keep it.
    }
}

/// Align every path and return the process exit code.
///
/// 0: nothing to do (or everything rewritten). 1: a descriptor is out of
/// alignment under `--check`. 2: a descriptor could not be processed.
fn run(cli: &AlignCli, stderr: &mut dyn Write) -> i32 {
    let aligner = DependencyAligner::default();
    let mut misaligned = 0_usize;
    let mut errors = 0_usize;

    for path in &cli.paths {
        let descriptor = descriptor_path(path);
        match aligner.align_file(&descriptor, cli.check) {
            Ok(false) => log::debug!("{descriptor} already aligned"),
            Ok(true) if cli.check => {
                write_stderr_line(stderr, format!("{descriptor} is not aligned"));
                misaligned += 1;
            }
            Ok(true) => write_stderr_line(stderr, format!("aligned {descriptor}")),
            Err(err) => {
                write_stderr_line(stderr, format!("error: {}", describe(&descriptor, &err)));
                errors += 1;
            }
        }
    }

    if errors > 0 {
        2
    } else if misaligned > 0 {
        1
    } else {
        0
    }
}

fn descriptor_path(path: &Utf8Path) -> Utf8PathBuf {
    if path.is_dir() {
        path.join(DESCRIPTOR_FILE)
    } else {
        path.to_owned()
    }
}

fn describe(descriptor: &Utf8Path, err: &PublisherError) -> String {
    match err {
        PublisherError::Align { .. } => err.to_string(),
        other => format!("{descriptor}: {other}"),
    }
}
