//! Gallery publisher CLI entrypoint.
//!
//! Parses arguments, resolves the run configuration, runs the requested
//! stage, and prints the end-of-run summary. Exit status is 0 for a clean
//! run, 2 when some packages failed, and 1 on a fatal error.

use camino::Utf8PathBuf;
use clap::Parser;
use gallery_publisher::cli::{Cli, Command};
use gallery_publisher::config::PublisherConfig;
use gallery_publisher::environment::probe::HttpProbe;
use gallery_publisher::error::{PublisherError, Result};
use gallery_publisher::executor::SystemCommandExecutor;
use gallery_publisher::output::{write_stderr_line, write_summary};
use gallery_publisher::pipeline::Publisher;
use gallery_publisher::report::RunSummary;
use std::io::Write;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.options.log_level());
    let mut stderr = std::io::stderr();
    let run_result = run(&cli);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins over the flags.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let initialised = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .try_init();
    if initialised.is_err() {
        // A subscriber is already installed; keep it.
    }
}

fn run(cli: &Cli) -> Result<RunSummary> {
    let cwd = Utf8PathBuf::try_from(std::env::current_dir()?)
        .map_err(|e| PublisherError::NonUtf8Path(e.into_path_buf().display().to_string()))?;
    let config = PublisherConfig::resolve(
        cli.options.config.as_deref(),
        &cli.options.overrides(),
        &cwd,
    )?;

    let executor = SystemCommandExecutor;
    let probe = HttpProbe;
    let publisher = Publisher::new(&config, &executor, &probe);

    match &cli.command {
        Command::Build => publisher.build().map(|(summary, _archives)| summary),
        Command::Extract(args) if args.archives.is_empty() => publisher.extract_build_dir(),
        Command::Extract(args) => {
            let archives: Vec<Utf8PathBuf> =
                args.archives.iter().map(|path| cwd.join(path)).collect();
            Ok(publisher.extract(&archives))
        }
        Command::Manifest => publisher.manifest(),
        Command::Environments => publisher.environments(),
        Command::Publish => publisher.publish(),
    }
}

fn exit_code_for_run_result(result: Result<RunSummary>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(summary) => {
            write_summary(stderr, &summary);
            if summary.has_failures() { 2 } else { 0 }
        }
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}
