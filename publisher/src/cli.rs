//! CLI argument definitions for the gallery publisher.
//!
//! The binary stays a thin shell: it parses these arguments, resolves a
//! [`PublisherConfig`](crate::config::PublisherConfig) and hands it to the
//! [`Publisher`](crate::pipeline::Publisher).

use crate::config::ConfigOverrides;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Build, extract, and publish the action package gallery.
#[derive(Parser, Debug)]
#[command(name = "gallery-publisher")]
#[command(version, about)]
#[command(long_about = concat!(
    "Build, extract, and publish the action package gallery.\n\n",
    "Each package directory under the input root is built into an archive ",
    "with the package tool, unpacked into a versioned gallery tree, and ",
    "indexed in manifest.json. Missing runtime environments are prebuilt and ",
    "staged for upload.\n\n",
    "Per-package failures are reported at the end of the run and do not stop ",
    "the remaining packages.",
))]
#[command(after_help = concat!(
    "OUTPUT LAYOUT:\n",
    "  <output>/build/                          archives from the package tool\n",
    "  <output>/gallery/<slug>/<version>/       extracted package files\n",
    "  <output>/gallery/manifest.json           the published index\n",
    "  <output>/environments/<hash>/<os>_<arch>.zip\n\n",
    "EXIT STATUS:\n",
    "  0  every package succeeded\n",
    "  1  fatal configuration or input error\n",
    "  2  one or more packages failed\n\n",
    "EXAMPLES:\n",
    "  Run the whole pipeline:\n",
    "    $ gallery-publisher publish --input-dir actions --output-dir dist\n\n",
    "  Rebuild only what the live manifest does not list:\n",
    "    $ gallery-publisher publish --baseline live-manifest.json\n\n",
    "  Regenerate manifests with distribution variants:\n",
    "    $ gallery-publisher manifest --whitelist whitelist.json",
))]
pub struct Cli {
    /// Stage to run.
    #[command(subcommand)]
    pub command: Command,

    /// Options shared by every stage.
    #[command(flatten)]
    pub options: GlobalArgs,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Build every package not yet published.
    Build,

    /// Extract archives into the gallery tree.
    Extract(ExtractArgs),

    /// Write the manifest files from the gallery tree.
    Manifest,

    /// Prebuild and stage environments missing from the remote store.
    Environments,

    /// Run build, extract, manifest, and environments in order.
    Publish,
}

/// Arguments for the extract command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractArgs {
    /// Archives to extract [default: every archive in the build directory].
    #[arg(value_name = "ARCHIVE")]
    pub archives: Vec<Utf8PathBuf>,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalArgs {
    /// TOML configuration file.
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Directory holding one subdirectory per package [default: actions].
    #[arg(short, long, value_name = "DIR", global = true)]
    pub input_dir: Option<Utf8PathBuf>,

    /// Directory receiving build, gallery, and environment output [default: dist].
    #[arg(short, long, value_name = "DIR", global = true)]
    pub output_dir: Option<Utf8PathBuf>,

    /// Base URL package files are published under.
    #[arg(long, value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Base URL environment archives are published under.
    #[arg(long, value_name = "URL", global = true)]
    pub environments_url: Option<String>,

    /// Package build tool executable [default: action-server].
    #[arg(long, value_name = "PATH", global = true)]
    pub package_tool: Option<String>,

    /// Environment tool executable [default: rcc].
    #[arg(long, value_name = "PATH", global = true)]
    pub env_tool: Option<String>,

    /// Skip fingerprinting environments during extraction.
    #[arg(long, global = true)]
    pub no_env_hash: bool,

    /// Previously published manifest; versions it lists are not rebuilt.
    #[arg(long, value_name = "FILE", global = true)]
    pub baseline: Option<Utf8PathBuf>,

    /// Whitelist JSON selecting the distribution variants.
    #[arg(long, value_name = "FILE", global = true)]
    pub whitelist: Option<Utf8PathBuf>,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet",
        global = true
    )]
    pub verbosity: u8,

    /// Only log warnings and errors.
    #[arg(short, long, conflicts_with = "verbosity", global = true)]
    pub quiet: bool,
}

impl GlobalArgs {
    /// The configuration values given on the command line.
    ///
    /// # Examples
    ///
    /// ```
    /// use gallery_publisher::cli::GlobalArgs;
    ///
    /// let args = GlobalArgs {
    ///     no_env_hash: true,
    ///     ..GlobalArgs::default()
    /// };
    /// assert!(args.overrides().no_env_hash);
    /// assert!(args.overrides().input_dir.is_none());
    /// ```
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            input_dir: self.input_dir.clone(),
            output_dir: self.output_dir.clone(),
            base_url: self.base_url.clone(),
            environments_url: self.environments_url.clone(),
            package_tool: self.package_tool.clone(),
            env_tool: self.env_tool.clone(),
            no_env_hash: self.no_env_hash,
            baseline_manifest: self.baseline.clone(),
            whitelist: self.whitelist.clone(),
        }
    }

    /// The default log filter for the requested verbosity.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
