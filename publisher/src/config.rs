//! Run configuration.
//!
//! A [`PublisherConfig`] is resolved once per run from built-in defaults, an
//! optional TOML file, and command-line overrides (in increasing order of
//! precedence), then handed to every stage. Nothing reads the environment
//! or the working directory after resolution.
//!
//! ```toml
//! input_dir = "actions"
//! output_dir = "dist"
//! base_url = "https://cdn.example.com/gallery/actions"
//! whitelist = "whitelist.json"
//!
//! [tools]
//! package_tool = "action-server"
//! env_tool = "rcc"
//!
//! [platform]
//! os = "linux"
//! arch = "x86_64"
//! ```

use crate::environment::Platform;
use crate::error::{PublisherError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

/// Default base URL package files are published under.
pub const DEFAULT_BASE_URL: &str = "https://cdn.example.com/gallery/actions";
/// Default base URL environment archives are published under.
pub const DEFAULT_ENVIRONMENTS_URL: &str = "https://cdn.example.com/gallery/environments";

/// External tool executables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ToolsConfig {
    /// Builds package archives.
    pub package_tool: String,
    /// Hashes and prebuilds environments.
    pub env_tool: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            package_tool: "action-server".to_owned(),
            env_tool: "rcc".to_owned(),
        }
    }
}

/// Settings shared by every pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PublisherConfig {
    /// Directory holding one subdirectory per package.
    pub input_dir: Utf8PathBuf,
    /// Directory receiving `build/`, `gallery/` and `environments/`.
    pub output_dir: Utf8PathBuf,
    /// Base URL package files are published under.
    pub base_url: String,
    /// Base URL environment archives are published under.
    pub environments_url: String,
    /// External tools.
    pub tools: ToolsConfig,
    /// Platform environments are built for.
    pub platform: Platform,
    /// Whether to fingerprint environments during extraction.
    pub compute_env_hash: bool,
    /// Previously published manifest; versions it lists are not rebuilt.
    pub baseline_manifest: Option<Utf8PathBuf>,
    /// Whitelist file selecting restricted manifest variants.
    pub whitelist: Option<Utf8PathBuf>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            input_dir: Utf8PathBuf::from("actions"),
            output_dir: Utf8PathBuf::from("dist"),
            base_url: DEFAULT_BASE_URL.to_owned(),
            environments_url: DEFAULT_ENVIRONMENTS_URL.to_owned(),
            tools: ToolsConfig::default(),
            platform: Platform::host(),
            compute_env_hash: true,
            baseline_manifest: None,
            whitelist: None,
        }
    }
}

/// Values given on the command line. `None` keeps the lower layer's value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Overrides [`PublisherConfig::input_dir`].
    pub input_dir: Option<Utf8PathBuf>,
    /// Overrides [`PublisherConfig::output_dir`].
    pub output_dir: Option<Utf8PathBuf>,
    /// Overrides [`PublisherConfig::base_url`].
    pub base_url: Option<String>,
    /// Overrides [`PublisherConfig::environments_url`].
    pub environments_url: Option<String>,
    /// Overrides [`ToolsConfig::package_tool`].
    pub package_tool: Option<String>,
    /// Overrides [`ToolsConfig::env_tool`].
    pub env_tool: Option<String>,
    /// Disables environment fingerprinting when true.
    pub no_env_hash: bool,
    /// Overrides [`PublisherConfig::baseline_manifest`].
    pub baseline_manifest: Option<Utf8PathBuf>,
    /// Overrides [`PublisherConfig::whitelist`].
    pub whitelist: Option<Utf8PathBuf>,
}

impl PublisherConfig {
    /// Parse a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::InvalidConfig`] if the file cannot be read,
    /// is not valid TOML, or names an unknown key.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let invalid = |reason: String| PublisherError::InvalidConfig {
            path: path.to_owned(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        toml::from_str(&text).map_err(|e| invalid(e.to_string()))
    }

    /// Resolve the configuration for a run.
    ///
    /// Relative paths are anchored at `cwd` so that stages which run tools
    /// in other working directories still see the same files.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::InvalidConfig`] if `config_file` is given
    /// and cannot be loaded.
    pub fn resolve(
        config_file: Option<&Utf8Path>,
        overrides: &ConfigOverrides,
        cwd: &Utf8Path,
    ) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply(overrides);
        config.anchor(cwd);
        Ok(config)
    }

    /// Layer command-line values over this configuration.
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(dir) = &overrides.input_dir {
            self.input_dir.clone_from(dir);
        }
        if let Some(dir) = &overrides.output_dir {
            self.output_dir.clone_from(dir);
        }
        if let Some(url) = &overrides.base_url {
            self.base_url.clone_from(url);
        }
        if let Some(url) = &overrides.environments_url {
            self.environments_url.clone_from(url);
        }
        if let Some(tool) = &overrides.package_tool {
            self.tools.package_tool.clone_from(tool);
        }
        if let Some(tool) = &overrides.env_tool {
            self.tools.env_tool.clone_from(tool);
        }
        if overrides.no_env_hash {
            self.compute_env_hash = false;
        }
        if overrides.baseline_manifest.is_some() {
            self.baseline_manifest.clone_from(&overrides.baseline_manifest);
        }
        if overrides.whitelist.is_some() {
            self.whitelist.clone_from(&overrides.whitelist);
        }
    }

    fn anchor(&mut self, cwd: &Utf8Path) {
        let absolute = |path: &mut Utf8PathBuf| {
            if path.is_relative() {
                *path = cwd.join(&*path);
            }
        };
        absolute(&mut self.input_dir);
        absolute(&mut self.output_dir);
        if let Some(path) = self.baseline_manifest.as_mut() {
            absolute(path);
        }
        if let Some(path) = self.whitelist.as_mut() {
            absolute(path);
        }
    }

    /// Directory the package tool writes archives into.
    #[must_use]
    pub fn build_dir(&self) -> Utf8PathBuf {
        self.output_dir.join("build")
    }

    /// Root of the versioned gallery tree.
    #[must_use]
    pub fn gallery_dir(&self) -> Utf8PathBuf {
        self.output_dir.join("gallery")
    }

    /// Directory environment archives are staged in.
    #[must_use]
    pub fn environments_dir(&self) -> Utf8PathBuf {
        self.output_dir.join("environments")
    }
}
