//! Runtime environment prebuilds.
//!
//! Environment archives are content-addressed by the environment hash the
//! extractor recorded. For each distinct hash the builder checks whether
//! `<environments_url>/<hash>/<os>_<arch>.zip` already resolves; if it does
//! not, the environment tool prebuilds the archive into the local staging
//! directory, from where the release job uploads it.

pub mod probe;

use crate::artefact::extracted::ExtractedVersion;
use crate::artefact::layout::VersionLayout;
use crate::executor::{CommandExecutor, run_checked};
use crate::report::{Stage, StageFailure};
use camino::Utf8PathBuf;
use log::{debug, info, warn};
use probe::RemoteProbe;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;

/// Operating system and architecture an environment is built for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Platform {
    /// Operating system, e.g. `linux`.
    pub os: String,
    /// CPU architecture, e.g. `x86_64`.
    pub arch: String,
}

impl Platform {
    /// The platform this process runs on.
    #[must_use]
    pub fn host() -> Self {
        Self {
            os: std::env::consts::OS.to_owned(),
            arch: std::env::consts::ARCH.to_owned(),
        }
    }

    /// Archive file name for this platform, e.g. `linux_x86_64.zip`.
    #[must_use]
    pub fn archive_name(&self) -> String {
        format!("{self}.zip")
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::host()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.os, self.arch)
    }
}

/// Settings for [`EnvironmentBuilder`].
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    /// The environment prebuild tool executable.
    pub env_tool: String,
    /// Base URL environment archives are published under.
    pub environments_url: String,
    /// Local directory archives are staged into for upload.
    pub staging_dir: Utf8PathBuf,
    /// Target platform.
    pub platform: Platform,
}

/// An environment archive built and staged for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedEnvironment {
    /// The environment hash.
    pub env_hash: String,
    /// Where the archive was written.
    pub archive: Utf8PathBuf,
}

/// Result of an environment run.
#[derive(Debug, Default)]
pub struct EnvironmentOutcome {
    /// Archives built this run.
    pub staged: Vec<StagedEnvironment>,
    /// Hashes already published remotely.
    pub present: Vec<String>,
    /// Environments that failed to build.
    pub failures: Vec<StageFailure>,
}

/// Prebuilds environments that are not yet published.
pub struct EnvironmentBuilder<'a> {
    config: EnvironmentConfig,
    executor: &'a dyn CommandExecutor,
    probe: &'a dyn RemoteProbe,
}

impl<'a> EnvironmentBuilder<'a> {
    /// Create a builder.
    #[must_use]
    pub fn new(
        config: EnvironmentConfig,
        executor: &'a dyn CommandExecutor,
        probe: &'a dyn RemoteProbe,
    ) -> Self {
        Self {
            config,
            executor,
            probe,
        }
    }

    /// The URL an environment archive is published at.
    #[must_use]
    pub fn expected_url(&self, env_hash: &str) -> String {
        format!(
            "{}/{env_hash}/{}",
            self.config.environments_url.trim_end_matches('/'),
            self.config.platform.archive_name()
        )
    }

    /// The local path an environment archive is staged at.
    #[must_use]
    pub fn staged_path(&self, env_hash: &str) -> Utf8PathBuf {
        self.config
            .staging_dir
            .join(env_hash)
            .join(self.config.platform.archive_name())
    }

    /// Build every missing environment, each distinct hash at most once.
    pub fn build_all(&self, versions: &[ExtractedVersion]) -> EnvironmentOutcome {
        let mut outcome = EnvironmentOutcome::default();
        let mut seen = BTreeSet::new();
        for version in versions {
            let Some(env_hash) = version.env_hash.as_deref() else {
                debug!("{} has no environment hash", version.label());
                continue;
            };
            if !seen.insert(env_hash.to_owned()) {
                continue;
            }

            if !env_hash.chars().all(|c| c.is_ascii_alphanumeric()) {
                warn!("{} has an unusable environment hash {env_hash:?}", version.label());
                outcome.failures.push(StageFailure::new(
                    Stage::Environment,
                    version.label(),
                    format!("unusable environment hash {env_hash:?}"),
                ));
                continue;
            }

            let url = self.expected_url(env_hash);
            match self.probe.exists(&url) {
                Ok(true) => {
                    debug!("environment {env_hash} already published");
                    outcome.present.push(env_hash.to_owned());
                    continue;
                }
                Ok(false) => debug!("environment {env_hash} not found at {url}"),
                Err(e) => warn!("{e}; rebuilding environment {env_hash}"),
            }

            match self.build(version, env_hash) {
                Ok(staged) => {
                    info!("staged environment {env_hash} at {}", staged.archive);
                    outcome.staged.push(staged);
                }
                Err(reason) => {
                    warn!("environment {env_hash} for {} failed: {reason}", version.label());
                    outcome.failures.push(StageFailure::new(
                        Stage::Environment,
                        version.label(),
                        reason,
                    ));
                }
            }
        }
        outcome
    }

    fn build(&self, version: &ExtractedVersion, env_hash: &str) -> Result<StagedEnvironment, String> {
        let archive = self.staged_path(env_hash);
        if let Some(parent) = archive.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("cannot create {parent}: {e}"))?;
        }

        let descriptor = VersionLayout::at(version.dir.clone()).descriptor();
        run_checked(
            self.executor,
            &self.config.env_tool,
            &[
                "ht",
                "prebuild",
                descriptor.as_str(),
                "--export",
                archive.as_str(),
            ],
            None,
        )?;

        if !archive.is_file() {
            return Err(format!(
                "{} reported success but wrote no {archive}",
                self.config.env_tool
            ));
        }
        Ok(StagedEnvironment {
            env_hash: env_hash.to_owned(),
            archive,
        })
    }
}

#[cfg(test)]
#[path = "environment_tests.rs"]
mod tests;
