//! Stage orchestration.
//!
//! [`Publisher`] wires the stages to one [`PublisherConfig`] and folds their
//! outcomes into a [`RunSummary`]. Every stage finishes for all packages
//! before the next starts; a package that fails in one stage simply does
//! not reach the next.
//!
//! Fatal inputs (whitelist, baseline, package root) are loaded before any
//! tool runs, so a bad configuration never leaves a half-built output tree.

use crate::artefact::extracted::{ExtractedVersion, scan_gallery};
use crate::artefact::extraction::{ArchiveExtractor, ExtractConfig};
use crate::builder::{BuildConfig, PackageBuilder};
use crate::config::PublisherConfig;
use crate::discovery::{collect_packages, discover_packages};
use crate::environment::probe::RemoteProbe;
use crate::environment::{EnvironmentBuilder, EnvironmentConfig};
use crate::error::Result;
use crate::executor::CommandExecutor;
use crate::manifest::generator::ManifestGenerator;
use crate::manifest::whitelist::Whitelist;
use crate::manifest::{ManifestError, PublishedVersions};
use crate::report::{RunSummary, StageFailure};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};

/// Runs pipeline stages against one configuration.
pub struct Publisher<'a> {
    config: &'a PublisherConfig,
    executor: &'a dyn CommandExecutor,
    probe: &'a dyn RemoteProbe,
}

impl<'a> Publisher<'a> {
    /// Create a publisher.
    #[must_use]
    pub fn new(
        config: &'a PublisherConfig,
        executor: &'a dyn CommandExecutor,
        probe: &'a dyn RemoteProbe,
    ) -> Self {
        Self {
            config,
            executor,
            probe,
        }
    }

    /// Run every stage: build, extract, manifest, environments.
    ///
    /// # Errors
    ///
    /// Returns an error for fatal problems: a missing package root, an
    /// unreadable whitelist or baseline, or a manifest that cannot be
    /// written. Per-package failures are reported in the summary instead.
    pub fn publish(&self) -> Result<RunSummary> {
        let whitelist = self.load_whitelist()?;
        let (mut summary, archives) = self.build()?;
        summary.merge(self.extract(&archives));

        let (versions, failures) = self.scan()?;
        summary.failures.extend(failures);
        summary.merge(self.write_manifests(&versions, whitelist.as_ref())?);
        summary.merge(self.stage_environments(&versions));
        Ok(summary)
    }

    /// Build every discovered package not listed in the baseline.
    ///
    /// Returns the summary and the archives produced, in build order.
    ///
    /// # Errors
    ///
    /// Returns an error if the package root is missing or the baseline
    /// manifest cannot be read.
    pub fn build(&self) -> Result<(RunSummary, Vec<Utf8PathBuf>)> {
        let published = match &self.config.baseline_manifest {
            Some(path) => {
                let published = PublishedVersions::load(path)?;
                info!("baseline {path} lists {} version(s)", published.len());
                published
            }
            None => PublishedVersions::default(),
        };
        let (packages, failures) = collect_packages(discover_packages(&self.config.input_dir)?);
        info!(
            "discovered {} package(s) in {}",
            packages.len(),
            self.config.input_dir
        );

        let builder = PackageBuilder::new(
            BuildConfig {
                package_tool: self.config.tools.package_tool.clone(),
                output_dir: self.config.build_dir(),
            },
            self.executor,
            &published,
        );
        let outcome = builder.build_all(&packages);

        let summary = RunSummary {
            built: outcome.artifacts.iter().map(|a| a.label.clone()).collect(),
            skipped: outcome.skipped,
            failures: failures.into_iter().chain(outcome.failures).collect(),
            ..RunSummary::default()
        };
        let archives = outcome.artifacts.into_iter().map(|a| a.archive).collect();
        Ok((summary, archives))
    }

    /// Extract `archives` into the gallery tree.
    pub fn extract(&self, archives: &[Utf8PathBuf]) -> RunSummary {
        let extractor = ArchiveExtractor::new(
            ExtractConfig {
                gallery_root: self.config.gallery_dir(),
                env_tool: self
                    .config
                    .compute_env_hash
                    .then(|| self.config.tools.env_tool.clone()),
            },
            self.executor,
        );
        let outcome = extractor.extract_all(archives);
        RunSummary {
            extracted: outcome.extracted.iter().map(ExtractedVersion::label).collect(),
            failures: outcome.failures,
            ..RunSummary::default()
        }
    }

    /// Extract every archive in the build directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the build directory exists but cannot be listed.
    pub fn extract_build_dir(&self) -> Result<RunSummary> {
        let archives = archives_in(&self.config.build_dir())?;
        Ok(self.extract(&archives))
    }

    /// Write the manifest variants from the current gallery tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the whitelist is unreadable or a manifest cannot
    /// be written.
    pub fn manifest(&self) -> Result<RunSummary> {
        let whitelist = self.load_whitelist()?;
        let (versions, failures) = self.scan()?;
        let mut summary = self.write_manifests(&versions, whitelist.as_ref())?;
        summary.failures.extend(failures);
        Ok(summary)
    }

    /// Prebuild missing environments for the current gallery tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the gallery tree cannot be listed.
    pub fn environments(&self) -> Result<RunSummary> {
        let (versions, failures) = self.scan()?;
        if !failures.is_empty() {
            debug!("{} unreadable version(s) ignored", failures.len());
        }
        Ok(self.stage_environments(&versions))
    }

    fn load_whitelist(&self) -> Result<Option<Whitelist>> {
        self.config
            .whitelist
            .as_deref()
            .map(Whitelist::load)
            .transpose()
    }

    fn scan(&self) -> Result<(Vec<ExtractedVersion>, Vec<StageFailure>)> {
        let gallery = self.config.gallery_dir();
        let scanned = scan_gallery(&gallery).map_err(|source| ManifestError::Scan {
            path: gallery.clone(),
            source,
        })?;
        Ok(scanned)
    }

    fn write_manifests(
        &self,
        versions: &[ExtractedVersion],
        whitelist: Option<&Whitelist>,
    ) -> Result<RunSummary> {
        let generator = ManifestGenerator::new(&self.config.base_url);
        let manifests = generator.write_all(versions, &self.config.gallery_dir(), whitelist)?;
        Ok(RunSummary {
            manifests,
            ..RunSummary::default()
        })
    }

    fn stage_environments(&self, versions: &[ExtractedVersion]) -> RunSummary {
        let builder = EnvironmentBuilder::new(
            EnvironmentConfig {
                env_tool: self.config.tools.env_tool.clone(),
                environments_url: self.config.environments_url.clone(),
                staging_dir: self.config.environments_dir(),
                platform: self.config.platform.clone(),
            },
            self.executor,
            self.probe,
        );
        let outcome = builder.build_all(versions);
        RunSummary {
            environments_staged: outcome.staged.into_iter().map(|s| s.archive).collect(),
            environments_present: outcome.present,
            failures: outcome.failures,
            ..RunSummary::default()
        }
    }
}

/// The `.zip` files directly inside `dir`, sorted by path.
///
/// A missing directory holds no archives.
fn archives_in(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut archives = Vec::new();
    for entry in dir.read_dir_utf8()? {
        let entry = entry?;
        if entry.file_type()?.is_file() && entry.path().extension() == Some("zip") {
            archives.push(entry.into_path());
        }
    }
    archives.sort();
    Ok(archives)
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
