//! Per-package outcome records collected across a run.
//!
//! Stages never abort the batch for a single package; they push a
//! [`StageFailure`] and move on. The records are rendered once at the end of
//! the run so a human can triage everything in one place.

use camino::Utf8PathBuf;
use std::fmt;

/// A pipeline stage, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading package directories and descriptors.
    Discovery,
    /// Running the package build tool.
    Build,
    /// Unpacking archives into the gallery tree.
    Extract,
    /// Reading the gallery tree back for the manifest.
    Manifest,
    /// Prebuilding runtime environments.
    Environment,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Discovery => "discover",
            Self::Build => "build",
            Self::Extract => "extract",
            Self::Manifest => "manifest",
            Self::Environment => "environment",
        };
        f.write_str(label)
    }
}

/// A recoverable failure for one package in one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    /// The stage that failed.
    pub stage: Stage,
    /// Package name, directory, or archive the failure relates to.
    pub package: String,
    /// Human-readable reason.
    pub reason: String,
}

impl StageFailure {
    /// Create a failure record.
    #[must_use]
    pub fn new(stage: Stage, package: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            stage,
            package: package.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.stage, self.package, self.reason)
    }
}

/// A manifest file written during the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenManifest {
    /// Where the manifest was written.
    pub path: Utf8PathBuf,
    /// Number of packages listed.
    pub packages: usize,
    /// The manifest's aggregate hash.
    pub total_hash: String,
}

/// Everything a run did, for the end-of-run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// `name version` of each package built.
    pub built: Vec<String>,
    /// `name version` of each package skipped because it was already published.
    pub skipped: Vec<String>,
    /// `name version` of each archive extracted.
    pub extracted: Vec<String>,
    /// Manifests written.
    pub manifests: Vec<WrittenManifest>,
    /// Environment archives built and staged for upload.
    pub environments_staged: Vec<Utf8PathBuf>,
    /// Environment hashes already published remotely.
    pub environments_present: Vec<String>,
    /// Recoverable failures, in the order they happened.
    pub failures: Vec<StageFailure>,
}

impl RunSummary {
    /// Return true when any package failed in any stage.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Fold another summary's records into this one.
    pub fn merge(&mut self, other: Self) {
        self.built.extend(other.built);
        self.skipped.extend(other.skipped);
        self.extracted.extend(other.extracted);
        self.manifests.extend(other.manifests);
        self.environments_staged.extend(other.environments_staged);
        self.environments_present.extend(other.environments_present);
        self.failures.extend(other.failures);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_display_includes_stage_and_package() {
        let failure = StageFailure::new(Stage::Build, "alpha", "exit code 1");
        assert_eq!(failure.to_string(), "build: alpha: exit code 1");
    }

    #[test]
    fn merge_concatenates_records() {
        let mut first = RunSummary {
            built: vec!["alpha 1.0.0".to_owned()],
            ..RunSummary::default()
        };
        let second = RunSummary {
            skipped: vec!["beta 2.0.0".to_owned()],
            failures: vec![StageFailure::new(Stage::Extract, "gamma.zip", "corrupt")],
            ..RunSummary::default()
        };

        first.merge(second);

        assert_eq!(first.built, ["alpha 1.0.0"]);
        assert_eq!(first.skipped, ["beta 2.0.0"]);
        assert!(first.has_failures());
    }
}
