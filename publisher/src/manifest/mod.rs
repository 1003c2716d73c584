//! Gallery manifest schema.
//!
//! The manifest is the pipeline's terminal artefact: one JSON index of every
//! published package version with its download URLs, hashes, and actions.
//!
//! ```json
//! {
//!   "action_packages": [
//!     {
//!       "name": "Alpha",
//!       "versions": [
//!         {
//!           "version": "1.0.0",
//!           "description": "Alpha actions",
//!           "zip": "https://cdn.example.com/gallery/actions/alpha/1.0.0/package.zip",
//!           "icon": "https://cdn.example.com/gallery/actions/alpha/1.0.0/package.png",
//!           "metadata": "https://cdn.example.com/gallery/actions/alpha/1.0.0/metadata.json",
//!           "actions": ["Run alpha"],
//!           "python_env_hash": "5f1a9c0e77d2b3a4",
//!           "zip_hash": "..."
//!         }
//!       ]
//!     }
//!   ],
//!   "total_hash": "..."
//! }
//! ```
//!
//! # Sub-modules
//!
//! - [`actions`]: action names from packaged API metadata.
//! - [`generator`]: building, hashing, and writing manifests.
//! - [`whitelist`]: restricted distribution variants.

pub mod actions;
pub mod generator;
pub mod whitelist;

use crate::error::{PublisherError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Default file name of the unrestricted (or `standard`) manifest.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Errors arising from producing a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The gallery tree could not be listed.
    #[error("cannot scan gallery {path}: {source}")]
    Scan {
        /// The gallery root.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest file could not be written.
    #[error("cannot write {path}: {source}")]
    Write {
        /// The manifest path.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest could not be serialised.
    #[error("cannot serialise manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The published index of packages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Packages sorted by name.
    pub action_packages: Vec<ManifestPackage>,
    /// SHA-256 over the sorted concatenation of every `zip_hash` listed.
    pub total_hash: String,
}

/// One package and its published versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestPackage {
    /// Package display name.
    pub name: String,
    /// Versions, newest first.
    pub versions: Vec<ManifestVersion>,
}

/// A published version of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestVersion {
    /// Package version.
    pub version: String,
    /// Description from the descriptor.
    #[serde(default)]
    pub description: String,
    /// Download URL of the package archive.
    pub zip: String,
    /// URL of the package icon.
    pub icon: String,
    /// URL of the action metadata.
    pub metadata: String,
    /// URL of the readme, when the package ships one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,
    /// URL of the changelog, when the package ships one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,
    /// Exposed action names.
    #[serde(default)]
    pub actions: Vec<String>,
    /// Environment fingerprint, `null` when unknown.
    #[serde(default)]
    pub python_env_hash: Option<String>,
    /// SHA-256 of the package archive.
    pub zip_hash: String,
}

impl Manifest {
    /// Read a manifest written by a previous run.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::InvalidBaseline`] if the file cannot be
    /// read or is not a manifest.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let invalid = |reason: String| PublisherError::InvalidBaseline {
            path: path.to_owned(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))
    }
}

/// The `(name, version)` pairs a previous manifest already lists.
///
/// Matching is on the exact version string: a rebuilt package with the same
/// version is still considered published.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishedVersions {
    pairs: BTreeSet<(String, String)>,
}

impl PublishedVersions {
    /// Collect the pairs listed in `manifest`.
    #[must_use]
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let pairs = manifest
            .action_packages
            .iter()
            .flat_map(|package| {
                package
                    .versions
                    .iter()
                    .map(|v| (package.name.clone(), v.version.clone()))
            })
            .collect();
        Self { pairs }
    }

    /// Load the baseline manifest at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::InvalidBaseline`] if it cannot be read.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        Manifest::load(path).map(|manifest| Self::from_manifest(&manifest))
    }

    /// Return true when `name` at `version` is already published.
    #[must_use]
    pub fn contains(&self, name: &str, version: &str) -> bool {
        self.pairs.contains(&(name.to_owned(), version.to_owned()))
    }

    /// Number of published pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Return true when nothing is published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::utf8_temp_dir;

    const BASELINE: &str = r#"{
        "action_packages": [
            {"name": "foo", "versions": [
                {"version": "1.0.0", "zip": "z", "icon": "i", "metadata": "m",
                 "actions": [], "python_env_hash": null, "zip_hash": "h",
                 "future_field": true}
            ]}
        ],
        "total_hash": "t"
    }"#;

    #[test]
    fn baseline_lists_exact_versions() {
        let (_temp, root) = utf8_temp_dir();
        let path = root.join("manifest.json");
        std::fs::write(&path, BASELINE).expect("write baseline");

        let published = PublishedVersions::load(&path).expect("baseline parses");

        assert_eq!(published.len(), 1);
        assert!(published.contains("foo", "1.0.0"));
        assert!(!published.contains("foo", "1.1.0"));
        assert!(!published.contains("bar", "1.0.0"));
    }

    #[test]
    fn unreadable_baseline_is_fatal() {
        let err = PublishedVersions::load(Utf8Path::new("/nowhere/manifest.json"))
            .expect_err("missing baseline");
        assert!(matches!(err, PublisherError::InvalidBaseline { .. }));
    }

    #[test]
    fn malformed_baseline_is_fatal() {
        let (_temp, root) = utf8_temp_dir();
        let path = root.join("manifest.json");
        std::fs::write(&path, "[]").expect("write baseline");

        let err = PublishedVersions::load(&path).expect_err("not a manifest");
        assert!(matches!(err, PublisherError::InvalidBaseline { .. }));
    }

    #[test]
    fn optional_urls_are_omitted_when_absent() {
        let version = ManifestVersion {
            version: "1.0.0".to_owned(),
            description: String::new(),
            zip: "z".to_owned(),
            icon: "i".to_owned(),
            metadata: "m".to_owned(),
            readme: None,
            changelog: Some("c".to_owned()),
            actions: Vec::new(),
            python_env_hash: None,
            zip_hash: "h".to_owned(),
        };
        let value = serde_json::to_value(&version).expect("serialises");
        assert!(value.get("readme").is_none());
        assert_eq!(value["changelog"], "c");
        assert!(value["python_env_hash"].is_null());
    }
}
