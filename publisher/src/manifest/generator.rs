//! Manifest generation.
//!
//! Reads every version in the gallery tree, projects it into a
//! [`ManifestVersion`] with deterministic URLs, and writes one manifest per
//! distribution variant. The aggregate `total_hash` is the SHA-256 of the
//! sorted concatenation of the listed `zip_hash` values, so it does not
//! depend on directory iteration order.

use super::whitelist::{ManifestVariant, Whitelist, variants};
use super::{Manifest, ManifestError, ManifestPackage, ManifestVersion};
use crate::artefact::extracted::{ExtractedVersion, scan_gallery};
use crate::artefact::layout;
use crate::artefact::sha256_digest::Sha256Digest;
use crate::report::{StageFailure, WrittenManifest};
use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use semver::Version;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Aggregate hash over a set of content hashes.
///
/// # Examples
///
/// ```
/// use gallery_publisher::manifest::generator::total_hash;
///
/// assert_eq!(total_hash(["b", "a"]), total_hash(["a", "b"]));
/// assert_eq!(
///     total_hash(Vec::<&str>::new()).as_str(),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
pub fn total_hash<'a>(hashes: impl IntoIterator<Item = &'a str>) -> Sha256Digest {
    let mut sorted: Vec<&str> = hashes.into_iter().collect();
    sorted.sort_unstable();
    Sha256Digest::of_bytes(sorted.concat().as_bytes())
}

/// Order versions newest first; semver versions sort before free-form ones.
fn newest_first(a: &str, b: &str) -> Ordering {
    match (Version::parse(a), Version::parse(b)) {
        (Ok(a), Ok(b)) => b.cmp(&a),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => b.cmp(a),
    }
}

/// Manifests written by one [`ManifestGenerator::publish`] call.
#[derive(Debug, Default)]
pub struct ManifestOutcome {
    /// Files written, in variant order.
    pub written: Vec<WrittenManifest>,
    /// Version directories that could not be read.
    pub failures: Vec<StageFailure>,
}

/// Builds manifests from extracted versions.
#[derive(Debug, Clone)]
pub struct ManifestGenerator {
    base_url: String,
}

impl ManifestGenerator {
    /// Create a generator publishing under `base_url`.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn url(&self, version: &ExtractedVersion, file: &str) -> String {
        format!(
            "{}/{}/{}/{file}",
            self.base_url,
            version.package.slug(),
            version.version
        )
    }

    fn project(&self, version: &ExtractedVersion) -> ManifestVersion {
        ManifestVersion {
            version: version.version.clone(),
            description: version.description.clone(),
            zip: self.url(version, layout::ARCHIVE),
            icon: self.url(version, layout::ICON),
            metadata: self.url(version, layout::METADATA),
            readme: version.readme.then(|| self.url(version, layout::README)),
            changelog: version.changelog.then(|| self.url(version, layout::CHANGELOG)),
            actions: version.actions.clone(),
            python_env_hash: version.env_hash.clone(),
            zip_hash: version.content_hash.to_string(),
        }
    }

    /// Build the manifest for `versions` restricted to `variant`.
    #[must_use]
    pub fn generate(&self, versions: &[ExtractedVersion], variant: &ManifestVariant) -> Manifest {
        let mut packages: BTreeMap<&str, Vec<ManifestVersion>> = BTreeMap::new();
        for version in versions.iter().filter(|v| variant.allows(&v.package)) {
            packages
                .entry(version.package.as_str())
                .or_default()
                .push(self.project(version));
        }

        let action_packages: Vec<ManifestPackage> = packages
            .into_iter()
            .map(|(name, mut versions)| {
                versions.sort_by(|a, b| newest_first(&a.version, &b.version));
                ManifestPackage {
                    name: name.to_owned(),
                    versions,
                }
            })
            .collect();

        let total = total_hash(
            action_packages
                .iter()
                .flat_map(|p| p.versions.iter().map(|v| v.zip_hash.as_str())),
        );

        Manifest {
            action_packages,
            total_hash: total.into_inner(),
        }
    }

    /// Scan `gallery_root` and write every manifest variant into it.
    ///
    /// Versions that cannot be read are skipped and reported; the manifests
    /// are written regardless.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] if the gallery cannot be listed or a
    /// manifest cannot be written.
    pub fn publish(
        &self,
        gallery_root: &Utf8Path,
        whitelist: Option<&Whitelist>,
    ) -> Result<ManifestOutcome, ManifestError> {
        let (versions, failures) =
            scan_gallery(gallery_root).map_err(|source| ManifestError::Scan {
                path: gallery_root.to_owned(),
                source,
            })?;
        let written = self.write_all(&versions, gallery_root, whitelist)?;
        Ok(ManifestOutcome { written, failures })
    }

    /// Write one manifest per variant for `versions` into `gallery_root`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] if a manifest cannot be written.
    pub fn write_all(
        &self,
        versions: &[ExtractedVersion],
        gallery_root: &Utf8Path,
        whitelist: Option<&Whitelist>,
    ) -> Result<Vec<WrittenManifest>, ManifestError> {
        let mut written = Vec::new();
        for variant in variants(whitelist) {
            let manifest = self.generate(versions, &variant);
            let path = gallery_root.join(variant.file_name);
            write_manifest(&manifest, &path)?;
            info!(
                "wrote {path} with {} package(s), total hash {}",
                manifest.action_packages.len(),
                manifest.total_hash
            );
            written.push(WrittenManifest {
                path,
                packages: manifest.action_packages.len(),
                total_hash: manifest.total_hash,
            });
        }
        Ok(written)
    }
}

/// Write `manifest` as pretty-printed JSON, replacing any existing file.
///
/// # Errors
///
/// Returns [`ManifestError`] on serialisation or I/O failure.
pub fn write_manifest(manifest: &Manifest, path: &Utf8Path) -> Result<(), ManifestError> {
    let mut json = serde_json::to_string_pretty(manifest)?;
    json.push('\n');
    let write_error = |source: std::io::Error| ManifestError::Write {
        path: path.to_owned(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    std::fs::write(path, json).map_err(write_error)
}

/// Return the path of the default manifest under `gallery_root`.
#[must_use]
pub fn manifest_path(gallery_root: &Utf8Path) -> Utf8PathBuf {
    gallery_root.join(super::MANIFEST_FILE)
}

#[cfg(test)]
#[path = "generator_tests.rs"]
mod tests;
