//! Extracted versions read back from the gallery tree.

use super::layout::{self, VersionLayout};
use super::sha256_digest::{InvalidDigest, Sha256Digest};
use crate::descriptor::{DescriptorError, PackageDescriptor};
use crate::manifest::actions::read_actions;
use crate::package_name::PackageName;
use crate::report::{Stage, StageFailure};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::io::ErrorKind;
use thiserror::Error;

/// Why a version directory could not be read back.
#[derive(Debug, Error)]
pub enum VersionLoadError {
    /// A file every version must have is absent.
    #[error("missing {0}")]
    MissingFile(&'static str),

    /// The extracted descriptor is unreadable.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// `package.hash` does not hold a SHA-256 digest.
    #[error("package.hash: {0}")]
    Digest(#[from] InvalidDigest),

    /// Reading a file failed.
    #[error("cannot read {path}: {source}")]
    Io {
        /// The file being read.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// `metadata.json` is unreadable.
    #[error("{0}")]
    Metadata(String),
}

/// One `(package, version)` pair as it sits in the gallery tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedVersion {
    /// Package display name from the descriptor.
    pub package: PackageName,
    /// Package version.
    pub version: String,
    /// Description from the descriptor.
    pub description: String,
    /// The version directory.
    pub dir: Utf8PathBuf,
    /// SHA-256 of the archive bytes.
    pub content_hash: Sha256Digest,
    /// Environment fingerprint, when the hash tool produced one.
    pub env_hash: Option<String>,
    /// Exposed action names.
    pub actions: Vec<String>,
    /// Whether a readme was extracted.
    pub readme: bool,
    /// Whether a changelog was extracted.
    pub changelog: bool,
}

impl ExtractedVersion {
    /// Read a version directory back.
    ///
    /// # Errors
    ///
    /// Returns [`VersionLoadError`] when the descriptor or content hash is
    /// missing or invalid, or the metadata file cannot be parsed.
    pub fn load(dir: &Utf8Path) -> Result<Self, VersionLoadError> {
        let layout = VersionLayout::at(dir);

        let descriptor_path = layout.descriptor();
        if !descriptor_path.is_file() {
            return Err(VersionLoadError::MissingFile(layout::DESCRIPTOR));
        }
        let descriptor = PackageDescriptor::load(&descriptor_path)?;

        let hash_text = read_optional(&layout.content_hash())?
            .ok_or(VersionLoadError::MissingFile(layout::CONTENT_HASH))?;
        let content_hash = Sha256Digest::try_from(hash_text.trim())?;

        let env_hash = read_optional(&layout.env_hash())?
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty());

        let actions =
            read_actions(&layout.file(layout::METADATA)).map_err(VersionLoadError::Metadata)?;

        Ok(Self {
            package: descriptor.name,
            version: descriptor.version,
            description: descriptor.description,
            dir: dir.to_owned(),
            content_hash,
            env_hash,
            actions,
            readme: layout.file(layout::README).is_file(),
            changelog: layout.file(layout::CHANGELOG).is_file(),
        })
    }

    /// Return `name version`, the label used in logs and summaries.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.package, self.version)
    }
}

fn read_optional(path: &Utf8Path) -> Result<Option<String>, VersionLoadError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(VersionLoadError::Io {
            path: path.to_owned(),
            source,
        }),
    }
}

/// Read every version directory under `gallery_root`.
///
/// A missing root is an empty gallery. Unreadable versions are reported as
/// [`Stage::Manifest`] failures and left out.
///
/// # Errors
///
/// Returns an I/O error if an existing directory cannot be listed.
pub fn scan_gallery(
    gallery_root: &Utf8Path,
) -> std::io::Result<(Vec<ExtractedVersion>, Vec<StageFailure>)> {
    let mut versions = Vec::new();
    let mut failures = Vec::new();
    if !gallery_root.is_dir() {
        debug!("gallery {gallery_root} does not exist yet");
        return Ok((versions, failures));
    }

    for package_entry in gallery_root.read_dir_utf8()? {
        let package_entry = package_entry?;
        if !package_entry.file_type()?.is_dir() {
            continue;
        }
        for version_entry in package_entry.path().read_dir_utf8()? {
            let version_entry = version_entry?;
            if !version_entry.file_type()?.is_dir() {
                continue;
            }
            let dir = version_entry.path();
            match ExtractedVersion::load(dir) {
                Ok(version) => versions.push(version),
                Err(e) => {
                    warn!("skipping {dir}: {e}");
                    failures.push(StageFailure::new(Stage::Manifest, dir.as_str(), e.to_string()));
                }
            }
        }
    }
    Ok((versions, failures))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::utf8_temp_dir;
    use std::fs;

    const DIGEST: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

    fn write_version(dir: &Utf8Path, name: &str, version: &str) {
        fs::create_dir_all(dir).expect("mkdir");
        fs::write(
            dir.join(layout::DESCRIPTOR),
            format!("name: {name}\nversion: {version}\ndescription: demo\n"),
        )
        .expect("write descriptor");
        fs::write(dir.join(layout::CONTENT_HASH), DIGEST).expect("write hash");
    }

    #[test]
    fn loads_a_complete_version() {
        let (_temp, root) = utf8_temp_dir();
        let dir = root.join("alpha/1.0.0");
        write_version(&dir, "Alpha", "1.0.0");
        fs::write(dir.join(layout::ENV_HASH), "abc123\n").expect("write env hash");
        fs::write(dir.join(layout::README), "# Alpha").expect("write readme");
        fs::write(
            dir.join(layout::METADATA),
            r#"{"openapi.json": {"paths": {"/run": {"post": {"summary": "Run"}}}}}"#,
        )
        .expect("write metadata");

        let version = ExtractedVersion::load(&dir).expect("complete version");

        assert_eq!(version.label(), "Alpha 1.0.0");
        assert_eq!(version.content_hash.as_str(), DIGEST);
        assert_eq!(version.env_hash.as_deref(), Some("abc123"));
        assert_eq!(version.actions, ["Run"]);
        assert!(version.readme);
        assert!(!version.changelog);
    }

    #[test]
    fn missing_env_hash_is_none() {
        let (_temp, root) = utf8_temp_dir();
        let dir = root.join("alpha/1.0.0");
        write_version(&dir, "alpha", "1.0.0");

        let version = ExtractedVersion::load(&dir).expect("complete version");
        assert!(version.env_hash.is_none());
        assert!(version.actions.is_empty());
    }

    #[test]
    fn missing_content_hash_is_an_error() {
        let (_temp, root) = utf8_temp_dir();
        let dir = root.join("alpha/1.0.0");
        write_version(&dir, "alpha", "1.0.0");
        fs::remove_file(dir.join(layout::CONTENT_HASH)).expect("remove hash");

        let err = ExtractedVersion::load(&dir).expect_err("incomplete version");
        assert!(matches!(err, VersionLoadError::MissingFile(layout::CONTENT_HASH)));
    }

    #[test]
    fn scan_reports_incomplete_versions() {
        let (_temp, root) = utf8_temp_dir();
        write_version(&root.join("alpha/1.0.0"), "alpha", "1.0.0");
        write_version(&root.join("alpha/1.1.0"), "alpha", "1.1.0");
        fs::create_dir_all(root.join("beta/2.0.0")).expect("mkdir");

        let (versions, failures) = scan_gallery(&root).expect("scan");

        assert_eq!(versions.len(), 2);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].package.ends_with("2.0.0"));
    }

    #[test]
    fn scan_of_missing_gallery_is_empty() {
        let (_temp, root) = utf8_temp_dir();
        let (versions, failures) = scan_gallery(&root.join("gallery")).expect("scan");
        assert!(versions.is_empty());
        assert!(failures.is_empty());
    }
}
