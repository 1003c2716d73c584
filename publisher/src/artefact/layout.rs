//! On-disk layout of the extracted gallery tree.
//!
//! ```text
//! <gallery>/<slug>/<version>/
//!     package.yaml
//!     metadata.json
//!     package.png
//!     README.md
//!     CHANGELOG.md
//!     package.zip
//!     package.hash
//!     environment.hash
//! ```

use crate::package_name::PackageName;
use camino::{Utf8Path, Utf8PathBuf};

/// Descriptor copied out of the archive.
pub const DESCRIPTOR: &str = crate::descriptor::DESCRIPTOR_FILE;
/// Canonical name of the action metadata file.
pub const METADATA: &str = "metadata.json";
/// Name of the action metadata file inside built archives.
pub const ARCHIVE_METADATA: &str = "__action_server_metadata__.json";
/// Package icon.
pub const ICON: &str = "package.png";
/// Optional readme.
pub const README: &str = "README.md";
/// Optional changelog.
pub const CHANGELOG: &str = "CHANGELOG.md";
/// Copy of the built archive.
pub const ARCHIVE: &str = "package.zip";
/// SHA-256 of the archive bytes.
pub const CONTENT_HASH: &str = "package.hash";
/// Environment fingerprint from the hash tool.
pub const ENV_HASH: &str = "environment.hash";

/// Paths for one `(package, version)` directory in the gallery tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionLayout {
    dir: Utf8PathBuf,
}

impl VersionLayout {
    /// Layout for `name` at `version` under `gallery_root`.
    #[must_use]
    pub fn new(gallery_root: &Utf8Path, name: &PackageName, version: &str) -> Self {
        Self {
            dir: gallery_root.join(name.slug()).join(version),
        }
    }

    /// Layout for an existing version directory.
    #[must_use]
    pub fn at(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The version directory itself.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Path of `file` inside the version directory.
    #[must_use]
    pub fn file(&self, file: &str) -> Utf8PathBuf {
        self.dir.join(file)
    }

    /// Path of the extracted descriptor.
    #[must_use]
    pub fn descriptor(&self) -> Utf8PathBuf {
        self.file(DESCRIPTOR)
    }

    /// Path of the copied archive.
    #[must_use]
    pub fn archive(&self) -> Utf8PathBuf {
        self.file(ARCHIVE)
    }

    /// Path of the archive's content hash.
    #[must_use]
    pub fn content_hash(&self) -> Utf8PathBuf {
        self.file(CONTENT_HASH)
    }

    /// Path of the environment hash.
    #[must_use]
    pub fn env_hash(&self) -> Utf8PathBuf {
        self.file(ENV_HASH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_dir_is_namespaced_by_slug_and_version() {
        let layout = VersionLayout::new(
            Utf8Path::new("/out/gallery"),
            &PackageName::from("Google Mail"),
            "1.2.0",
        );
        assert_eq!(layout.dir(), "/out/gallery/google-mail/1.2.0");
        assert_eq!(
            layout.content_hash(),
            "/out/gallery/google-mail/1.2.0/package.hash"
        );
    }
}
