//! Archive extraction into the versioned gallery tree.
//!
//! Each built `.zip` is opened, its descriptor read to learn the package
//! name and version, and a fixed allowlist of top-level files copied into
//! `<gallery>/<slug>/<version>/`. The archive itself is copied alongside
//! with its SHA-256 digest. Entry names are validated before anything is
//! written, so an archive cannot escape its version directory.

use super::extracted::{ExtractedVersion, VersionLoadError};
use super::layout::{self, VersionLayout};
use super::sha256_digest::Sha256Digest;
use crate::descriptor::{DescriptorError, PackageDescriptor};
use crate::executor::{CommandExecutor, run_checked};
use crate::report::{Stage, StageFailure};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path};
use zip::ZipArchive;
use zip::result::ZipError;

/// Errors arising from extracting one archive.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file is not a readable zip archive.
    #[error("unreadable archive: {0}")]
    Zip(#[from] ZipError),

    /// An entry name attempts to escape the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending entry name.
        path: String,
    },

    /// The archive has no top-level descriptor.
    #[error("archive contains no package.yaml")]
    MissingDescriptor,

    /// The packaged descriptor is invalid.
    #[error("invalid packaged descriptor: {0}")]
    Descriptor(#[from] DescriptorError),

    /// The name or version cannot be used as a directory name.
    #[error("cannot use {segment:?} as a gallery path segment")]
    UnsafeSegment {
        /// The rejected name or version.
        segment: String,
    },

    /// Another package with the same slug already owns the version directory.
    #[error("{dir} already holds package {existing:?}; refusing to replace it with {incoming:?}")]
    SlugCollision {
        /// The contested version directory.
        dir: Utf8PathBuf,
        /// Name recorded in the existing directory.
        existing: String,
        /// Name from the archive being extracted.
        incoming: String,
    },

    /// The extracted directory could not be read back.
    #[error(transparent)]
    Incomplete(#[from] VersionLoadError),
}

/// Settings for [`ArchiveExtractor`].
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Root of the versioned gallery tree.
    pub gallery_root: Utf8PathBuf,
    /// Tool that fingerprints environments; `None` disables the step.
    pub env_tool: Option<String>,
}

/// The result of extracting a batch of archives.
#[derive(Debug, Default)]
pub struct ExtractOutcome {
    /// Versions written to the gallery tree.
    pub extracted: Vec<ExtractedVersion>,
    /// Archives that could not be extracted.
    pub failures: Vec<StageFailure>,
}

/// Unpacks built archives into the gallery tree.
pub struct ArchiveExtractor<'a> {
    config: ExtractConfig,
    executor: &'a dyn CommandExecutor,
}

impl<'a> ArchiveExtractor<'a> {
    /// Create an extractor.
    #[must_use]
    pub fn new(config: ExtractConfig, executor: &'a dyn CommandExecutor) -> Self {
        Self { config, executor }
    }

    /// Extract every archive, isolating failures per archive.
    pub fn extract_all(&self, archives: &[Utf8PathBuf]) -> ExtractOutcome {
        let mut outcome = ExtractOutcome::default();
        for archive in archives {
            match self.extract(archive) {
                Ok(version) => {
                    info!("extracted {} to {}", version.label(), version.dir);
                    outcome.extracted.push(version);
                }
                Err(e) => {
                    warn!("failed to extract {archive}: {e}");
                    outcome
                        .failures
                        .push(StageFailure::new(Stage::Extract, archive.as_str(), e.to_string()));
                }
            }
        }
        outcome
    }

    /// Extract one archive.
    ///
    /// Any previous contents of the target version directory are replaced,
    /// provided they belong to the same package.
    /// On failure the version directory is removed again so that a later
    /// manifest run never sees a half-written version.
    ///
    /// # Errors
    ///
    /// Returns an [`ExtractionError`] if the archive is unreadable, lacks a
    /// descriptor, or contains an entry that escapes the destination, and
    /// [`ExtractionError::SlugCollision`] if a differently named package
    /// already occupies the version directory.
    pub fn extract(&self, archive_path: &Utf8Path) -> Result<ExtractedVersion, ExtractionError> {
        let mut archive = ZipArchive::new(File::open(archive_path)?)?;
        validate_entries(&mut archive)?;

        let descriptor = read_descriptor(&mut archive)?;
        check_segment(&descriptor.name.slug())?;
        check_segment(&descriptor.version)?;

        let layout = VersionLayout::new(
            &self.config.gallery_root,
            &descriptor.name,
            &descriptor.version,
        );
        if layout.dir().exists() {
            check_owner(&layout, &descriptor)?;
            debug!("replacing {}", layout.dir());
            fs::remove_dir_all(layout.dir())?;
        }
        fs::create_dir_all(layout.dir())?;

        let result = self.populate(&mut archive, archive_path, &layout);
        if result.is_err() {
            if let Err(e) = fs::remove_dir_all(layout.dir()) {
                warn!("could not clean up {}: {e}", layout.dir());
            }
        }
        result
    }

    fn populate(
        &self,
        archive: &mut ZipArchive<File>,
        archive_path: &Utf8Path,
        layout: &VersionLayout,
    ) -> Result<ExtractedVersion, ExtractionError> {
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            if entry.is_dir() {
                continue;
            }
            let Some(target) = allowed_target(entry.name()) else {
                continue;
            };
            let mut out = File::create(layout.file(target))?;
            io::copy(&mut entry, &mut out)?;
        }

        fs::copy(archive_path, layout.archive())?;
        let digest = Sha256Digest::of_file(archive_path)?;
        fs::write(layout.content_hash(), digest.as_str())?;

        if let Some(tool) = &self.config.env_tool {
            self.write_env_hash(tool, layout)?;
        }

        Ok(ExtractedVersion::load(layout.dir())?)
    }

    /// Run the hash tool; a tool failure leaves `environment.hash` absent.
    fn write_env_hash(&self, tool: &str, layout: &VersionLayout) -> io::Result<()> {
        let descriptor = layout.descriptor();
        let args = ["ht", "hash", descriptor.as_str(), "--silent"];
        match run_checked(self.executor, tool, &args, None) {
            Ok(stdout) => {
                let hash = String::from_utf8_lossy(&stdout).trim().to_owned();
                if hash.is_empty() {
                    warn!("{tool} printed no environment hash for {descriptor}");
                } else {
                    fs::write(layout.env_hash(), hash)?;
                }
            }
            Err(reason) => warn!("no environment hash for {descriptor}: {reason}"),
        }
        Ok(())
    }
}

/// Refuse to replace a version directory written for a different package.
///
/// A directory without a readable descriptor is a leftover and may be
/// replaced.
fn check_owner(
    layout: &VersionLayout,
    incoming: &PackageDescriptor,
) -> Result<(), ExtractionError> {
    let Ok(existing) = PackageDescriptor::load(&layout.descriptor()) else {
        return Ok(());
    };
    if existing.name == incoming.name {
        return Ok(());
    }
    Err(ExtractionError::SlugCollision {
        dir: layout.dir().to_owned(),
        existing: existing.name.to_string(),
        incoming: incoming.name.to_string(),
    })
}

/// Map an archive entry to its file name in the version directory.
///
/// Only top-level entries are considered. The action metadata file is
/// renamed; other allowed files keep their names.
fn allowed_target(entry_name: &str) -> Option<&str> {
    if entry_name.contains(['/', '\\']) {
        return None;
    }
    match entry_name {
        layout::ARCHIVE_METADATA => Some(layout::METADATA),
        layout::DESCRIPTOR | layout::ICON | layout::README | layout::CHANGELOG => Some(entry_name),
        layout::METADATA => None,
        other => Path::new(other)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext, "json" | "yaml" | "yml"))
            .then_some(other),
    }
}

/// Reject archives with absolute or `..` entry names.
fn validate_entries(archive: &mut ZipArchive<File>) -> Result<(), ExtractionError> {
    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        validate_entry_path(entry.name())?;
    }
    Ok(())
}

fn validate_entry_path(name: &str) -> Result<(), ExtractionError> {
    let path = Path::new(name);
    let escapes = path.is_absolute()
        || name.starts_with(['/', '\\'])
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: name.to_owned(),
        });
    }
    Ok(())
}

fn read_descriptor(archive: &mut ZipArchive<File>) -> Result<PackageDescriptor, ExtractionError> {
    let mut entry = match archive.by_name(layout::DESCRIPTOR) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Err(ExtractionError::MissingDescriptor),
        Err(e) => return Err(e.into()),
    };
    let mut text = String::new();
    entry.read_to_string(&mut text)?;
    Ok(PackageDescriptor::parse(&text)?)
}

fn check_segment(segment: &str) -> Result<(), ExtractionError> {
    let mut components = Path::new(segment).components();
    let single_normal = matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none()
        && !segment.contains(['/', '\\']);
    if single_normal {
        Ok(())
    } else {
        Err(ExtractionError::UnsafeSegment {
            segment: segment.to_owned(),
        })
    }
}

#[cfg(test)]
#[path = "extraction_tests.rs"]
mod tests;
