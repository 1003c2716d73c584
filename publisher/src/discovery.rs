//! Package discovery.
//!
//! Walks the immediate subdirectories of the package root and yields one
//! [`DiscoveredPackage`] per directory holding a valid `package.yaml`. A
//! missing or malformed descriptor fails only that directory; the iterator
//! keeps going.
//!
//! Order follows the directory listing and is not sorted. Later stages must
//! not depend on it for correctness.

use crate::descriptor::{DESCRIPTOR_FILE, PackageDescriptor};
use crate::error::{PublisherError, Result};
use crate::report::{Stage, StageFailure};
use camino::{ReadDirUtf8, Utf8Path, Utf8PathBuf};
use log::{debug, warn};

/// A package directory with its parsed descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPackage {
    /// The package's source directory.
    pub dir: Utf8PathBuf,
    /// The parsed descriptor.
    pub descriptor: PackageDescriptor,
}

impl DiscoveredPackage {
    /// Return `name version`, the label used in logs and summaries.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.descriptor.name, self.descriptor.version)
    }
}

/// Lazy iterator over the packages under a root directory.
#[derive(Debug)]
pub struct PackageDiscovery {
    entries: ReadDirUtf8,
}

/// Start discovering packages under `root`.
///
/// # Errors
///
/// Returns [`PublisherError::InputDirNotFound`] if `root` is not an existing
/// directory, or [`PublisherError::Io`] if it cannot be listed. Both are
/// fatal: there is nothing to publish without an input tree.
pub fn discover_packages(root: &Utf8Path) -> Result<PackageDiscovery> {
    if !root.is_dir() {
        return Err(PublisherError::InputDirNotFound {
            path: root.to_owned(),
        });
    }
    Ok(PackageDiscovery {
        entries: root.read_dir_utf8()?,
    })
}

impl Iterator for PackageDiscovery {
    type Item = std::result::Result<DiscoveredPackage, StageFailure>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    return Some(Err(StageFailure::new(
                        Stage::Discovery,
                        "<directory entry>",
                        e.to_string(),
                    )));
                }
            };

            let dir = entry.path();
            if entry.file_name().starts_with('.') || !dir.is_dir() {
                debug!("skipping {dir}: not a package directory");
                continue;
            }

            return Some(load_package(dir));
        }
    }
}

fn load_package(dir: &Utf8Path) -> std::result::Result<DiscoveredPackage, StageFailure> {
    let descriptor_path = dir.join(DESCRIPTOR_FILE);
    if !descriptor_path.is_file() {
        return Err(StageFailure::new(
            Stage::Discovery,
            dir.as_str(),
            format!("no {DESCRIPTOR_FILE} found"),
        ));
    }

    PackageDescriptor::load(&descriptor_path)
        .map(|descriptor| DiscoveredPackage {
            dir: dir.to_owned(),
            descriptor,
        })
        .map_err(|e| StageFailure::new(Stage::Discovery, dir.as_str(), e.to_string()))
}

/// Drain a discovery iterator, logging and collecting failures.
pub fn collect_packages(
    discovery: impl Iterator<Item = std::result::Result<DiscoveredPackage, StageFailure>>,
) -> (Vec<DiscoveredPackage>, Vec<StageFailure>) {
    let mut packages = Vec::new();
    let mut failures = Vec::new();
    for item in discovery {
        match item {
            Ok(package) => {
                debug!("discovered {} in {}", package.label(), package.dir);
                packages.push(package);
            }
            Err(failure) => {
                warn!("{failure}");
                failures.push(failure);
            }
        }
    }
    (packages, failures)
}
