//! Package descriptor parsing.
//!
//! Each action package declares its identity and dependency closure in a
//! `package.yaml` file:
//!
//! ```yaml
//! name: Alpha
//! description: Does alpha things
//! version: 1.0.0
//! dependencies:
//!   conda-forge:
//!     - python=3.10.14
//!   pypi:
//!     - sema4ai-actions=1.1.0
//! ```
//!
//! Only the fields the pipeline needs are modelled; everything else in the
//! file (packaging rules, spec version) is ignored here and preserved by the
//! dependency aligner, which works on the raw text.

use crate::package_name::PackageName;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use serde_yaml::Value;
use std::fmt;
use thiserror::Error;

/// File name of the per-package descriptor.
pub const DESCRIPTOR_FILE: &str = "package.yaml";

/// Dependency group name for the native (conda) ecosystem.
pub const CONDA_GROUP: &str = "conda-forge";

/// Dependency group name for the Python package index.
pub const PYPI_GROUP: &str = "pypi";

/// Errors arising from reading or parsing a descriptor.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The descriptor file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// Path to the descriptor.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The descriptor is not valid YAML.
    #[error("invalid YAML: {0}")]
    Syntax(#[from] serde_yaml::Error),

    /// A required field is missing or empty.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// `version` was written as a YAML number, which loses trailing zeros.
    #[error("version `{0}` must be quoted, e.g. version: \"{0}\"")]
    UnquotedVersion(String),

    /// The `dependencies` section has an unexpected shape.
    #[error("invalid dependencies: {0}")]
    InvalidDependencies(String),
}

/// The ecosystem a dependency is resolved from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Ecosystem {
    /// Native packages from `conda-forge`.
    CondaForge,
    /// Python packages from PyPI.
    PyPi,
    /// Any other named group, kept verbatim.
    Other(String),
}

impl Ecosystem {
    /// Map a dependency group header to its ecosystem.
    #[must_use]
    pub fn from_group(group: &str) -> Self {
        match group {
            CONDA_GROUP => Self::CondaForge,
            PYPI_GROUP => Self::PyPi,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Return the group header used in descriptors.
    #[must_use]
    pub fn group_name(&self) -> &str {
        match self {
            Self::CondaForge => CONDA_GROUP,
            Self::PyPi => PYPI_GROUP,
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.group_name())
    }
}

/// One entry of a descriptor's dependency list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Group the dependency was declared under.
    pub ecosystem: Ecosystem,
    /// Package name (or the whole entry for pip flags).
    pub name: String,
    /// Version constraint without a leading `=`; empty when unpinned.
    pub version: String,
}

impl Dependency {
    /// Parse an entry such as `python=3.10.14` or `pytz>=2024.1`.
    ///
    /// # Examples
    ///
    /// ```
    /// use gallery_publisher::descriptor::{Dependency, Ecosystem};
    ///
    /// let dep = Dependency::parse(Ecosystem::CondaForge, "python=3.10.14");
    /// assert_eq!(dep.name, "python");
    /// assert_eq!(dep.version, "3.10.14");
    ///
    /// let ranged = Dependency::parse(Ecosystem::PyPi, "pytz>=2024.1");
    /// assert_eq!(ranged.version, ">=2024.1");
    /// ```
    #[must_use]
    pub fn parse(ecosystem: Ecosystem, spec: &str) -> Self {
        let spec = spec.trim();
        if spec.starts_with('-') {
            return Self {
                ecosystem,
                name: spec.to_owned(),
                version: String::new(),
            };
        }
        let Some(split) = spec.find(['=', '<', '>', '!', '~']) else {
            return Self {
                ecosystem,
                name: spec.to_owned(),
                version: String::new(),
            };
        };
        let (name, constraint) = spec.split_at(split);
        let version = constraint
            .strip_prefix("==")
            .or_else(|| constraint.strip_prefix('='))
            .unwrap_or(constraint);
        Self {
            ecosystem,
            name: name.trim().to_owned(),
            version: version.trim().to_owned(),
        }
    }
}

/// The subset of `package.yaml` the pipeline relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    /// Display name; together with `version` identifies a publishable unit.
    pub name: PackageName,
    /// Package version (semver-like).
    pub version: String,
    /// Free-form description shown in the gallery.
    pub description: String,
    /// Dependencies in declaration order, conda group first when both exist.
    pub dependencies: Vec<Dependency>,
}

#[derive(Debug, Deserialize)]
struct RawDescriptor {
    name: Option<String>,
    version: Option<Value>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    dependencies: Option<Value>,
}

impl PackageDescriptor {
    /// Parse descriptor text.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::Syntax`] for invalid YAML,
    /// [`DescriptorError::MissingField`] when `name` or `version` is absent
    /// or blank, [`DescriptorError::UnquotedVersion`] when `version` is a
    /// bare number, and [`DescriptorError::InvalidDependencies`] when the
    /// dependency section is not a map of lists of strings.
    pub fn parse(text: &str) -> Result<Self, DescriptorError> {
        let raw: RawDescriptor = serde_yaml::from_str(text)?;

        let name = raw
            .name
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty())
            .ok_or(DescriptorError::MissingField("name"))?;
        let version = match raw.version {
            Some(Value::String(v)) => Some(v.trim().to_owned()),
            Some(Value::Number(n)) => {
                return Err(DescriptorError::UnquotedVersion(n.to_string()));
            }
            _ => None,
        }
        .filter(|v| !v.is_empty())
        .ok_or(DescriptorError::MissingField("version"))?;
        let dependencies = match raw.dependencies {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => parse_dependencies(&value)?,
        };

        Ok(Self {
            name: PackageName::new(name),
            version,
            description: raw.description.unwrap_or_default().trim().to_owned(),
            dependencies,
        })
    }

    /// Read and parse the descriptor at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::Io`] if the file cannot be read, or any
    /// error from [`PackageDescriptor::parse`].
    pub fn load(path: &Utf8Path) -> Result<Self, DescriptorError> {
        let text = std::fs::read_to_string(path).map_err(|source| DescriptorError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&text)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_dependencies(value: &Value) -> Result<Vec<Dependency>, DescriptorError> {
    let Value::Mapping(groups) = value else {
        return Err(DescriptorError::InvalidDependencies(
            "expected a map of dependency groups".to_owned(),
        ));
    };

    let mut dependencies = Vec::new();
    for (group, entries) in groups {
        let Value::String(group) = group else {
            return Err(DescriptorError::InvalidDependencies(
                "group names must be strings".to_owned(),
            ));
        };
        let ecosystem = Ecosystem::from_group(group);
        let entries = match entries {
            Value::Null => continue,
            Value::Sequence(entries) => entries,
            _ => {
                return Err(DescriptorError::InvalidDependencies(format!(
                    "group `{group}` must be a list"
                )));
            }
        };
        for entry in entries {
            let spec = scalar_to_string(entry).ok_or_else(|| {
                DescriptorError::InvalidDependencies(format!(
                    "group `{group}` contains a non-string entry"
                ))
            })?;
            dependencies.push(Dependency::parse(ecosystem.clone(), &spec));
        }
    }
    Ok(dependencies)
}
