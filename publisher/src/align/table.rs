//! Canonical dependency pins.
//!
//! Every package in the gallery should resolve the shared parts of its
//! environment to the same versions so that environment archives dedupe.
//! The priority orders entries inside a group: the interpreter and package
//! tooling first, then the action framework, then common libraries.

use crate::descriptor::Ecosystem;

/// A pinned dependency and its position within its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalDependency {
    /// Group the pin applies to.
    pub group: &'static str,
    /// Canonical spelling of the package name.
    pub name: &'static str,
    /// Pinned version.
    pub version: &'static str,
    /// Sort key; lower sorts first.
    pub priority: u32,
}

impl CanonicalDependency {
    /// Render the `name=version` form written into descriptors.
    #[must_use]
    pub fn spec(&self) -> String {
        format!("{}={}", self.name, self.version)
    }
}

const fn pin(
    group: &'static str,
    name: &'static str,
    version: &'static str,
    priority: u32,
) -> CanonicalDependency {
    CanonicalDependency {
        group,
        name,
        version,
        priority,
    }
}

/// The default table applied by `gallery-align-deps`.
pub const CANONICAL_DEPENDENCIES: &[CanonicalDependency] = &[
    pin("conda-forge", "python", "3.10.14", 0),
    pin("conda-forge", "uv", "0.4.17", 1),
    pin("conda-forge", "pip", "24.0", 2),
    pin("pypi", "sema4ai-actions", "1.1.4", 0),
    pin("pypi", "robocorp-truststore", "0.9.1", 1),
    pin("pypi", "pydantic", "2.9.2", 10),
    pin("pypi", "python-dotenv", "1.0.1", 11),
    pin("pypi", "requests", "2.32.3", 20),
    pin("pypi", "google-api-python-client", "2.146.0", 30),
    pin("pypi", "google-auth-oauthlib", "1.2.1", 31),
    pin("pypi", "msal", "1.31.0", 32),
    pin("pypi", "hubspot-api-client", "9.0.0", 40),
    pin("pypi", "simple-salesforce", "1.12.6", 41),
    pin("pypi", "snowflake-connector-python", "3.12.2", 42),
    pin("pypi", "slack-sdk", "3.33.1", 43),
];

/// Normalise a package name for table lookups.
///
/// Comparison is case-insensitive and treats `_` and `-` as equal.
#[must_use]
pub fn normalise_name(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace('_', "-")
}

/// Find the pin for `name` within `ecosystem`, if any.
#[must_use]
pub fn lookup<'t>(
    table: &'t [CanonicalDependency],
    ecosystem: &Ecosystem,
    name: &str,
) -> Option<&'t CanonicalDependency> {
    let wanted = normalise_name(name);
    table
        .iter()
        .find(|pin| pin.group == ecosystem.group_name() && normalise_name(pin.name) == wanted)
}
