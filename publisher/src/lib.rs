//! Gallery publisher library.
//!
//! This crate turns a directory of action packages into a published gallery:
//! it builds each package into an archive with the external package tool,
//! unpacks the archives into a versioned tree, writes the `manifest.json`
//! index, and prebuilds runtime environments that are not yet published.
//! It is used by the `gallery-publisher` and `gallery-align-deps` binaries.
//!
//! # Modules
//!
//! - [`align`] - Dependency alignment for package descriptors
//! - [`artefact`] - Archive extraction and the versioned gallery tree
//! - [`builder`] - Package build orchestration with baseline skipping
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Layered run configuration
//! - [`descriptor`] - Typed `package.yaml` descriptors
//! - [`discovery`] - Package directory discovery
//! - [`environment`] - Environment prebuilds and remote existence checks
//! - [`error`] - Fatal error types
//! - [`executor`] - External tool invocation
//! - [`manifest`] - Manifest schema, generation, and whitelist variants
//! - [`output`] - End-of-run summary rendering
//! - [`package_name`] - Package display names and path slugs
//! - [`pipeline`] - Stage orchestration
//! - [`report`] - Per-package outcome records

pub mod align;
pub mod artefact;
pub mod builder;
pub mod cli;
pub mod config;
pub mod descriptor;
pub mod discovery;
pub mod environment;
pub mod error;
pub mod executor;
pub mod manifest;
pub mod output;
pub mod package_name;
pub mod pipeline;
pub mod report;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
