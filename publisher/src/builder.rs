//! Package build orchestration.
//!
//! Runs the external package tool once per discovered package, skipping
//! versions a baseline manifest already lists. The tool does not report the
//! archive it wrote, so the output directory's `.zip` files are snapshotted
//! before and after each run and the new one is taken as the artefact.

use crate::discovery::DiscoveredPackage;
use crate::executor::{CommandExecutor, run_checked};
use crate::manifest::PublishedVersions;
use crate::report::{Stage, StageFailure};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::time::SystemTime;

/// Configuration for the build stage.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// The package build tool executable.
    pub package_tool: String,
    /// Directory the tool writes archives into. Must be absolute, since the
    /// tool runs inside each package directory.
    pub output_dir: Utf8PathBuf,
}

/// An archive produced for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    /// The package's source directory.
    pub source_dir: Utf8PathBuf,
    /// `name version` of the package.
    pub label: String,
    /// The archive the tool produced.
    pub archive: Utf8PathBuf,
}

/// Result of building a batch of packages.
#[derive(Debug, Default)]
pub struct BuildOutcome {
    /// Archives produced, in build order.
    pub artifacts: Vec<BuildArtifact>,
    /// `name version` of packages skipped as already published.
    pub skipped: Vec<String>,
    /// Packages whose build failed.
    pub failures: Vec<StageFailure>,
}

/// Builds packages with the external package tool.
pub struct PackageBuilder<'a> {
    config: BuildConfig,
    executor: &'a dyn CommandExecutor,
    published: &'a PublishedVersions,
}

type Snapshot = BTreeMap<Utf8PathBuf, (Option<SystemTime>, u64)>;

impl<'a> PackageBuilder<'a> {
    /// Create a builder.
    ///
    /// `published` lists versions to skip; pass an empty set to build
    /// everything.
    #[must_use]
    pub fn new(
        config: BuildConfig,
        executor: &'a dyn CommandExecutor,
        published: &'a PublishedVersions,
    ) -> Self {
        Self {
            config,
            executor,
            published,
        }
    }

    /// Build every package that is not already published.
    ///
    /// A failing package is recorded and the rest of the batch continues.
    pub fn build_all(&self, packages: &[DiscoveredPackage]) -> BuildOutcome {
        let mut outcome = BuildOutcome::default();
        for package in packages {
            let label = package.label();
            let descriptor = &package.descriptor;
            if self
                .published
                .contains(descriptor.name.as_str(), &descriptor.version)
            {
                info!("skipping {label}: already published");
                outcome.skipped.push(label);
                continue;
            }

            match self.build(package) {
                Ok(artifact) => {
                    info!("built {label} -> {}", artifact.archive);
                    outcome.artifacts.push(artifact);
                }
                Err(reason) => {
                    warn!("build failed for {label}: {reason}");
                    outcome
                        .failures
                        .push(StageFailure::new(Stage::Build, label, reason));
                }
            }
        }
        outcome
    }

    /// Build one package regardless of the baseline.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the tool cannot be run, exits
    /// non-zero, or leaves no new archive behind.
    pub fn build(&self, package: &DiscoveredPackage) -> Result<BuildArtifact, String> {
        let output_dir = &self.config.output_dir;
        std::fs::create_dir_all(output_dir)
            .map_err(|e| format!("cannot create {output_dir}: {e}"))?;

        let before = snapshot(output_dir)?;
        let tool = &self.config.package_tool;
        debug!("running {tool} package build in {}", package.dir);
        run_checked(
            self.executor,
            tool,
            &[
                "package",
                "build",
                "--output-dir",
                output_dir.as_str(),
                "--override",
            ],
            Some(package.dir.as_path()),
        )?;
        let after = snapshot(output_dir)?;

        let archive = newest_change(&before, after)
            .ok_or_else(|| format!("{tool} produced no archive in {output_dir}"))?;
        Ok(BuildArtifact {
            source_dir: package.dir.clone(),
            label: package.label(),
            archive,
        })
    }
}

fn snapshot(dir: &Utf8Path) -> Result<Snapshot, String> {
    let entries = dir
        .read_dir_utf8()
        .map_err(|e| format!("cannot list {dir}: {e}"))?;
    let mut zips = Snapshot::new();
    for entry in entries {
        let entry = entry.map_err(|e| format!("cannot list {dir}: {e}"))?;
        if entry.path().extension() != Some("zip") {
            continue;
        }
        let metadata = entry
            .metadata()
            .map_err(|e| format!("cannot stat {}: {e}", entry.path()))?;
        if metadata.is_file() {
            zips.insert(
                entry.path().to_owned(),
                (metadata.modified().ok(), metadata.len()),
            );
        }
    }
    Ok(zips)
}

/// The archive added or rewritten between two snapshots, newest first.
fn newest_change(before: &Snapshot, after: Snapshot) -> Option<Utf8PathBuf> {
    let mut changed: Vec<(Utf8PathBuf, Option<SystemTime>)> = after
        .into_iter()
        .filter(|(path, stamp)| before.get(path) != Some(stamp))
        .map(|(path, (modified, _))| (path, modified))
        .collect();
    if changed.len() > 1 {
        warn!(
            "{} archives changed during one build; using the newest",
            changed.len()
        );
    }
    changed.sort_by_key(|(_, modified)| *modified);
    changed.pop().map(|(path, _)| path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PackageDescriptor;
    use crate::manifest::{Manifest, ManifestPackage, ManifestVersion};
    use crate::test_utils::{ExpectedCall, FakeTools, StubExecutor, failure_output, utf8_temp_dir};
    use std::fs;

    fn package(root: &Utf8Path, dir: &str, name: &str, version: &str) -> DiscoveredPackage {
        let path = root.join("packages").join(dir);
        fs::create_dir_all(&path).expect("mkdir");
        let text = format!("name: {name}\nversion: {version}\n");
        fs::write(path.join("package.yaml"), &text).expect("write descriptor");
        DiscoveredPackage {
            dir: path,
            descriptor: PackageDescriptor::parse(&text).expect("descriptor parses"),
        }
    }

    fn baseline(name: &str, version: &str) -> PublishedVersions {
        PublishedVersions::from_manifest(&Manifest {
            action_packages: vec![ManifestPackage {
                name: name.to_owned(),
                versions: vec![ManifestVersion {
                    version: version.to_owned(),
                    description: String::new(),
                    zip: String::new(),
                    icon: String::new(),
                    metadata: String::new(),
                    readme: None,
                    changelog: None,
                    actions: Vec::new(),
                    python_env_hash: None,
                    zip_hash: String::new(),
                }],
            }],
            total_hash: String::new(),
        })
    }

    fn config(root: &Utf8Path) -> BuildConfig {
        BuildConfig {
            package_tool: "action-server".to_owned(),
            output_dir: root.join("build"),
        }
    }

    #[test]
    fn baseline_versions_are_skipped_and_new_versions_built() {
        let (_temp, root) = utf8_temp_dir();
        let old = package(&root, "foo-old", "foo", "1.0.0");
        let new = package(&root, "foo-new", "foo", "1.1.0");
        let tools = FakeTools::new();
        let published = baseline("foo", "1.0.0");
        let builder = PackageBuilder::new(config(&root), &tools, &published);

        let outcome = builder.build_all(&[old, new]);

        assert_eq!(outcome.skipped, ["foo 1.0.0"]);
        assert_eq!(outcome.artifacts.len(), 1);
        assert_eq!(outcome.artifacts[0].label, "foo 1.1.0");
        assert_eq!(outcome.artifacts[0].archive, root.join("build/foo-new.zip"));
        assert!(outcome.failures.is_empty());
        assert_eq!(tools.count_calls("package build"), 1);
    }

    #[test]
    fn invokes_tool_inside_package_directory() {
        let (_temp, root) = utf8_temp_dir();
        let alpha = package(&root, "alpha", "alpha", "1.0.0");
        let output = root.join("build");
        let executor = StubExecutor::new(vec![
            ExpectedCall::new(
                "action-server",
                &[
                    "package",
                    "build",
                    "--output-dir",
                    output.as_str(),
                    "--override",
                ],
                Ok(failure_output("boom")),
            )
            .in_dir(alpha.dir.clone()),
        ]);
        let published = PublishedVersions::default();
        let builder = PackageBuilder::new(config(&root), &executor, &published);

        let reason = builder.build(&alpha).expect_err("tool fails");

        assert!(reason.contains("boom"));
        executor.assert_finished();
    }

    #[test]
    fn one_failing_package_does_not_block_others() {
        let (_temp, root) = utf8_temp_dir();
        let alpha = package(&root, "alpha", "alpha", "1.0.0");
        let broken = package(&root, "broken", "broken", "0.1.0");
        let beta = package(&root, "beta", "beta", "2.0.0");
        let tools = FakeTools::new().failing_build("broken");
        let published = PublishedVersions::default();
        let builder = PackageBuilder::new(config(&root), &tools, &published);

        let outcome = builder.build_all(&[alpha, broken, beta]);

        let built: Vec<&str> = outcome.artifacts.iter().map(|a| a.label.as_str()).collect();
        assert_eq!(built, ["alpha 1.0.0", "beta 2.0.0"]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].package, "broken 0.1.0");
        assert_eq!(outcome.failures[0].stage, Stage::Build);
    }

    #[test]
    fn successful_tool_without_archive_is_a_failure() {
        let (_temp, root) = utf8_temp_dir();
        let alpha = package(&root, "alpha", "alpha", "1.0.0");
        let output = root.join("build");
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "action-server",
            &[
                "package",
                "build",
                "--output-dir",
                output.as_str(),
                "--override",
            ],
            Ok(crate::test_utils::success_output()),
        )
        .in_dir(alpha.dir.clone())]);
        let published = PublishedVersions::default();
        let builder = PackageBuilder::new(config(&root), &executor, &published);

        let reason = builder.build(&alpha).expect_err("no archive");

        assert!(reason.contains("produced no archive"));
    }

    #[test]
    fn unchanged_archives_are_not_attributed() {
        let (_temp, root) = utf8_temp_dir();
        let build = root.join("build");
        fs::create_dir_all(&build).expect("mkdir");
        fs::write(build.join("old.zip"), b"old").expect("write");
        let before = snapshot(&build).expect("snapshot");
        fs::write(build.join("new.zip"), b"new").expect("write");
        let after = snapshot(&build).expect("snapshot");

        assert_eq!(newest_change(&before, after), Some(build.join("new.zip")));
    }
}
