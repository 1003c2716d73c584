//! Test support utilities for publisher behavioural tests.
//!
//! Provides a scratch package tree and a probe that answers without network
//! access. Tool invocations are faked with
//! [`gallery_publisher::test_utils::FakeTools`].

use camino::{Utf8Path, Utf8PathBuf};
use gallery_publisher::config::PublisherConfig;
use gallery_publisher::environment::Platform;
use gallery_publisher::environment::probe::{ProbeError, RemoteProbe};
use gallery_publisher::test_utils::utf8_temp_dir;
use std::cell::RefCell;
use tempfile::TempDir;

/// A probe that reports every URL as present or absent.
pub struct StaticProbe {
    present: bool,
    checked: RefCell<Vec<String>>,
}

impl StaticProbe {
    /// A probe for a store that holds nothing yet.
    pub fn empty_store() -> Self {
        Self {
            present: false,
            checked: RefCell::new(Vec::new()),
        }
    }

    /// The URLs checked so far.
    pub fn checked(&self) -> Vec<String> {
        self.checked.borrow().clone()
    }
}

impl RemoteProbe for StaticProbe {
    fn exists(&self, url: &str) -> Result<bool, ProbeError> {
        self.checked.borrow_mut().push(url.to_owned());
        Ok(self.present)
    }
}

/// A scratch directory with an empty package root and output directory.
pub struct ScratchTree {
    _temp: TempDir,
    /// Root of the scratch directory.
    pub root: Utf8PathBuf,
    /// Configuration pointing at the scratch directories.
    pub config: PublisherConfig,
}

impl ScratchTree {
    /// Create the tree.
    pub fn new() -> Self {
        let (temp, root) = utf8_temp_dir();
        let input_dir = root.join("actions");
        std::fs::create_dir_all(&input_dir).expect("create package root");
        let config = PublisherConfig {
            input_dir,
            output_dir: root.join("dist"),
            platform: Platform {
                os: "linux".to_owned(),
                arch: "x86_64".to_owned(),
            },
            ..PublisherConfig::default()
        };
        Self {
            _temp: temp,
            root,
            config,
        }
    }

    /// Write a package directory holding a minimal descriptor.
    pub fn add_package(&self, dir: &str, name: &str, version: &str) -> Utf8PathBuf {
        let path = self.config.input_dir.join(dir);
        std::fs::create_dir_all(&path).expect("create package directory");
        write_descriptor(&path, name, version);
        path
    }
}

/// Write `package.yaml` for `name` at `version` into `dir`.
pub fn write_descriptor(dir: &Utf8Path, name: &str, version: &str) {
    std::fs::write(
        dir.join("package.yaml"),
        format!("name: {name}\nversion: {version}\ndescription: {name} actions\n"),
    )
    .expect("write descriptor");
}
