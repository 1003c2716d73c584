//! Shared test utilities for the publisher crate.
//!
//! Available to unit tests and, behind the `test-support` feature, to
//! integration tests.

use crate::error::Result;
use crate::executor::CommandExecutor;
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    success_output_with_stdout("")
}

/// Creates a successful command `Output` carrying `stdout`.
#[must_use]
pub fn success_output_with_stdout(stdout: &str) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The command to execute (e.g., "action-server").
    pub cmd: String,
    /// The arguments to pass to the command.
    pub args: Vec<String>,
    /// The working directory, when the caller sets one.
    pub cwd: Option<Utf8PathBuf>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
}

impl ExpectedCall {
    /// Expect `cmd args...` with no working directory.
    #[must_use]
    pub fn new(cmd: &str, args: &[&str], result: Result<Output>) -> Self {
        Self {
            cmd: cmd.to_owned(),
            args: args.iter().map(|&arg| arg.to_owned()).collect(),
            cwd: None,
            result,
        }
    }

    /// Require the invocation to run inside `cwd`.
    #[must_use]
    pub fn in_dir(mut self, cwd: impl Into<Utf8PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify command execution without side effects.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str], cwd: Option<&Utf8Path>) -> Result<Output> {
        let mut expected = self.expected.borrow_mut();
        let Some(call) = expected.pop_front() else {
            return Err(crate::error::PublisherError::StubMismatch {
                message: format!("unexpected command invocation: {cmd} {}", args.join(" ")),
            });
        };

        assert_eq!(call.cmd, cmd);
        assert_eq!(call.args, args);
        assert_eq!(call.cwd.as_deref(), cwd);

        call.result
    }
}

/// Write a zip archive at `path` holding `entries` as `(name, contents)`.
///
/// # Panics
///
/// Panics if the archive cannot be written.
pub fn write_zip(path: &Utf8Path, entries: &[(&str, &str)]) {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let file = std::fs::File::create(path).expect("create archive");
    let mut writer = zip::ZipWriter::new(file);
    for (name, contents) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start zip entry");
        writer
            .write_all(contents.as_bytes())
            .expect("write zip entry");
    }
    writer.finish().expect("finish archive");
}

/// Create a temporary directory and return it with its UTF-8 path.
///
/// # Panics
///
/// Panics if the directory cannot be created or its path is not UTF-8.
#[must_use]
pub fn utf8_temp_dir() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().expect("temp dir");
    let path = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
    (temp, path)
}

/// A scripted stand-in for the package and environment tools.
///
/// - `package build --output-dir <dir> --override` zips the descriptor of
///   the working directory, with generated action metadata, into
///   `<dir>/<package-dir>.zip`.
/// - `ht hash <descriptor> --silent` prints a hash of the descriptor text.
/// - `ht prebuild <descriptor> --export <archive>` writes a placeholder
///   archive.
///
/// Every invocation is recorded as `cmd arg...`.
#[derive(Debug, Default)]
pub struct FakeTools {
    failing_builds: std::collections::BTreeSet<String>,
    failing_hashes: bool,
    calls: RefCell<Vec<String>>,
}

impl FakeTools {
    /// Create a fake where every invocation succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the build of the package in directory `dir_name` fail.
    #[must_use]
    pub fn failing_build(mut self, dir_name: &str) -> Self {
        self.failing_builds.insert(dir_name.to_owned());
        self
    }

    /// Make every `ht hash` invocation fail.
    #[must_use]
    pub fn failing_hashes(mut self) -> Self {
        self.failing_hashes = true;
        self
    }

    /// Return the recorded invocations.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Count recorded invocations containing `needle`.
    #[must_use]
    pub fn count_calls(&self, needle: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.contains(needle)).count()
    }

    fn build(&self, cwd: Option<&Utf8Path>, output_dir: &str) -> Result<Output> {
        let Some(dir) = cwd else {
            return Ok(failure_output("package build needs a working directory"));
        };
        let dir_name = dir.file_name().unwrap_or_default();
        if self.failing_builds.contains(dir_name) {
            return Ok(failure_output(&format!("cannot build {dir_name}")));
        }
        let descriptor = std::fs::read_to_string(dir.join("package.yaml"))?;
        let metadata = format!(
            r#"{{"openapi.json": {{"paths": {{"/api/actions/{dir_name}/run/run": {{"post": {{"summary": "Run {dir_name}"}}}}}}}}}}"#
        );
        let output_dir = Utf8Path::new(output_dir);
        std::fs::create_dir_all(output_dir)?;
        write_zip(
            &output_dir.join(format!("{dir_name}.zip")),
            &[
                ("package.yaml", descriptor.as_str()),
                ("__action_server_metadata__.json", metadata.as_str()),
            ],
        );
        Ok(success_output())
    }

    fn hash(&self, descriptor: &str) -> Result<Output> {
        if self.failing_hashes {
            return Ok(failure_output("environment could not be resolved"));
        }
        let text = std::fs::read(descriptor)?;
        let digest = crate::artefact::sha256_digest::Sha256Digest::of_bytes(&text);
        Ok(success_output_with_stdout(&format!("{}\n", &digest.as_str()[..16])))
    }
}

impl CommandExecutor for FakeTools {
    fn run(&self, cmd: &str, args: &[&str], cwd: Option<&Utf8Path>) -> Result<Output> {
        self.calls
            .borrow_mut()
            .push(format!("{cmd} {}", args.join(" ")));
        match args {
            ["package", "build", "--output-dir", output_dir, "--override"] => {
                self.build(cwd, output_dir)
            }
            ["ht", "hash", descriptor, "--silent"] => self.hash(descriptor),
            ["ht", "prebuild", _, "--export", archive] => {
                let archive = Utf8Path::new(archive);
                if let Some(parent) = archive.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(archive, b"environment")?;
                Ok(success_output())
            }
            _ => Ok(failure_output(&format!("unexpected invocation: {cmd}"))),
        }
    }
}
