//! External tool invocation.
//!
//! Every stage that shells out (the package build tool, the environment
//! hash and prebuild tool) goes through [`CommandExecutor`] so that tests can
//! substitute a stub instead of spawning real executables. Invocations are
//! single-shot: nothing here retries or times out.

use crate::error::{PublisherError, Result};
use camino::Utf8Path;
use std::process::{Command, Output};

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs `cmd` with `args`, optionally inside `cwd`, and returns the
    /// captured output.
    ///
    /// A non-zero exit status is *not* an error at this level; callers
    /// inspect `output.status`.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or running the command.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gallery_publisher::executor::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor;
    /// let output = executor.run("action-server", &["--version"], None)?;
    /// assert!(output.status.success());
    /// # Ok::<(), gallery_publisher::error::PublisherError>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str], cwd: Option<&Utf8Path>) -> Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str], cwd: Option<&Utf8Path>) -> Result<Output> {
        let mut command = Command::new(cmd);
        command.args(args);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        command.output().map_err(PublisherError::from)
    }
}

/// Runs a command and turns a spawn error or non-zero exit into a
/// human-readable reason.
///
/// On success the captured stdout is returned.
pub(crate) fn run_checked(
    executor: &dyn CommandExecutor,
    cmd: &str,
    args: &[&str],
    cwd: Option<&Utf8Path>,
) -> std::result::Result<Vec<u8>, String> {
    let output = executor
        .run(cmd, args, cwd)
        .map_err(|e| format!("could not run {cmd}: {e}"))?;

    if output.status.success() {
        return Ok(output.stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let detail = stderr.trim();
    let status = output
        .status
        .code()
        .map_or_else(|| "a signal".to_owned(), |code| format!("exit code {code}"));
    if detail.is_empty() {
        Err(format!("{cmd} failed with {status}"))
    } else {
        Err(format!("{cmd} failed with {status}: {detail}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ExpectedCall, StubExecutor, failure_output, success_output_with_stdout};

    #[test]
    fn run_checked_returns_stdout_on_success() {
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "rcc",
            &["ht", "hash", "package.yaml", "--silent"],
            Ok(success_output_with_stdout("abc123\n")),
        )]);

        let stdout = run_checked(
            &executor,
            "rcc",
            &["ht", "hash", "package.yaml", "--silent"],
            None,
        )
        .expect("command should succeed");

        assert_eq!(stdout, b"abc123\n");
        executor.assert_finished();
    }

    #[test]
    fn run_checked_reports_exit_code_and_stderr() {
        let executor = StubExecutor::new(vec![
            ExpectedCall::new(
                "action-server",
                &["package", "build"],
                Ok(failure_output("missing package.yaml")),
            )
            .in_dir("/pkgs/alpha"),
        ]);

        let reason = run_checked(
            &executor,
            "action-server",
            &["package", "build"],
            Some(Utf8Path::new("/pkgs/alpha")),
        )
        .expect_err("command should fail");

        assert!(reason.contains("exit code 1"));
        assert!(reason.contains("missing package.yaml"));
    }

    #[test]
    fn run_checked_reports_spawn_errors() {
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "rcc",
            &["--version"],
            Err(PublisherError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "not found",
            ))),
        )]);

        let reason =
            run_checked(&executor, "rcc", &["--version"], None).expect_err("spawn should fail");

        assert!(reason.starts_with("could not run rcc"));
    }

    #[test]
    fn run_checked_without_stderr_reports_status_only() {
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "rcc",
            &["--version"],
            Ok(failure_output("")),
        )]);

        let reason =
            run_checked(&executor, "rcc", &["--version"], None).expect_err("command should fail");

        assert_eq!(reason, "rcc failed with exit code 1");
    }
}
