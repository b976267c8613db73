//! Subprocess invocation of the system `git` binary.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Exit code and output of one git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOutput {
    /// Process exit code, `-1` when terminated by a signal.
    pub code: i32,
    /// Stdout split into lines, trailing newline removed.
    pub lines: Vec<String>,
    /// Raw stderr.
    pub stderr: String,
}

impl GitOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Stdout lines joined back together.
    pub fn stdout(&self) -> String {
        self.lines.join("\n")
    }

    fn from_raw(code: i32, stdout: &[u8], stderr: &[u8]) -> Self {
        let stdout = String::from_utf8_lossy(stdout);
        Self {
            code,
            lines: stdout.lines().map(str::to_string).collect(),
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }
}

/// Runs git commands inside one working tree.
#[derive(Debug, Clone)]
pub struct GitCommand {
    workdir: PathBuf,
    binary: PathBuf,
}

impl GitCommand {
    pub fn new(workdir: impl AsRef<Path>) -> Self {
        Self {
            workdir: workdir.as_ref().to_path_buf(),
            binary: PathBuf::from("git"),
        }
    }

    /// Use a specific git executable instead of the one on `PATH`.
    pub fn with_binary(mut self, binary: impl AsRef<Path>) -> Self {
        self.binary = binary.as_ref().to_path_buf();
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.current_dir(&self.workdir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C")
            .args(["-c", "core.quotepath=false"])
            .args(args);
        cmd
    }

    /// Run git and return its exit code and output.
    ///
    /// A nonzero exit code is not an error here; only failure to spawn is.
    pub fn run(&self, args: &[&str]) -> Result<GitOutput> {
        tracing::trace!(args = %args.join(" "), "git");
        let output = self.command(args).stdin(Stdio::null()).output()?;
        Ok(GitOutput::from_raw(
            output.status.code().unwrap_or(-1),
            &output.stdout,
            &output.stderr,
        ))
    }

    /// Run git and fail on a nonzero exit code.
    pub fn check(&self, args: &[&str]) -> Result<GitOutput> {
        let output = self.run(args)?;
        if output.success() {
            Ok(output)
        } else {
            Err(Error::CommandFailed {
                args: args.join(" "),
                code: output.code,
                stderr: output.stderr,
            })
        }
    }

    /// Run git, killing it if it has not exited after `timeout`.
    ///
    /// Used for network operations (fetch, push) so a hung remote cannot
    /// block the calling job indefinitely.
    pub fn run_with_timeout(&self, args: &[&str], timeout: Duration) -> Result<GitOutput> {
        tracing::trace!(args = %args.join(" "), ?timeout, "git (bounded)");
        let mut child = self
            .command(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout_reader = child.stdout.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                buf
            })
        });
        let stderr_reader = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                buf
            })
        });

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::Timeout {
                    args: args.join(" "),
                    timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout = stdout_reader
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        let stderr = stderr_reader
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        Ok(GitOutput::from_raw(status.code().unwrap_or(-1), &stdout, &stderr))
    }
}
