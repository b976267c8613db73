//! Running the resolver process

use std::path::PathBuf;
use std::process::Command;

use crate::{Error, Result};

/// A fully prepared resolver invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub working_dir: PathBuf,
}

/// Captured result of a resolver run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Something that can execute a Composer invocation.
pub trait ComposerRunner {
    /// Run the invocation to completion.
    ///
    /// # Errors
    ///
    /// Returns an error only when the process could not be run at all; a
    /// nonzero exit is reported through [`RunOutput::code`].
    fn run(&self, invocation: &Invocation) -> Result<RunOutput>;
}

/// Runs the system `composer` binary.
#[derive(Debug, Clone)]
pub struct ComposerCli {
    binary: String,
}

impl ComposerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for ComposerCli {
    fn default() -> Self {
        Self::new("composer")
    }
}

impl ComposerRunner for ComposerCli {
    fn run(&self, invocation: &Invocation) -> Result<RunOutput> {
        tracing::debug!(binary = %self.binary, args = ?invocation.args, "Running composer");
        let output = Command::new(&self.binary)
            .args(&invocation.args)
            .arg(format!("--working-dir={}", invocation.working_dir.display()))
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&invocation.working_dir)
            .output()
            .map_err(|e| Error::Host {
                program: self.binary.clone(),
                message: e.to_string(),
            })?;

        Ok(RunOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
