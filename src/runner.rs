//! External process execution
//!
//! Every external tool the formula drives (configure, make, the installed
//! compiler) goes through a [`CommandRunner`], so the pipeline can be driven
//! by a recording runner in tests.

use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Environment adjustments for a build step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnv {
    /// Variables removed from the inherited environment
    pub remove: Vec<String>,
    /// Variables set for the step
    pub set: BTreeMap<String, String>,
}

impl BuildEnv {
    pub fn remove(mut self, var: impl Into<String>) -> Self {
        self.remove.push(var.into());
        self
    }

    pub fn set(mut self, var: impl Into<String>, value: impl Into<String>) -> Self {
        self.set.insert(var.into(), value.into());
        self
    }
}

/// A command to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: BuildEnv,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BuildEnv::default(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, env: BuildEnv) -> Self {
        self.env = env;
        self
    }

    /// Command line as a single string, for logs and error messages
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }
        for var in &self.env.remove {
            cmd.env_remove(var);
        }
        for (key, value) in &self.env.set {
            cmd.env(key, value);
        }
        cmd
    }
}

/// Result of running a command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` if terminated by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Turn a non-zero exit into an error
    pub fn check(self, command: &CommandSpec) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::process(command.display(), self.status, self.stderr))
        }
    }
}

/// Runs external commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run with inherited stdio so the tool's own output reaches the user
    async fn run(&self, command: &CommandSpec) -> Result<ProcessOutput>;

    /// Run and capture stdout and stderr
    async fn capture(&self, command: &CommandSpec) -> Result<ProcessOutput>;
}

/// Runs commands on the local machine
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, command: &CommandSpec) -> Result<ProcessOutput> {
        info!("Running: {}", command.display());

        let mut cmd = command.to_command();
        let status = cmd
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| Error::Other(format!("Failed to execute {}: {}", command.display(), e)))?;

        Ok(ProcessOutput {
            status: status.code(),
            ..Default::default()
        })
    }

    async fn capture(&self, command: &CommandSpec) -> Result<ProcessOutput> {
        debug!("Capturing: {}", command.display());

        let mut cmd = command.to_command();
        let output = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::Other(format!("Failed to execute {}: {}", command.display(), e)))?;

        Ok(ProcessOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Locate `make`, preferring an explicit path
pub fn find_make(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
    }

    which::which("gmake")
        .or_else(|_| which::which("make"))
        .map_err(|_| Error::Other("make not found in PATH".to_string()))
}
