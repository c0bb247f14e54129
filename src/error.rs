//! Error types for the formula configurator

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for formula operations
pub type Result<T> = std::result::Result<T, Error>;

/// Formula errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Unsupported host: {0}")]
    UnsupportedHost(String),

    #[error("Command failed: {command} (exit status {status}){}", diagnostic(.stderr))]
    ExternalProcessFailure {
        command: String,
        status: i32,
        /// The tool's own stderr, when it was captured
        stderr: String,
    },

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Incompatible host compiler: {0}")]
    IncompatibleCompiler(String),

    #[error("Patch failed for {path}: {message}")]
    PatchFailed { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Walk directory error: {0}")]
    WalkDirError(#[from] walkdir::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn process(
        command: impl Into<String>,
        status: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        Error::ExternalProcessFailure {
            command: command.into(),
            status: status.unwrap_or(-1),
            stderr: stderr.into(),
        }
    }
}

fn diagnostic(stderr: &str) -> String {
    let stderr = stderr.trim_end();
    if stderr.is_empty() {
        String::new()
    } else {
        format!("\n{}", stderr)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
