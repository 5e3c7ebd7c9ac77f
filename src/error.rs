//! Error types for shell-operator.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Main error type for shell-operator operations.
#[derive(Error, Debug)]
pub enum ShellOperatorError {
    /// Invalid construction parameters.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// One or more declared inputs were absent before execution.
    #[error("input not found: {}", join_paths(.paths))]
    InputNotFound {
        /// Every missing input, in declaration order.
        paths: Vec<PathBuf>,
    },

    /// The shell process exited with a non-zero status.
    #[error("command `{command}` {}", describe_exit(.exit_code))]
    CommandFailed {
        /// Script passed to the shell.
        command: String,
        /// Exit code, or `None` if the process was killed by a signal.
        exit_code: Option<i32>,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },

    /// The process succeeded but declared outputs are missing.
    #[error("output not found after `{command}`: {}", join_paths(.paths))]
    OutputNotFound {
        /// Script passed to the shell.
        command: String,
        /// Every missing output, in declaration order.
        paths: Vec<PathBuf>,
    },

    /// The output validator rejected one or more outputs.
    #[error("output not validated after `{command}`: {}", join_paths(.paths))]
    OutputNotValidated {
        /// Script passed to the shell.
        command: String,
        /// Every rejected output, in declaration order.
        paths: Vec<PathBuf>,
    },

    /// The shell executable could not be started.
    #[error("failed to spawn `{}`: {source}", .executable.display())]
    Spawn {
        /// Configured shell executable.
        executable: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// One or more background commands failed; collected by `wait`.
    #[error("{}", describe_background(.0))]
    BackgroundFailed(Vec<ShellOperatorError>),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShellOperatorError {
    /// Individual failures, flattening a [`ShellOperatorError::BackgroundFailed`].
    pub fn failures(&self) -> Vec<&ShellOperatorError> {
        match self {
            Self::BackgroundFailed(errors) => errors.iter().collect(),
            other => vec![other],
        }
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_background(errors: &[ShellOperatorError]) -> String {
    let details = errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    format!("{} background command(s) failed: {details}", errors.len())
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("returned non-zero exit status {code}"),
        None => "was terminated by a signal".to_string(),
    }
}

/// Convenience Result type for shell-operator operations.
pub type Result<T> = std::result::Result<T, ShellOperatorError>;
