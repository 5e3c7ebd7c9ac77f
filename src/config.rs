//! Operator configuration.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file (JSON)
//! 3. Default values
//!
//! Unknown keys in a configuration file are rejected.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shell used when none is configured.
pub const DEFAULT_EXECUTABLE: &str = "/bin/sh";

/// Settings shared by every command a [`ShellOperator`](crate::ShellOperator) runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OperatorConfig {
    /// Shell invoked as `<executable> -c <script>`.
    pub executable: PathBuf,
    /// Plain-text journal of executed commands and their output.
    pub log_file: Option<PathBuf>,
    /// Do not echo synchronous command output to the terminal.
    pub quiet: bool,
    /// Echo each command line to stdout before running it.
    pub print_command: bool,
    /// Truncate `log_file` when the operator is constructed.
    pub clear_log: bool,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
            log_file: None,
            quiet: false,
            print_command: true,
            clear_log: false,
        }
    }
}

impl OperatorConfig {
    /// Set the shell executable.
    pub fn executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Set the log file.
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Set quiet mode.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Set whether command lines are echoed before execution.
    pub fn print_command(mut self, print: bool) -> Self {
        self.print_command = print;
        self
    }

    /// Set whether the log file is truncated on construction.
    pub fn clear_log(mut self, clear: bool) -> Self {
        self.clear_log = clear;
        self
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply `SHELL_OPERATOR_*` environment variable overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(executable) = lookup("SHELL_OPERATOR_EXECUTABLE") {
            self.executable = PathBuf::from(executable);
        }

        if let Some(log_file) = lookup("SHELL_OPERATOR_LOG_FILE") {
            self.log_file = if log_file.is_empty() {
                None
            } else {
                Some(PathBuf::from(log_file))
            };
        }

        if let Some(value) = lookup("SHELL_OPERATOR_QUIET") {
            self.quiet = parse_flag("SHELL_OPERATOR_QUIET", &value)?;
        }

        if let Some(value) = lookup("SHELL_OPERATOR_PRINT_COMMAND") {
            self.print_command = parse_flag("SHELL_OPERATOR_PRINT_COMMAND", &value)?;
        }

        if let Some(value) = lookup("SHELL_OPERATOR_CLEAR_LOG") {
            self.clear_log = parse_flag("SHELL_OPERATOR_CLEAR_LOG", &value)?;
        }

        Ok(())
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: env vars > config file > defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env()?;
        config.validate()?;

        Ok(config)
    }

    /// Check that the configuration can be used to build an operator.
    ///
    /// The log file's parent directory must already exist; it is never
    /// created implicitly.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.executable.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("executable is empty".to_string()));
        }

        if let Some(ref log_file) = self.log_file {
            if log_file.is_dir() {
                return Err(ConfigError::Invalid(format!(
                    "log file {} is a directory",
                    log_file.display()
                )));
            }

            if let Some(parent) = log_file.parent() {
                if !parent.as_os_str().is_empty() && !parent.is_dir() {
                    return Err(ConfigError::Invalid(format!(
                        "log directory {} does not exist",
                        parent.display()
                    )));
                }
            }
        }

        Ok(())
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue(name, value.to_string())),
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("failed to read config file: {0}")]
    Io(#[source] std::io::Error),
    /// JSON parsing error, including unknown keys.
    #[error("failed to parse config file: {0}")]
    Json(#[source] serde_json::Error),
    /// Environment variable with an unusable value.
    #[error("invalid value for {0}: '{1}'")]
    InvalidValue(&'static str, String),
    /// Settings that cannot produce a working operator.
    #[error("{0}")]
    Invalid(String),
    /// The log file exists in name only: it cannot be created or truncated.
    #[error("unusable log file {}: {source}", .path.display())]
    LogFile {
        /// Configured log file.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}
