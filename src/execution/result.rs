//! Execution result types.

use std::time::Duration;

/// Result of a completed shell invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    /// Script passed to the shell.
    pub command: String,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
    /// Exit code; `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Wall time from spawn to exit.
    pub duration: Duration,
}

impl ExecutionResult {
    /// Check if command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Get stdout, trimmed.
    pub fn output_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// Get stdout lines.
    pub fn output_lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines()
    }
}

/// What a call to [`ShellOperator::run`](crate::ShellOperator::run) did.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Synchronous run finished and passed validation.
    Completed(ExecutionResult),
    /// Asynchronous run was spawned and is now tracked until `wait`.
    Spawned {
        /// OS process id, if still available.
        pid: Option<u32>,
    },
    /// Every declared output already existed and `skip_if_exist` was set.
    Skipped,
}

impl RunOutcome {
    /// The result of a completed synchronous run.
    pub fn completed(self) -> Option<ExecutionResult> {
        match self {
            Self::Completed(result) => Some(result),
            _ => None,
        }
    }

    /// Whether the run was skipped.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// Whether the run was handed off to the background.
    pub fn is_spawned(&self) -> bool {
        matches!(self, Self::Spawned { .. })
    }
}
