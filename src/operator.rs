//! The shell operator: validated command runs and background job tracking.

use std::path::PathBuf;
use std::sync::Mutex;

use futures_util::future::join_all;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, OperatorConfig};
use crate::error::ShellOperatorError;
use crate::execution::{
    Attachment, CommandSpec, ExecutionResult, OutputValidator, RunOutcome, ShellProcess,
};
use crate::journal::Journal;
use crate::paths;
use crate::Result;

/// Runs shell commands, checking declared inputs before and outputs after.
///
/// `run` and `wait` take `&self` and may be called from several tasks or
/// threads; the tracked background handles sit behind a mutex that is
/// never held across an await.
#[derive(Debug)]
pub struct ShellOperator {
    config: OperatorConfig,
    journal: Journal,
    tracked: Mutex<Vec<AsyncHandle>>,
}

/// A spawned background command awaiting `wait`.
#[derive(Debug)]
struct AsyncHandle {
    process: ShellProcess,
    expected: Expectations,
}

impl AsyncHandle {
    async fn finish(self) -> Result<ExecutionResult> {
        let result = self.process.join().await?;
        self.expected.verify(result)
    }
}

/// Post-completion checks shared by synchronous and background runs.
#[derive(Debug)]
struct Expectations {
    outputs: Vec<PathBuf>,
    validator: Option<OutputValidator>,
    remove_if_failed: bool,
}

impl Expectations {
    fn from_spec(spec: &CommandSpec) -> Self {
        Self {
            outputs: spec.outputs.clone(),
            validator: spec.output_validator.clone(),
            remove_if_failed: spec.remove_if_failed,
        }
    }

    fn verify(&self, result: ExecutionResult) -> Result<ExecutionResult> {
        if !result.success() {
            error!(
                command = %result.command,
                exit_code = ?result.exit_code,
                "command returned non-zero exit status"
            );
            self.discard(&self.outputs);
            return Err(ShellOperatorError::CommandFailed {
                command: result.command,
                exit_code: result.exit_code,
                stdout: result.stdout,
                stderr: result.stderr,
            });
        }

        if self.outputs.is_empty() {
            return Ok(result);
        }

        let missing = paths::missing(&self.outputs);
        if !missing.is_empty() {
            let found: Vec<PathBuf> = self
                .outputs
                .iter()
                .filter(|p| !missing.contains(*p))
                .cloned()
                .collect();
            self.discard(&found);
            return Err(ShellOperatorError::OutputNotFound {
                command: result.command,
                paths: missing,
            });
        }

        if let Some(ref validator) = self.validator {
            let rejected: Vec<PathBuf> = self
                .outputs
                .iter()
                .filter(|p| !validator.accepts(p))
                .cloned()
                .collect();
            if !rejected.is_empty() {
                self.discard(&self.outputs);
                return Err(ShellOperatorError::OutputNotValidated {
                    command: result.command,
                    paths: rejected,
                });
            }
        }

        debug!(outputs = ?self.outputs, "outputs validated");
        Ok(result)
    }

    fn discard(&self, outputs: &[PathBuf]) {
        if !self.remove_if_failed || outputs.is_empty() {
            return;
        }
        if let Err(e) = paths::remove_all(outputs) {
            warn!(error = %e, "failed to remove outputs of failed command");
        }
    }
}

impl ShellOperator {
    /// Create an operator.
    ///
    /// Fails with a configuration error if the executable is empty, the
    /// log file's directory does not exist, or the log file cannot be
    /// truncated. Truncates the log file when `clear_log` is set.
    pub fn new(config: OperatorConfig) -> Result<Self> {
        config.validate()?;

        let journal = Journal::new(config.log_file.clone());
        if config.clear_log {
            journal.clear().map_err(|source| ConfigError::LogFile {
                path: config.log_file.clone().unwrap_or_default(),
                source,
            })?;
            debug!(path = ?journal.path(), "command log cleared");
        }

        Ok(Self {
            config,
            journal,
            tracked: Mutex::new(Vec::new()),
        })
    }

    /// Configuration this operator was built with.
    pub fn config(&self) -> &OperatorConfig {
        &self.config
    }

    /// Number of background commands not yet reaped by `wait`.
    pub fn pending(&self) -> Result<usize> {
        let tracked = self
            .tracked
            .lock()
            .map_err(|_| ShellOperatorError::LockPoisoned)?;
        Ok(tracked.len())
    }

    /// Run a command.
    ///
    /// Synchronous specs resolve once the shell exits and its outputs are
    /// verified. Asynchronous specs resolve as soon as the shell is spawned;
    /// their checks happen in [`wait`](Self::wait).
    pub async fn run(&self, spec: impl Into<CommandSpec>) -> Result<RunOutcome> {
        let spec = spec.into();

        debug!(inputs = ?spec.inputs, outputs = ?spec.outputs, "checking declared paths");

        let missing = paths::missing(&spec.inputs);
        if !missing.is_empty() {
            return Err(ShellOperatorError::InputNotFound { paths: missing });
        }

        if spec.skip_if_exist && paths::all_exist(&spec.outputs) {
            debug!(commands = ?spec.commands, "outputs exist; command skipped");
            return Ok(RunOutcome::Skipped);
        }

        if spec.remove_previous_outputs {
            paths::remove_all(&spec.outputs)?;
        }

        self.announce(&spec).await;

        let attachment = if spec.asynchronous {
            Attachment::Background
        } else {
            Attachment::Foreground {
                echo: !self.config.quiet,
            }
        };
        let process =
            ShellProcess::spawn(&self.config.executable, &spec, attachment, &self.journal)?;
        let expected = Expectations::from_spec(&spec);

        if spec.asynchronous {
            let pid = process.id();
            let pending = self.track(AsyncHandle { process, expected })?;
            debug!(pid = ?pid, pending, "background command tracked");
            return Ok(RunOutcome::Spawned { pid });
        }

        let result = process.join().await?;
        expected.verify(result).map(RunOutcome::Completed)
    }

    /// Wait for every tracked background command.
    ///
    /// All commands run to completion before anything is reported. Returns
    /// the results in spawn order, or every failure at once as
    /// [`ShellOperatorError::BackgroundFailed`]. The tracked set is empty
    /// afterwards either way.
    pub async fn wait(&self) -> Result<Vec<ExecutionResult>> {
        let handles = {
            let mut tracked = self
                .tracked
                .lock()
                .map_err(|_| ShellOperatorError::LockPoisoned)?;
            std::mem::take(&mut *tracked)
        };

        if handles.is_empty() {
            debug!("no background commands to wait for");
            return Ok(Vec::new());
        }

        info!(count = handles.len(), "waiting for background commands");

        let mut results = Vec::with_capacity(handles.len());
        let mut failures = Vec::new();
        for settled in join_all(handles.into_iter().map(AsyncHandle::finish)).await {
            match settled {
                Ok(result) => results.push(result),
                Err(e) => failures.push(e),
            }
        }

        if failures.is_empty() {
            Ok(results)
        } else {
            Err(ShellOperatorError::BackgroundFailed(failures))
        }
    }

    fn track(&self, handle: AsyncHandle) -> Result<usize> {
        let mut tracked = self
            .tracked
            .lock()
            .map_err(|_| ShellOperatorError::LockPoisoned)?;
        tracked.push(handle);
        Ok(tracked.len())
    }

    /// Print and journal each command line with its prompt.
    async fn announce(&self, spec: &CommandSpec) {
        let prompt = match spec.prompt {
            Some(ref prompt) => prompt.clone(),
            None => {
                let cwd = spec
                    .working_dir
                    .clone()
                    .or_else(|| std::env::current_dir().ok())
                    .unwrap_or_else(|| PathBuf::from("."));
                format!("[{}] $ ", cwd.display())
            }
        };

        for command in &spec.commands {
            let line = format!("{prompt}{command}");
            info!(executable = %self.config.executable.display(), "{line}");
            if self.config.print_command {
                println!("{line}");
            }
            if self.journal.is_enabled() {
                self.journal.line(&line).await;
            }
        }
    }
}
