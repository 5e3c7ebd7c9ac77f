//! Shell process spawning and output collection.

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::debug;

use super::command::CommandSpec;
use super::result::ExecutionResult;
use crate::error::ShellOperatorError;
use crate::journal::Journal;
use crate::Result;

/// Buffer size for reading child output.
const READ_BUFFER_SIZE: usize = 4096;

/// How long output is still collected after the shell itself has exited.
///
/// A descendant left running in the background (`cmd &`) inherits the
/// pipes and keeps them open; collection stops at this deadline instead of
/// at EOF.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// How a spawned shell is attached to the caller's terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    /// Caller waits for it: stdin is inherited, output optionally echoed.
    Foreground {
        /// Echo stdout/stderr to the caller's streams while capturing.
        echo: bool,
    },
    /// Runs unattended: no stdin, output only captured and journaled.
    Background,
}

/// A running `<shell> -c <script>` process with its output collectors.
#[derive(Debug)]
pub struct ShellProcess {
    script: String,
    child: Child,
    stdout: Collector,
    stderr: Collector,
    started: Instant,
}

impl ShellProcess {
    /// Spawn the shell for `spec`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        executable: &Path,
        spec: &CommandSpec,
        attachment: Attachment,
        journal: &Journal,
    ) -> Result<Self> {
        let script = spec.script();

        let mut cmd = Command::new(executable);
        cmd.arg("-c").arg(&script);

        if let Some(ref dir) = spec.working_dir {
            cmd.current_dir(dir);
        }
        if spec.env_clear {
            cmd.env_clear();
        }
        for key in &spec.env_remove {
            cmd.env_remove(key);
        }
        cmd.envs(&spec.env);

        let (stdin, echo) = match attachment {
            Attachment::Foreground { echo } => (Stdio::inherit(), echo),
            Attachment::Background => (Stdio::null(), false),
        };
        cmd.stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|source| ShellOperatorError::Spawn {
            executable: executable.to_path_buf(),
            source,
        })?;
        let started = Instant::now();

        debug!(pid = ?child.id(), executable = %executable.display(), "shell spawned");

        let stdout = collect(
            child.stdout.take(),
            echo.then(tokio::io::stdout),
            journal.clone(),
        );
        let stderr = collect(
            child.stderr.take(),
            echo.then(tokio::io::stderr),
            journal.clone(),
        );

        Ok(Self {
            script,
            child,
            stdout,
            stderr,
            started,
        })
    }

    /// OS process id, while the process has not been reaped.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for the process to exit and gather its output.
    ///
    /// Resolves once the shell exits; output still arriving from background
    /// descendants is collected only briefly afterwards.
    pub async fn join(mut self) -> Result<ExecutionResult> {
        let status = self.child.wait().await?;
        let duration = self.started.elapsed();

        let deadline = tokio::time::Instant::now() + DRAIN_GRACE;
        let stdout = self.stdout.finish(deadline).await?;
        let stderr = self.stderr.finish(deadline).await?;

        debug!(script = %self.script, status = %status, "shell exited");

        Ok(ExecutionResult {
            command: self.script,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code: status.code(),
            duration,
        })
    }
}

/// Background task draining one output pipe into a shared buffer.
#[derive(Debug)]
struct Collector {
    task: JoinHandle<io::Result<()>>,
    captured: Arc<Mutex<Vec<u8>>>,
}

impl Collector {
    /// Wait for EOF until `deadline`, then stop the task and return
    /// everything captured so far.
    async fn finish(mut self, deadline: tokio::time::Instant) -> io::Result<Vec<u8>> {
        match tokio::time::timeout_at(deadline, &mut self.task).await {
            Ok(joined) => joined.map_err(io::Error::other)??,
            Err(_) => {
                self.task.abort();
                debug!("pipe held open by a background descendant; stopped collecting");
            }
        }

        let mut captured = self
            .captured
            .lock()
            .map_err(|_| io::Error::other("output buffer lock poisoned"))?;
        Ok(std::mem::take(&mut *captured))
    }
}

fn collect<R, W>(reader: Option<R>, echo: Option<W>, journal: Journal) -> Collector
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let captured = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&captured);
    let task = tokio::spawn(async move {
        match reader {
            Some(reader) => drain(reader, echo, journal, sink).await,
            None => Ok(()),
        }
    });
    Collector { task, captured }
}

/// Read `reader` to EOF, teeing each chunk to `echo` and the journal.
async fn drain<R, W>(
    mut reader: R,
    mut echo: Option<W>,
    journal: Journal,
    captured: Arc<Mutex<Vec<u8>>>,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = [0u8; READ_BUFFER_SIZE];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        let chunk = &buf[..n];
        captured
            .lock()
            .map_err(|_| io::Error::other("output buffer lock poisoned"))?
            .extend_from_slice(chunk);

        // A closed terminal stops echoing but not capturing.
        let echo_failed = match echo.as_mut() {
            Some(out) => out.write_all(chunk).await.is_err() || out.flush().await.is_err(),
            None => false,
        };
        if echo_failed {
            echo = None;
        }

        journal.append(chunk).await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sh() -> &'static Path {
        Path::new("/bin/sh")
    }

    #[tokio::test]
    async fn test_join_captures_both_streams() {
        let spec = CommandSpec::new("echo out; echo err >&2");
        let process =
            ShellProcess::spawn(sh(), &spec, Attachment::Background, &Journal::default()).unwrap();
        let result = process.join().await.unwrap();

        assert!(result.success());
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "err\n");
        assert_eq!(result.command, "echo out; echo err >&2");
    }

    #[tokio::test]
    async fn test_exit_code_is_reported() {
        let spec = CommandSpec::new("exit 7");
        let process =
            ShellProcess::spawn(sh(), &spec, Attachment::Background, &Journal::default()).unwrap();
        let result = process.join().await.unwrap();
        assert_eq!(result.exit_code, Some(7));
    }

    #[tokio::test]
    async fn test_working_dir_and_env() {
        let dir = tempdir().unwrap();
        let spec = CommandSpec::new("pwd; echo $GREETING")
            .working_dir(dir.path())
            .env("GREETING", "hi");
        let process =
            ShellProcess::spawn(sh(), &spec, Attachment::Background, &Journal::default()).unwrap();
        let result = process.join().await.unwrap();

        let lines: Vec<_> = result.output_lines().collect();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(
            Path::new(lines[0]).canonicalize().unwrap(),
            expected
        );
        assert_eq!(lines[1], "hi");
    }

    #[tokio::test]
    async fn test_output_is_journaled() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("run.log");
        let journal = Journal::new(Some(log.clone()));

        let spec = CommandSpec::new("echo logged");
        let process = ShellProcess::spawn(sh(), &spec, Attachment::Background, &journal).unwrap();
        process.join().await.unwrap();

        assert_eq!(std::fs::read_to_string(log).unwrap(), "logged\n");
    }

    #[tokio::test]
    async fn test_join_does_not_wait_for_background_descendants() {
        let spec = CommandSpec::new("echo started; sleep 5 &");
        let process =
            ShellProcess::spawn(sh(), &spec, Attachment::Background, &Journal::default()).unwrap();

        let start = Instant::now();
        let result = process.join().await.unwrap();

        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(result.success());
        assert_eq!(result.stdout, "started\n");
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let spec = CommandSpec::new("true");
        let result = ShellProcess::spawn(
            Path::new("/nonexistent/shell"),
            &spec,
            Attachment::Background,
            &Journal::default(),
        );
        assert!(matches!(result, Err(ShellOperatorError::Spawn { .. })));
    }
}
