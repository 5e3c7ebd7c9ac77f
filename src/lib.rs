//! # shell-operator
//!
//! Run shell commands with declared inputs and outputs.
//!
//! A [`ShellOperator`] launches `<shell> -c <script>` for each
//! [`CommandSpec`], checking that declared inputs exist before spawning and
//! that declared outputs exist after a successful exit. Commands can run in
//! the foreground, or in the background and be collected later with
//! [`ShellOperator::wait`].
//!
//! ## Features
//!
//! - **One session per run**: several command lines share shell variables and `cd`
//! - **Path contracts**: missing inputs fail before spawning, missing outputs after
//! - **Background jobs**: spawn now, validate everything in one `wait`
//! - **Command journal**: optional append-only log of commands and their output
//!
//! ## Quick Start
//!
//! ```no_run
//! use shell_operator::{CommandSpec, OperatorConfig, ShellOperator};
//!
//! #[tokio::main]
//! async fn main() -> shell_operator::Result<()> {
//!     shell_operator::logging::try_init().ok();
//!
//!     let operator = ShellOperator::new(OperatorConfig::default().log_file("commands.log"))?;
//!
//!     operator
//!         .run(
//!             CommandSpec::new("sort a.txt b.txt | tee sorted.txt")
//!                 .inputs(["a.txt", "b.txt"])
//!                 .output("sorted.txt"),
//!         )
//!         .await?;
//!
//!     operator.run(CommandSpec::new("gzip -k sorted.txt").asynchronous(true)).await?;
//!     operator.wait().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod execution;
pub mod journal;
pub mod logging;
pub mod operator;
pub mod paths;

// Re-export commonly used types
pub use config::{ConfigError, OperatorConfig};
pub use error::{Result, ShellOperatorError};
pub use execution::{CommandSpec, ExecutionResult, OutputValidator, RunOutcome};
pub use operator::ShellOperator;
