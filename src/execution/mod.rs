//! Command execution layer.
//!
//! This module provides:
//! - [`CommandSpec`]: what to run and which paths it reads and writes
//! - [`ShellProcess`]: one `<shell> -c <script>` child with output capture
//! - [`ExecutionResult`] / [`RunOutcome`]: what a run produced
//!
//! # Example
//!
//! ```
//! use shell_operator::execution::CommandSpec;
//!
//! let spec = CommandSpec::lines(["a=1", "echo $a"])
//!     .output("sorted.txt")
//!     .remove_previous_outputs(true);
//! assert_eq!(spec.script(), "{ a=1\n} && { echo $a\n}");
//! ```

mod command;
mod process;
mod result;

pub use command::{CommandSpec, OutputValidator};
pub use process::{Attachment, ShellProcess};
pub use result::{ExecutionResult, RunOutcome};
