//! Command specification.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Predicate applied to each declared output once it exists.
#[derive(Clone)]
pub struct OutputValidator(Arc<dyn Fn(&Path) -> bool + Send + Sync>);

impl OutputValidator {
    /// Wrap a predicate.
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&Path) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(check))
    }

    /// Whether `path` is acceptable.
    pub fn accepts(&self, path: &Path) -> bool {
        (self.0)(path)
    }
}

impl fmt::Debug for OutputValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OutputValidator(..)")
    }
}

/// What to run, which paths it depends on, and how to run it.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Command lines, run in order within one shell session.
    pub commands: Vec<String>,
    /// Working directory override (if any).
    pub working_dir: Option<PathBuf>,
    /// Paths that must exist before the shell is spawned.
    pub inputs: Vec<PathBuf>,
    /// Paths that must exist once the shell exits successfully.
    pub outputs: Vec<PathBuf>,
    /// Extra acceptance check applied to every output.
    pub output_validator: Option<OutputValidator>,
    /// Delete existing outputs before spawning.
    pub remove_previous_outputs: bool,
    /// Delete outputs when the command or output validation fails.
    pub remove_if_failed: bool,
    /// Do not run at all if every declared output already exists.
    pub skip_if_exist: bool,
    /// Return immediately and defer completion checks to `wait`.
    pub asynchronous: bool,
    /// Prompt printed before each command line; defaults to `[<cwd>] $ `.
    pub prompt: Option<String>,
    /// Environment variables to set.
    pub env: HashMap<String, String>,
    /// Environment variables to remove.
    pub env_remove: Vec<String>,
    /// Start from an empty environment instead of inheriting the caller's.
    pub env_clear: bool,
}

impl CommandSpec {
    /// Create a spec for a single command line.
    pub fn new(command: impl Into<String>) -> Self {
        Self::lines([command])
    }

    /// Create a spec for several command lines sharing one shell session.
    pub fn lines<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
            working_dir: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            output_validator: None,
            remove_previous_outputs: false,
            remove_if_failed: true,
            skip_if_exist: false,
            asynchronous: false,
            prompt: None,
            env: HashMap::new(),
            env_remove: Vec::new(),
            env_clear: false,
        }
    }

    /// Append another command line.
    pub fn then(mut self, command: impl Into<String>) -> Self {
        self.commands.push(command.into());
        self
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Declare an input path.
    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.inputs.push(path.into());
        self
    }

    /// Declare several input paths.
    pub fn inputs<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.inputs.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Declare an output path.
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.outputs.push(path.into());
        self
    }

    /// Declare several output paths.
    pub fn outputs<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.outputs.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Set an output validator.
    pub fn validate_outputs<F>(mut self, check: F) -> Self
    where
        F: Fn(&Path) -> bool + Send + Sync + 'static,
    {
        self.output_validator = Some(OutputValidator::new(check));
        self
    }

    /// Set whether existing outputs are deleted before running.
    pub fn remove_previous_outputs(mut self, remove: bool) -> Self {
        self.remove_previous_outputs = remove;
        self
    }

    /// Set whether outputs are deleted after a failure.
    pub fn remove_if_failed(mut self, remove: bool) -> Self {
        self.remove_if_failed = remove;
        self
    }

    /// Set whether the run is skipped when all outputs exist.
    pub fn skip_if_exist(mut self, skip: bool) -> Self {
        self.skip_if_exist = skip;
        self
    }

    /// Set asynchronous execution.
    pub fn asynchronous(mut self, asynchronous: bool) -> Self {
        self.asynchronous = asynchronous;
        self
    }

    /// Set the prompt printed before each command line.
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Add multiple environment variables.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self.env.insert(k.into(), v.into());
        }
        self
    }

    /// Remove an inherited environment variable.
    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        self.env_remove.push(key.into());
        self
    }

    /// Set whether the inherited environment is cleared.
    pub fn env_clear(mut self, clear: bool) -> Self {
        self.env_clear = clear;
        self
    }

    /// The script handed to `<shell> -c`.
    ///
    /// A single line is passed verbatim. Several lines are each wrapped in a
    /// brace group and chained with `&&`: groups run in the current shell, so
    /// variables and `cd` persist, and the first failing line ends the script.
    pub fn script(&self) -> String {
        match self.commands.as_slice() {
            [] => String::new(),
            [single] => single.clone(),
            lines => lines
                .iter()
                .map(|line| format!("{{ {line}\n}}"))
                .collect::<Vec<_>>()
                .join(" && "),
        }
    }
}

impl From<&str> for CommandSpec {
    fn from(command: &str) -> Self {
        Self::new(command)
    }
}

impl From<String> for CommandSpec {
    fn from(command: String) -> Self {
        Self::new(command)
    }
}

impl From<Vec<String>> for CommandSpec {
    fn from(commands: Vec<String>) -> Self {
        Self::lines(commands)
    }
}

impl From<&[&str]> for CommandSpec {
    fn from(commands: &[&str]) -> Self {
        Self::lines(commands.iter().copied())
    }
}
