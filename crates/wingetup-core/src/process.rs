//! External tool invocation (`pwsh`, `git`, `gh`, `msiinfo`).

use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, trace};

/// Failures running an external program.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The program is not on `PATH`.
    #[error("'{0}' not found in PATH")]
    NotFound(String),

    /// Spawning or waiting on the program failed.
    #[error("IO error running {program}: {source}")]
    Io {
        /// Program name
        program: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The program exited non-zero.
    #[error("{program} {args} failed ({status}): {stderr}")]
    Failed {
        /// Program name
        program: String,
        /// Arguments, with credentials redacted
        args: String,
        /// Exit status
        status: String,
        /// Captured stderr, with credentials redacted
        stderr: String,
    },

    /// The program ran past its timeout and was killed.
    #[error("{program} timed out after {secs}s")]
    Timeout {
        /// Program name
        program: String,
        /// Timeout that elapsed
        secs: u64,
    },
}

static CREDENTIALS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https://[^@/\s]+@").expect("static regex"));

/// Hide tokens embedded in `https://<token>@host` URLs.
pub fn redact(text: &str) -> String {
    CREDENTIALS.replace_all(text, "https://***@").into_owned()
}

/// A program plus the working directory, environment and timeout it runs with.
#[derive(Debug, Clone)]
pub struct Tool {
    program: String,
    cwd: Option<PathBuf>,
    envs: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl Tool {
    /// A tool resolved from `PATH` by name.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            cwd: None,
            envs: Vec::new(),
            timeout: None,
        }
    }

    /// Run in `dir` instead of the current directory.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set an environment variable for the child only.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Kill the program when it runs longer than `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Program name as given to [`Tool::new`].
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Whether the program resolves on `PATH`.
    pub fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    fn build_command(&self, args: &[&str]) -> Command {
        debug!(
            "running: {} {}",
            self.program,
            redact(&args.join(" "))
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(args).kill_on_drop(true);
        cmd.envs(self.envs.iter().map(|(k, v)| (k, v)));
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Run to completion and return the raw output, whatever the exit status.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be spawned or exceeds its timeout.
    pub async fn output(&self, args: &[&str]) -> Result<Output, CommandError> {
        let fut = self.build_command(args).output();

        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| CommandError::Timeout {
                    program: self.program.clone(),
                    secs: limit.as_secs(),
                })?,
            None => fut.await,
        };

        let output = result.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CommandError::NotFound(self.program.clone())
            } else {
                CommandError::Io {
                    program: self.program.clone(),
                    source: e,
                }
            }
        })?;

        debug!("{} exit status: {:?}", self.program, output.status);
        if !output.stderr.is_empty() {
            trace!(
                "{} stderr: {}",
                self.program,
                redact(&String::from_utf8_lossy(&output.stderr))
            );
        }

        Ok(output)
    }

    /// Run and return stdout, treating a non-zero exit as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot run, times out, or exits non-zero.
    pub async fn execute(&self, args: &[&str]) -> Result<String, CommandError> {
        let output = self.output(args).await?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(CommandError::Failed {
                program: self.program.clone(),
                args: redact(&args.join(" ")),
                status: output.status.to_string(),
                stderr: redact(String::from_utf8_lossy(&output.stderr).trim()),
            })
        }
    }
}
