//! Subprocess execution for the external vault CLI
//!
//! The [`ProcessRunner`] trait is the only way the bridge talks to the vault.
//! [`CommandRunner`] is the production implementation on top of
//! `tokio::process`; tests substitute [`crate::testing::ScriptedRunner`].
//!
//! A runner never treats a non-zero exit code as an error: that is a normal
//! outcome the caller inspects. It fails only when the program cannot be
//! started ([`VaultError::ProcessSpawn`]) or when the timeout elapses
//! ([`VaultError::ProcessTimeout`]), in which case the child is killed.
//! Runners do not retry.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{VaultError, VaultResult};

/// Default per-invocation timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Whole seconds of a timeout for error reports, rounded up
///
/// A sub-second limit never reads as zero.
#[must_use]
pub const fn timeout_secs(timeout: Duration) -> u64 {
    if timeout.subsec_nanos() > 0 {
        timeout.as_secs().saturating_add(1)
    } else {
        timeout.as_secs()
    }
}

/// One invocation of the vault CLI
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    /// Positional and flag arguments
    pub args: Vec<String>,
    /// Data written to the child's stdin, then closed
    pub stdin: Option<SecretString>,
    /// Plain environment variables
    pub env: Vec<(String, String)>,
    /// Environment variables carrying secrets (master password, session key)
    pub secret_env: Vec<(String, SecretString)>,
    /// Maximum time to wait for the child
    pub timeout: Duration,
}

impl ProcessRequest {
    /// Creates a request with the given arguments and the default timeout
    #[must_use]
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            stdin: None,
            env: Vec::new(),
            secret_env: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Appends an argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Sets the stdin payload
    #[must_use]
    pub fn with_stdin(mut self, input: SecretString) -> Self {
        self.stdin = Some(input);
        self
    }

    /// Adds a plain environment variable
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Adds an environment variable whose value must never be logged
    #[must_use]
    pub fn with_secret_env(mut self, key: impl Into<String>, value: SecretString) -> Self {
        self.secret_env.push((key.into(), value));
        self
    }

    /// Sets the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the CLI subcommand (first argument), used for logging
    #[must_use]
    pub fn subcommand(&self) -> &str {
        self.args.first().map_or("", String::as_str)
    }

    /// Looks up a plain or secret environment value by key
    #[must_use]
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.secret_env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.expose_secret())
            .or_else(|| {
                self.env
                    .iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| v.as_str())
            })
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code (-1 when terminated by a signal)
    pub exit_code: i32,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl ProcessOutput {
    /// Creates a successful output with the given stdout
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Creates a failed output with the given exit code and stderr
    #[must_use]
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns true if the process exited with code 0
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the text that explains a failure
    ///
    /// The vault CLI reports errors on stderr, but some builds print them to
    /// stdout; whichever is non-empty wins, stderr first.
    #[must_use]
    pub fn failure_text(&self) -> &str {
        if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        }
    }
}

/// Executes the vault CLI
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Runs the CLI with the given request
    ///
    /// # Errors
    /// Returns `VaultError::ProcessSpawn` if the program cannot be started and
    /// `VaultError::ProcessTimeout` if it does not finish in time.
    async fn run(&self, request: ProcessRequest) -> VaultResult<ProcessOutput>;

    /// Program name used in diagnostics
    fn program(&self) -> String;
}

/// Runs the vault CLI as a real subprocess
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: PathBuf,
}

impl CommandRunner {
    /// Creates a runner for the given executable path or name
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Returns the configured executable
    #[must_use]
    pub fn program_path(&self) -> &Path {
        &self.program
    }

    fn spawn_error(&self, err: &std::io::Error) -> VaultError {
        VaultError::ProcessSpawn {
            program: self.program.display().to_string(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl ProcessRunner for CommandRunner {
    async fn run(&self, request: ProcessRequest) -> VaultResult<ProcessOutput> {
        let ProcessRequest {
            args,
            stdin,
            env,
            secret_env,
            timeout,
        } = request;

        let mut cmd = Command::new(&self.program);
        cmd.args(&args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &env {
            cmd.env(key, value);
        }
        for (key, value) in &secret_env {
            cmd.env(key, value.expose_secret());
        }

        let subcommand = args.first().cloned().unwrap_or_default();
        debug!(program = %self.program.display(), subcommand = %subcommand, "Running vault CLI");

        let mut child = cmd.spawn().map_err(|e| self.spawn_error(&e))?;
        let child_stdin = child.stdin.take();

        // Dropping the child on timeout kills it (kill_on_drop)
        let finished = tokio::time::timeout(timeout, async move {
            if let (Some(mut pipe), Some(input)) = (child_stdin, stdin) {
                if let Err(e) = pipe.write_all(input.expose_secret().as_bytes()).await {
                    debug!("Vault CLI closed stdin early: {e}");
                }
                drop(pipe);
            }
            child.wait_with_output().await
        })
        .await;

        match finished {
            Ok(Ok(output)) => {
                let result = ProcessOutput {
                    exit_code: output.status.code().unwrap_or(-1),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                };
                debug!(subcommand = %subcommand, exit_code = result.exit_code, "Vault CLI finished");
                Ok(result)
            }
            Ok(Err(e)) => Err(self.spawn_error(&e)),
            Err(_) => {
                let secs = timeout_secs(timeout);
                warn!(subcommand = %subcommand, timeout_secs = secs, "Vault CLI timed out, terminated");
                Err(VaultError::ProcessTimeout(secs))
            }
        }
    }

    fn program(&self) -> String {
        self.program.display().to_string()
    }
}
