use std::process::{Output, Stdio};

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const DAEMON_UNREACHABLE: &str = "Cannot connect to the Docker daemon";

#[derive(Debug, thiserror::Error)]
pub enum DockerError {
    #[error("docker CLI not found, install: https://docs.docker.com/get-docker/")]
    NotFound { source: std::io::Error },

    #[error("docker daemon is not running (docker {subcommand})")]
    DaemonUnavailable { subcommand: String },

    #[error("docker {subcommand} failed: {args:?}\n{stderr}")]
    CommandFailed {
        subcommand: String,
        args: Vec<String>,
        stderr: String,
    },

    #[error("docker output was not valid UTF-8")]
    InvalidUtf8 { source: std::string::FromUtf8Error },

    #[error("failed to write to docker stdin")]
    StdinWrite { source: std::io::Error },
}

impl DockerError {
    /// Classify a non-zero docker exit by its stderr.
    pub fn from_failure(args: &[String], stderr: String) -> Self {
        let subcommand = args.first().cloned().unwrap_or_default();
        if stderr.contains(DAEMON_UNREACHABLE) {
            Self::DaemonUnavailable { subcommand }
        } else {
            Self::CommandFailed {
                subcommand,
                args: args.to_vec(),
                stderr,
            }
        }
    }
}

/// Runs `docker` subcommands. Mocked in tests.
#[allow(async_fn_in_trait)]
pub trait DockerExecutor: Send + Sync {
    /// Run and capture stdout.
    async fn exec(&self, args: &[String]) -> Result<String, DockerError>;

    /// Run with output attached to the terminal (`push` progress).
    async fn exec_streaming(&self, args: &[String]) -> Result<(), DockerError>;

    /// Run with `stdin_data` piped in, e.g. `login --password-stdin`.
    async fn exec_with_stdin(&self, args: &[String], stdin_data: &[u8])
    -> Result<String, DockerError>;
}

/// Executor over the local `docker` binary.
pub struct RealExecutor;

impl RealExecutor {
    fn command(args: &[String]) -> Command {
        tracing::debug!(?args, "docker");
        let mut cmd = Command::new("docker");
        // Suppress "What's next" hints so stdout stays parseable.
        cmd.env("DOCKER_CLI_HINTS", "false").args(args);
        cmd
    }

    fn captured(args: &[String], output: Output) -> Result<String, DockerError> {
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(DockerError::from_failure(args, stderr));
        }
        String::from_utf8(output.stdout).map_err(|e| DockerError::InvalidUtf8 { source: e })
    }
}

impl DockerExecutor for RealExecutor {
    async fn exec(&self, args: &[String]) -> Result<String, DockerError> {
        let output = Self::command(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| DockerError::NotFound { source: e })?;
        Self::captured(args, output)
    }

    async fn exec_streaming(&self, args: &[String]) -> Result<(), DockerError> {
        let status = Self::command(args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| DockerError::NotFound { source: e })?;

        if status.success() {
            Ok(())
        } else {
            Err(DockerError::from_failure(args, format!("exit code: {status}")))
        }
    }

    async fn exec_with_stdin(
        &self,
        args: &[String],
        stdin_data: &[u8],
    ) -> Result<String, DockerError> {
        let mut child = Self::command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DockerError::NotFound { source: e })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(stdin_data)
                .await
                .map_err(|e| DockerError::StdinWrite { source: e })?;
            // Dropping closes the pipe so `--password-stdin` sees EOF.
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| DockerError::NotFound { source: e })?;
        Self::captured(args, output)
    }
}
