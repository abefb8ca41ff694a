//! Agent process spawning and control.
//!
//! Builds the argument list for the two transport modes and wraps the
//! running child with termination helpers.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};

/// Environment override enabling compact session-read formatting in the child.
pub const ENV_COMPACT_SESSION_READS: &str = "AGENT_COMPACT_SESSION_READS";

/// Environment override listing extension tools to expose to the child.
pub const ENV_EXTRA_TOOLS: &str = "AGENT_EXTRA_TOOLS";

/// Error type for process spawning operations.
#[derive(thiserror::Error, Debug)]
pub enum SpawnError {
    /// The agent binary was not found.
    #[error("Agent binary not found")]
    NotFound,
    /// Permission denied when spawning.
    #[error("Permission denied")]
    PermissionDenied,
    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpawnError {
    fn from_io(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound,
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Io(err),
        }
    }
}

/// Transport mode for one agent invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// Task passed as a trailing argument; stdin closed.
    #[default]
    OneShot,
    /// Persistent stdin; task and follow-up delivered as commands.
    Interactive,
}

/// Builder for configuring agent process arguments.
#[derive(Debug, Clone, Default)]
pub struct AgentProcessBuilder {
    transport: Transport,
    task: Option<String>,
    model: Option<String>,
    allowed_tools: Option<Vec<String>>,
    extension_tools: Option<Vec<String>>,
    system_prompt_file: Option<PathBuf>,
    working_dir: Option<PathBuf>,
}

impl AgentProcessBuilder {
    /// Create a one-shot builder carrying the task as an argument.
    #[must_use]
    pub fn one_shot(task: impl Into<String>) -> Self {
        Self {
            transport: Transport::OneShot,
            task: Some(task.into()),
            ..Default::default()
        }
    }

    /// Create an interactive builder; the task goes over stdin instead.
    #[must_use]
    pub fn interactive() -> Self {
        Self {
            transport: Transport::Interactive,
            ..Default::default()
        }
    }

    /// Select a model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Restrict the built-in tools available to the agent.
    #[must_use]
    pub fn allowed_tools(mut self, tools: &[String]) -> Self {
        self.allowed_tools = Some(tools.to_vec());
        self
    }

    /// Expose additional extension tools via the environment.
    #[must_use]
    pub fn extension_tools(mut self, tools: &[String]) -> Self {
        self.extension_tools = Some(tools.to_vec());
        self
    }

    /// Point the agent at a file holding the system prompt.
    #[must_use]
    pub fn system_prompt_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.system_prompt_file = Some(path.into());
        self
    }

    /// Set the working directory for the agent process.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Get the transport mode.
    #[must_use]
    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Build the command-line arguments.
    #[must_use]
    pub fn build_args(&self) -> Vec<String> {
        let mode = match self.transport {
            Transport::OneShot => "json",
            Transport::Interactive => "rpc",
        };
        let mut args = vec![
            "--mode".to_string(),
            mode.to_string(),
            "--no-session".to_string(),
        ];

        if let Some(model) = &self.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }

        if let Some(tools) = &self.allowed_tools {
            args.push("--tools".to_string());
            args.push(tools.join(","));
        }

        if let Some(path) = &self.system_prompt_file {
            args.push("--system-prompt-file".to_string());
            args.push(path.display().to_string());
        }

        if self.transport == Transport::OneShot {
            if let Some(task) = &self.task {
                args.push(task.clone());
            }
        }

        args
    }
}

/// A running agent process.
#[derive(Debug)]
pub struct AgentProcess {
    child: Child,
}

impl AgentProcess {
    /// Spawn the agent with the given builder configuration.
    ///
    /// # Errors
    ///
    /// Returns `SpawnError` if the process fails to spawn.
    pub fn spawn(binary: &str, builder: &AgentProcessBuilder) -> Result<Self, SpawnError> {
        let args = builder.build_args();

        let mut cmd = Command::new(binary);
        cmd.args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env(ENV_COMPACT_SESSION_READS, "1");

        cmd.stdin(match builder.transport {
            Transport::Interactive => Stdio::piped(),
            Transport::OneShot => Stdio::null(),
        });

        if let Some(tools) = &builder.extension_tools {
            cmd.env(ENV_EXTRA_TOOLS, tools.join(","));
        }

        if let Some(dir) = &builder.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(SpawnError::from_io)?;
        tracing::debug!(binary, pid = ?child.id(), transport = ?builder.transport, "Spawned agent process");

        Ok(Self { child })
    }

    /// Take ownership of the stdout handle. Returns `None` after the first call.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Take ownership of the stderr handle. Returns `None` after the first call.
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Take ownership of the stdin handle. Returns `None` after the first call
    /// and always in one-shot mode.
    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.child.stdin.take()
    }

    /// Get the process ID, if still running.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Check if the process has exited without blocking.
    ///
    /// # Errors
    ///
    /// Returns an error if the process state cannot be queried.
    pub fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// Wait for the process to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting fails.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Forcefully kill the process.
    ///
    /// # Errors
    ///
    /// Returns an error if the kill signal cannot be sent.
    pub async fn kill(&mut self) -> std::io::Result<()> {
        self.child.kill().await
    }

    /// Request graceful termination without waiting.
    ///
    /// On Unix this sends SIGTERM; elsewhere it falls back to a hard kill
    /// since no graceful signal exists.
    pub fn request_terminate(&mut self) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = self.id() {
                let nix_pid = Pid::from_raw(i32::try_from(pid).unwrap_or(i32::MAX));
                let _ = kill(nix_pid, Signal::SIGTERM);
            }
        }

        #[cfg(not(unix))]
        {
            let _ = self.child.start_kill();
        }
    }
}
