//! Process launcher: spawns the agent, wires streams, termination and
//! progress together, and assembles the final result.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use crate::cli::{
    AgentMessage, AgentProcess, AgentProcessBuilder, RpcInjector, SpawnError, StreamParser,
};
use crate::config::RunnerConfig;
use crate::spawn::{
    debug_trace, EventInterpreter, TerminateReason, Terminator, TurnOutcome, UsageStats,
    GRACE_PERIOD,
};

/// Heartbeat period for elapsed-time progress re-renders.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_millis(1500);

/// Exit code reported when the caller cancelled the spawn.
pub const EXIT_ABORTED: i32 = 130;

/// Stop reason reported on cancellation.
const STOP_REASON_ABORTED: &str = "aborted";

/// Read buffer size for child stream chunks.
const CHUNK_SIZE: usize = 8192;

/// Error type for launching agent invocations.
#[derive(thiserror::Error, Debug)]
pub enum RunError {
    /// The process failed to spawn.
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    /// Process stdout was not available.
    #[error("Process stdout not available")]
    NoStdout,
    /// Process stderr was not available.
    #[error("Process stderr not available")]
    NoStderr,
    /// Process stdin was not available in interactive transport.
    #[error("Process stdin not available")]
    NoStdin,
    /// I/O failure while driving the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Immutable per-invocation configuration.
#[derive(Clone, Default)]
pub struct SpawnConfig {
    /// Working directory for the child process.
    pub cwd: PathBuf,
    /// The task text for the first turn.
    pub task: String,
    /// Model identifier, if overriding the agent's default.
    pub model: Option<String>,
    /// Built-in tool names the agent may use.
    pub allowed_tools: Option<Vec<String>>,
    /// Extension tool names passed via the environment.
    pub extension_tools: Option<Vec<String>>,
    /// System prompt body, delivered through a temporary file.
    pub system_prompt: Option<String>,
    /// External cancellation signal. May already be triggered.
    pub cancel: Option<CancellationToken>,
    /// Progress snapshot sink.
    pub on_progress: Option<crate::spawn::ProgressFn>,
    /// Follow-up message. Presence switches to interactive transport.
    pub follow_up: Option<String>,
}

impl SpawnConfig {
    /// Create a config for the given working directory and task.
    #[must_use]
    pub fn new(cwd: impl Into<PathBuf>, task: impl Into<String>) -> Self {
        Self {
            cwd: cwd.into(),
            task: task.into(),
            ..Default::default()
        }
    }

    /// Queue a follow-up message, switching to interactive transport.
    #[must_use]
    pub fn with_follow_up(mut self, text: impl Into<String>) -> Self {
        self.follow_up = Some(text.into());
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Whether this invocation uses interactive transport.
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        self.follow_up.is_some()
    }
}

impl std::fmt::Debug for SpawnConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnConfig")
            .field("cwd", &self.cwd)
            .field("task", &self.task)
            .field("model", &self.model)
            .field("interactive", &self.is_interactive())
            .finish_non_exhaustive()
    }
}

/// Final aggregated result of one spawn. Caller-owned after return.
#[derive(Debug, Clone, Default)]
pub struct SpawnResult {
    /// Normalized process exit code.
    pub exit_code: i32,
    /// All emitted messages (assistant and tool-result) in arrival order.
    pub messages: Vec<AgentMessage>,
    /// Captured diagnostic stream text, possibly annotated.
    pub stderr: String,
    /// Final usage snapshot.
    pub usage: UsageStats,
    /// Model actually used, if reported.
    pub model: Option<String>,
    /// Terminal stop reason, if reported.
    pub stop_reason: Option<String>,
    /// Error message, if the agent reported one.
    pub error: Option<String>,
    /// Text carried by a terminal `result` event, if any.
    pub result_text: Option<String>,
}

impl SpawnResult {
    /// The final output text: the `result` event's payload when present,
    /// otherwise the last assistant message's text.
    #[must_use]
    pub fn final_text(&self) -> Option<String> {
        if let Some(text) = &self.result_text {
            return Some(text.clone());
        }
        self.messages
            .iter()
            .rev()
            .find(|m| m.is_assistant())
            .map(AgentMessage::text)
    }

    /// Whether the spawn produced usable output.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == 0 && self.error.is_none()
    }
}

/// Launches agent invocations and drives them to completion.
///
/// One `Spawner` may run any number of invocations, concurrently or in
/// sequence; each call owns all of its mutable state.
#[derive(Debug, Clone)]
pub struct Spawner {
    binary: String,
    max_stdout_bytes: usize,
    max_stderr_bytes: usize,
    grace: Duration,
}

impl Spawner {
    /// Create a spawner from the runner configuration.
    #[must_use]
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            max_stdout_bytes: config.max_stdout_bytes,
            max_stderr_bytes: config.max_stderr_bytes,
            grace: GRACE_PERIOD,
        }
    }

    /// Create a spawner for a specific binary with default limits.
    #[must_use]
    pub fn with_binary(binary: impl Into<String>) -> Self {
        let mut spawner = Self::new(&RunnerConfig::default());
        spawner.binary = binary.into();
        spawner
    }

    /// Override the forced-kill grace period.
    #[must_use]
    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Override the stream byte limits.
    #[must_use]
    pub fn limits(mut self, max_stdout_bytes: usize, max_stderr_bytes: usize) -> Self {
        self.max_stdout_bytes = max_stdout_bytes;
        self.max_stderr_bytes = max_stderr_bytes;
        self
    }

    /// Run one agent invocation to completion.
    ///
    /// Every in-protocol failure (agent error, overflow, cancellation)
    /// resolves into a populated [`SpawnResult`]; `Err` is reserved for the
    /// process failing to start or OS-level I/O breakage.
    ///
    /// # Errors
    ///
    /// Returns `RunError` if the process cannot be spawned or its handles
    /// cannot be acquired.
    pub async fn run(&self, config: SpawnConfig) -> Result<SpawnResult, RunError> {
        let interactive = config.is_interactive();

        // Removed on every exit path by RAII, including errors below.
        let prompt_file = match &config.system_prompt {
            Some(body) => {
                let mut file = tempfile::NamedTempFile::new()?;
                file.write_all(body.as_bytes())?;
                file.flush()?;
                Some(file)
            }
            None => None,
        };

        let mut builder = if interactive {
            AgentProcessBuilder::interactive()
        } else {
            AgentProcessBuilder::one_shot(&config.task)
        };
        builder = builder.working_dir(&config.cwd);
        if let Some(model) = &config.model {
            builder = builder.model(model);
        }
        if let Some(tools) = &config.allowed_tools {
            builder = builder.allowed_tools(tools);
        }
        if let Some(tools) = &config.extension_tools {
            builder = builder.extension_tools(tools);
        }
        if let Some(file) = &prompt_file {
            builder = builder.system_prompt_file(file.path());
        }

        let mut process = AgentProcess::spawn(&self.binary, &builder)?;
        let mut stdout = process.take_stdout().ok_or(RunError::NoStdout)?;
        let mut stderr = process.take_stderr().ok_or(RunError::NoStderr)?;

        // Both commands go out eagerly; the child queues the follow-up until
        // its own turn loop goes idle. Held open for the process lifetime.
        let mut injector = if interactive {
            let stdin = process.take_stdin().ok_or(RunError::NoStdin)?;
            let mut injector = RpcInjector::new(stdin, true);
            if let Err(e) = injector
                .send_task(&config.task, config.follow_up.as_deref())
                .await
            {
                // A dead child surfaces through exit status, not here.
                tracing::warn!(error = %e, "Failed to write startup commands");
            }
            Some(injector)
        } else {
            None
        };

        let cancel = config.cancel.clone().unwrap_or_default();
        let mut parser = StreamParser::new();
        let mut interp = EventInterpreter::new(interactive, config.on_progress.clone());
        let mut term = Terminator::new(self.grace);

        let mut heartbeat = tokio::time::interval(HEARTBEAT_PERIOD);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut out_chunk = vec![0u8; CHUNK_SIZE];
        let mut err_chunk = vec![0u8; CHUNK_SIZE];
        let mut stdout_bytes = 0usize;
        let mut stderr_text = String::new();
        let mut stderr_overflowed = false;
        let mut stdout_done = false;
        let mut stderr_done = false;
        let mut cancel_seen = false;

        while !(stdout_done && stderr_done) {
            let deadline = term.deadline();
            tokio::select! {
                biased;

                () = cancel.cancelled(), if !cancel_seen => {
                    cancel_seen = true;
                    if term.request(TerminateReason::Cancelled) {
                        process.request_terminate();
                    }
                }

                () = sleep_until_opt(deadline), if deadline.is_some() => {
                    term.mark_killed();
                    if let Err(e) = process.kill().await {
                        tracing::warn!(error = %e, "Forced kill failed");
                    }
                }

                read = stdout.read(&mut out_chunk), if !stdout_done => {
                    match read {
                        Ok(0) => stdout_done = true,
                        Ok(n) => {
                            stdout_bytes = stdout_bytes.saturating_add(n);
                            for event in parser.push_bytes(&out_chunk[..n]) {
                                Self::apply_event(
                                    &mut interp,
                                    &mut term,
                                    &mut process,
                                    injector.as_mut(),
                                    event,
                                );
                            }
                            if stdout_bytes > self.max_stdout_bytes
                                && term.request(TerminateReason::StdoutOverflow)
                            {
                                stderr_text.push_str(&format!(
                                    "\nagent stdout exceeded {} bytes; terminating\n",
                                    self.max_stdout_bytes
                                ));
                                process.request_terminate();
                            }
                        }
                        Err(e) => {
                            tracing::debug!(error = %e, "stdout read failed");
                            stdout_done = true;
                        }
                    }
                }

                read = stderr.read(&mut err_chunk), if !stderr_done => {
                    match read {
                        Ok(0) => stderr_done = true,
                        Ok(n) => {
                            if !stderr_overflowed {
                                stderr_text.push_str(&String::from_utf8_lossy(&err_chunk[..n]));
                                if stderr_text.len() > self.max_stderr_bytes {
                                    truncate_at_boundary(&mut stderr_text, self.max_stderr_bytes);
                                    stderr_text.push_str(&format!(
                                        "\nagent stderr exceeded {} bytes (truncated)\n",
                                        self.max_stderr_bytes
                                    ));
                                    stderr_overflowed = true;
                                    if term.request(TerminateReason::StderrOverflow) {
                                        process.request_terminate();
                                    }
                                }
                            }
                        }
                        Err(e) => {
                            tracing::debug!(error = %e, "stderr read failed");
                            stderr_done = true;
                        }
                    }
                }

                _ = heartbeat.tick() => {
                    interp.heartbeat();
                }
            }
        }

        if let Some(event) = parser.finish() {
            Self::apply_event(&mut interp, &mut term, &mut process, injector.as_mut(), event);
        }

        // Streams are closed; the wait is bounded by the armed deadline when
        // termination was requested, unbounded otherwise (natural exit).
        let status = match term.deadline() {
            Some(deadline) => match tokio::time::timeout_at(deadline, process.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    term.mark_killed();
                    process.kill().await?;
                    process.wait().await?
                }
            },
            None => process.wait().await?,
        };

        drop(injector);
        drop(prompt_file);

        let (messages, usage, model, mut stop_reason, error, result_text) = interp.into_parts();

        let raw_code = status.code();
        let exit_code = match term.reason() {
            // Termination we requested because the expected turns completed
            // is a success, not a failure.
            Some(TerminateReason::TurnsComplete) => 0,
            Some(TerminateReason::Cancelled) => {
                stop_reason = Some(STOP_REASON_ABORTED.to_string());
                EXIT_ABORTED
            }
            Some(TerminateReason::StdoutOverflow | TerminateReason::StderrOverflow) => {
                raw_code.filter(|c| *c != 0).unwrap_or(1)
            }
            Some(TerminateReason::TurnError) | None => raw_code.unwrap_or(1),
        };

        tracing::info!(
            exit_code,
            turns = usage.turns,
            tokens = usage.total_tokens(),
            reason = ?term.reason(),
            "Agent invocation finished"
        );

        Ok(SpawnResult {
            exit_code,
            messages,
            stderr: stderr_text,
            usage,
            model,
            stop_reason,
            error,
            result_text,
        })
    }

    fn apply_event(
        interp: &mut EventInterpreter,
        term: &mut Terminator,
        process: &mut AgentProcess,
        injector: Option<&mut RpcInjector>,
        event: crate::cli::AgentEvent,
    ) {
        match interp.handle(event) {
            TurnOutcome::Completed => {
                if let Some(injector) = injector {
                    if injector.record_turn_end() && term.request(TerminateReason::TurnsComplete) {
                        process.request_terminate();
                    }
                }
            }
            TurnOutcome::Failed => {
                if injector.is_some() {
                    debug_trace("turn-end", "turn failed, terminating");
                    if term.request(TerminateReason::TurnError) {
                        process.request_terminate();
                    }
                }
            }
            TurnOutcome::None => {}
        }
    }
}

/// Sleep until the deadline; resolves immediately when `None`. Only polled
/// under a `deadline.is_some()` select guard.
async fn sleep_until_opt(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => {}
    }
}

/// Truncate a string to at most `max` bytes without splitting a character.
fn truncate_at_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}
