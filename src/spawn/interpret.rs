//! Event interpretation: folds decoded events into usage, progress and the
//! captured message sequence.

use crate::cli::{AgentEvent, AgentMessage};
use crate::spawn::{describe_tool_call, Phase, ProgressFn, ProgressReporter, ProgressState, UsageStats};

/// Fixed in-flight action label once the assistant starts producing text.
const WRITING_ACTION: &str = "Writing response";

/// Turn-level outcome of one handled event, consumed by the runner to
/// drive interactive termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Nothing turn-related happened.
    None,
    /// An assistant turn completed (`end_turn`/`stop`).
    Completed,
    /// An assistant turn reported an error or aborted stop reason.
    Failed,
}

/// Per-invocation event interpreter.
///
/// Owns the usage accumulator and progress state for exactly one spawn;
/// instances are never shared across invocations.
pub struct EventInterpreter {
    interactive: bool,
    usage: UsageStats,
    progress: ProgressState,
    reporter: ProgressReporter,
    messages: Vec<AgentMessage>,
    result_text: Option<String>,
    model: Option<String>,
    stop_reason: Option<String>,
    error_message: Option<String>,
}

impl EventInterpreter {
    /// Create an interpreter for one spawn.
    #[must_use]
    pub fn new(interactive: bool, on_progress: Option<ProgressFn>) -> Self {
        Self {
            interactive,
            usage: UsageStats::default(),
            progress: ProgressState::new(),
            reporter: ProgressReporter::new(on_progress),
            messages: Vec::new(),
            result_text: None,
            model: None,
            stop_reason: None,
            error_message: None,
        }
    }

    /// Fold one event into the derived state.
    pub fn handle(&mut self, event: AgentEvent) -> TurnOutcome {
        match event {
            AgentEvent::ToolExecutionStart(tool) => {
                let description = describe_tool_call(&tool.tool_name, &tool.args);
                self.progress.tool_started(description);
                self.emit(true);
                TurnOutcome::None
            }
            AgentEvent::ToolExecutionEnd(tool) => {
                let fallback = describe_tool_call(&tool.tool_name, &tool.args);
                self.progress.tool_finished(tool.is_error, fallback);
                self.emit(true);
                TurnOutcome::None
            }
            AgentEvent::MessageUpdate {
                assistant_message_event,
            } => {
                if assistant_message_event.is_text() && self.progress.phase() != Phase::Writing {
                    self.progress.advance_to(Phase::Writing);
                    self.progress.set_current_action(WRITING_ACTION);
                    self.emit(true);
                }
                TurnOutcome::None
            }
            AgentEvent::MessageEnd { message } => self.handle_message_end(message),
            AgentEvent::ToolResultEnd { message } => {
                self.messages.push(message);
                self.emit(false);
                TurnOutcome::None
            }
            AgentEvent::Result { result } => {
                // Authoritative final text, preferred over assistant output.
                self.result_text = Some(result);
                TurnOutcome::None
            }
            AgentEvent::Response { .. } | AgentEvent::Unknown => TurnOutcome::None,
        }
    }

    fn handle_message_end(&mut self, message: AgentMessage) -> TurnOutcome {
        if !message.is_assistant() {
            self.messages.push(message);
            return TurnOutcome::None;
        }

        if let Some(usage) = &message.usage {
            self.usage.fold(usage);
        }
        if self.model.is_none() {
            self.model = message.model.clone();
        }
        if self.stop_reason.is_none() {
            self.stop_reason = message.stop_reason.clone();
        }
        if self.error_message.is_none() {
            self.error_message = message.error_message.clone();
        }

        let text = message.text();
        if !text.is_empty() {
            self.progress.advance_to(Phase::Writing);
            self.reporter.emit(&text, true);
        }

        // One-shot transport counts every assistant message as a turn,
        // failed ones included, so partial usage stays valid.
        if !self.interactive {
            self.usage.record_turn();
        }

        let outcome = if message.is_failed_turn() {
            TurnOutcome::Failed
        } else if self.interactive && message.ends_turn() {
            self.usage.record_turn();
            TurnOutcome::Completed
        } else {
            TurnOutcome::None
        };

        self.messages.push(message);
        outcome
    }

    /// Heartbeat re-render driven by elapsed time only.
    pub fn heartbeat(&mut self) {
        self.emit(false);
    }

    fn emit(&mut self, forced: bool) {
        let rendered = self.progress.render();
        self.reporter.emit(&rendered, forced);
    }

    /// Accumulated usage so far.
    #[must_use]
    pub fn usage(&self) -> UsageStats {
        self.usage
    }

    /// Current progress state.
    #[must_use]
    pub fn progress(&self) -> &ProgressState {
        &self.progress
    }

    /// Freeze the interpreter into its final components:
    /// (messages, usage, model, stop reason, error message, result text).
    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        Vec<AgentMessage>,
        UsageStats,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
    ) {
        (
            self.messages,
            self.usage,
            self.model,
            self.stop_reason,
            self.error_message,
            self.result_text,
        )
    }
}
