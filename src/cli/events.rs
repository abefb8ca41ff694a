//! Event types from the agent's line-delimited JSON output.
//!
//! Each line of child stdout decodes into one [`AgentEvent`]. The set of
//! recognized tags is closed; anything else falls into `Unknown` and is
//! ignored by the interpreter rather than treated as an error.

use serde::{Deserialize, Serialize};

/// A tool call reported by the agent.
///
/// Both `tool_execution_start` and `tool_execution_end` carry this shape;
/// only the end event sets `is_error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolExecution {
    /// Name of the tool being invoked.
    pub tool_name: String,
    /// Tool arguments as reported by the agent.
    #[serde(default)]
    pub args: serde_json::Value,
    /// Identifier correlating start and end events.
    #[serde(default)]
    pub tool_call_id: String,
    /// Whether the execution failed (end events only).
    #[serde(default)]
    pub is_error: bool,
}

/// Streaming sub-events inside a `message_update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantMessageEvent {
    /// A text block opened.
    TextStart,
    /// A text fragment arrived.
    TextDelta {
        /// The text fragment.
        #[serde(default)]
        text: String,
    },
    /// Any other streaming sub-event (thinking, tool input, ...).
    #[serde(other)]
    Other,
}

impl AssistantMessageEvent {
    /// Whether this sub-event indicates the assistant is producing text.
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::TextStart | Self::TextDelta { .. })
    }
}

/// Per-message cost breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CostUsage {
    /// Total cost of the message in USD.
    pub total: f64,
}

/// Token usage attached to an assistant `message_end`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageUsage {
    /// Input tokens consumed.
    pub input: u64,
    /// Output tokens produced.
    pub output: u64,
    /// Tokens read from prompt cache.
    pub cache_read: u64,
    /// Tokens written to prompt cache.
    pub cache_write: u64,
    /// Cost breakdown.
    pub cost: CostUsage,
    /// Total context size after this message. Snapshot, not a delta.
    pub context_tokens: u64,
}

/// A complete message carried by `message_end` or `tool_result_end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMessage {
    /// Message author ("assistant", "toolResult", ...).
    #[serde(default)]
    pub role: String,
    /// Message content: a plain string or an array of content blocks.
    #[serde(default)]
    pub content: serde_json::Value,
    /// Token usage for this message, if reported.
    #[serde(default)]
    pub usage: Option<MessageUsage>,
    /// Model that produced the message.
    #[serde(default)]
    pub model: Option<String>,
    /// Stop reason ("end_turn", "stop", "error", "aborted", ...).
    #[serde(default)]
    pub stop_reason: Option<String>,
    /// Error detail when the turn failed.
    #[serde(default)]
    pub error_message: Option<String>,
}

impl AgentMessage {
    /// Extract the plain text of the message.
    ///
    /// Content is either a bare string or an array of blocks where text
    /// blocks carry a `text` field; all other block kinds are skipped.
    #[must_use]
    pub fn text(&self) -> String {
        match &self.content {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(blocks) => blocks
                .iter()
                .filter_map(|b| b.get("text").and_then(serde_json::Value::as_str))
                .collect::<Vec<_>>()
                .join(""),
            _ => String::new(),
        }
    }

    /// Whether this message was authored by the assistant.
    #[must_use]
    pub fn is_assistant(&self) -> bool {
        self.role == "assistant"
    }

    /// Whether the stop reason marks a completed turn.
    #[must_use]
    pub fn ends_turn(&self) -> bool {
        matches!(self.stop_reason.as_deref(), Some("end_turn" | "stop"))
    }

    /// Whether the stop reason marks a failed or aborted turn.
    #[must_use]
    pub fn is_failed_turn(&self) -> bool {
        matches!(self.stop_reason.as_deref(), Some("error" | "aborted"))
    }
}

/// Events emitted by the agent, one JSON object per stdout line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A tool call began.
    ToolExecutionStart(ToolExecution),
    /// A tool call finished.
    ToolExecutionEnd(ToolExecution),
    /// Streaming update inside the assistant's current message.
    MessageUpdate {
        /// The streaming sub-event.
        #[serde(rename = "assistantMessageEvent")]
        assistant_message_event: AssistantMessageEvent,
    },
    /// A message completed.
    MessageEnd {
        /// The completed message.
        message: AgentMessage,
    },
    /// A tool result message completed.
    ToolResultEnd {
        /// The tool result message.
        message: AgentMessage,
    },
    /// Authoritative final result text for the session.
    Result {
        /// The final text.
        #[serde(default)]
        result: String,
    },
    /// Acknowledgement of a stdin command. Carries no data we act on.
    Response {
        /// Whether the command was accepted.
        #[serde(default)]
        success: Option<bool>,
    },
    /// Catch-all for unrecognized event tags.
    #[serde(other)]
    Unknown,
}

impl AgentEvent {
    /// Returns the tool name if this is a tool execution event.
    #[must_use]
    pub fn tool_name(&self) -> Option<&str> {
        match self {
            Self::ToolExecutionStart(t) | Self::ToolExecutionEnd(t) => Some(&t.tool_name),
            _ => None,
        }
    }

    /// Returns true if this is the terminal `result` event.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Result { .. })
    }
}
