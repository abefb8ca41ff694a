//! Command injection over the agent's stdin (interactive transport).
//!
//! Both the prompt and the follow-up are written eagerly at startup: the
//! child queues the follow-up and delivers it once its own turn loop goes
//! idle. Waiting for an acknowledgement before writing would race the
//! child's exit against a late follow-up.

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::ChildStdin;

/// Commands accepted by the agent over stdin, one JSON object per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RpcCommand {
    /// Start the first turn with the task text.
    Prompt {
        /// The task text.
        message: String,
    },
    /// Queue a message for delivery once the agent loop goes idle.
    FollowUp {
        /// The follow-up text.
        message: String,
    },
    /// Abort the current turn. Part of the protocol; never sent by us.
    Abort,
}

/// Writes commands to the child's stdin and tracks expected turns.
#[derive(Debug)]
pub struct RpcInjector {
    stdin: ChildStdin,
    expected_turns: u32,
    completed_turns: u32,
}

impl RpcInjector {
    /// Wrap a stdin handle. `has_follow_up` decides whether one or two
    /// assistant turn-completions are expected before termination.
    #[must_use]
    pub fn new(stdin: ChildStdin, has_follow_up: bool) -> Self {
        Self {
            stdin,
            expected_turns: if has_follow_up { 2 } else { 1 },
            completed_turns: 0,
        }
    }

    /// Write one command as a single JSON line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the stdin write fails.
    pub async fn send(&mut self, command: &RpcCommand) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(command)?;
        line.push(b'\n');
        self.stdin.write_all(&line).await?;
        self.stdin.flush().await
    }

    /// Send the initial prompt followed immediately by the queued follow-up.
    ///
    /// # Errors
    ///
    /// Returns an error if either write fails.
    pub async fn send_task(&mut self, task: &str, follow_up: Option<&str>) -> std::io::Result<()> {
        crate::spawn::debug_trace("send-prompt", task);
        self.send(&RpcCommand::Prompt {
            message: task.to_string(),
        })
        .await?;

        if let Some(text) = follow_up {
            crate::spawn::debug_trace("send-follow-up", text);
            self.send(&RpcCommand::FollowUp {
                message: text.to_string(),
            })
            .await?;
        }
        Ok(())
    }

    /// Record one completed assistant turn.
    ///
    /// Returns true once the expected number of turns has been reached.
    pub fn record_turn_end(&mut self) -> bool {
        self.completed_turns = self.completed_turns.saturating_add(1);
        crate::spawn::debug_trace(
            "turn-end",
            &format!("{}/{}", self.completed_turns, self.expected_turns),
        );
        self.completed_turns >= self.expected_turns
    }

    /// Number of turns expected before termination.
    #[must_use]
    pub fn expected_turns(&self) -> u32 {
        self.expected_turns
    }

    /// Number of turns completed so far.
    #[must_use]
    pub fn completed_turns(&self) -> u32 {
        self.completed_turns
    }
}
