//! Escalating termination control.
//!
//! One `Terminator` per spawn tracks whether termination has been requested,
//! why, and when the forced-kill deadline expires. The runner owns the child
//! handle, so the terminator only arms state; the runner sends the signals.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

/// Grace period between the graceful request and the forced kill.
pub const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Why the child process was asked to terminate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateReason {
    /// The external cancellation signal fired.
    Cancelled,
    /// Accumulated stdout exceeded its byte threshold.
    StdoutOverflow,
    /// Accumulated stderr exceeded its byte threshold.
    StderrOverflow,
    /// Interactive transport observed the expected number of turns.
    TurnsComplete,
    /// Interactive transport observed an error or aborted turn.
    TurnError,
}

impl fmt::Display for TerminateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Cancelled => "cancelled",
            Self::StdoutOverflow => "stdout overflow",
            Self::StderrOverflow => "stderr overflow",
            Self::TurnsComplete => "turns complete",
            Self::TurnError => "turn error",
        };
        f.write_str(s)
    }
}

/// Idempotent termination state for one spawn.
#[derive(Debug)]
pub struct Terminator {
    grace: Duration,
    reason: Option<TerminateReason>,
    deadline: Option<Instant>,
    killed: bool,
}

impl Terminator {
    /// Create with the given grace period.
    #[must_use]
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            reason: None,
            deadline: None,
            killed: false,
        }
    }

    /// Request termination.
    ///
    /// The first request wins: it records the reason, arms the forced-kill
    /// deadline and returns true so the caller sends the graceful signal.
    /// Every later request is a no-op returning false.
    pub fn request(&mut self, reason: TerminateReason) -> bool {
        if self.reason.is_some() {
            return false;
        }
        crate::spawn::debug_trace("kill", &reason.to_string());
        tracing::info!(%reason, grace = ?self.grace, "Requesting agent termination");
        self.reason = Some(reason);
        self.deadline = Some(Instant::now() + self.grace);
        true
    }

    /// The armed forced-kill deadline, if a graceful request is pending.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        if self.killed {
            None
        } else {
            self.deadline
        }
    }

    /// Record that the forced kill was issued; disarms the deadline so it
    /// fires at most once.
    pub fn mark_killed(&mut self) {
        if !self.killed {
            crate::spawn::debug_trace("kill", "grace period expired, forcing");
        }
        self.killed = true;
    }

    /// The winning termination reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<TerminateReason> {
        self.reason
    }

    /// Whether the forced kill was issued.
    #[must_use]
    pub fn forced(&self) -> bool {
        self.killed
    }
}
