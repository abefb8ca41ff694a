//! Progress state machine and snapshot rendering.
//!
//! Tracks the coarse phase of one spawn (booting → exploring → writing),
//! tool counters, the in-flight action and a short history of completed
//! actions. Renders human-readable snapshots for an external progress sink,
//! suppressing unforced renders whose text has not changed.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Progress callback invoked with each rendered snapshot.
pub type ProgressFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Spinner frames cycled from elapsed time.
const SPINNER_FRAMES: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Milliseconds per spinner frame.
const SPINNER_FRAME_MS: u128 = 120;

/// Maximum entries kept in the recent-actions list.
const MAX_RECENT_ACTIONS: usize = 4;

/// Coarse progress classification, ordered by advancement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Process spawned, nothing observed yet.
    #[default]
    Booting,
    /// Tools are running.
    Exploring,
    /// The assistant is producing text.
    Writing,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Self::Booting => "Booting",
            Self::Exploring => "Exploring",
            Self::Writing => "Writing",
        }
    }
}

/// A completed action with a consecutive-repeat count.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RecentAction {
    text: String,
    count: u32,
}

/// Transient progress state owned by one in-flight spawn.
#[derive(Debug)]
pub struct ProgressState {
    started_at: Instant,
    phase: Phase,
    tools_started: u32,
    tools_completed: u32,
    tools_failed: u32,
    current_action: Option<String>,
    recent: VecDeque<RecentAction>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressState {
    /// Create fresh state with the clock started now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            phase: Phase::Booting,
            tools_started: 0,
            tools_completed: 0,
            tools_failed: 0,
            current_action: None,
            recent: VecDeque::new(),
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Advance the phase. Phases never move backwards.
    pub fn advance_to(&mut self, phase: Phase) {
        if phase > self.phase {
            tracing::debug!(from = ?self.phase, to = ?phase, "Phase transition");
            self.phase = phase;
        }
    }

    /// Record a tool start and set its description as the in-flight action.
    pub fn tool_started(&mut self, description: String) {
        self.tools_started = self.tools_started.saturating_add(1);
        self.advance_to(Phase::Exploring);
        self.current_action = Some(description);
    }

    /// Record a tool completion, moving the in-flight action into history.
    ///
    /// `fallback` reconstructs the description when the start was missed.
    pub fn tool_finished(&mut self, failed: bool, fallback: String) {
        self.tools_completed = self.tools_completed.saturating_add(1);
        if failed {
            self.tools_failed = self.tools_failed.saturating_add(1);
        }
        let marker = if failed { "✗" } else { "✓" };
        let action = self.current_action.take().unwrap_or(fallback);
        self.push_recent(format!("{marker} {action}"));
    }

    /// Set the in-flight action label directly.
    pub fn set_current_action(&mut self, action: impl Into<String>) {
        self.current_action = Some(action.into());
    }

    /// Tool counters as (started, completed, failed).
    #[must_use]
    pub fn tool_counts(&self) -> (u32, u32, u32) {
        (self.tools_started, self.tools_completed, self.tools_failed)
    }

    /// Append to the recent-actions list, collapsing consecutive repeats
    /// into a multiplicity count and capping the list length.
    fn push_recent(&mut self, text: String) {
        if let Some(last) = self.recent.back_mut() {
            if last.text == text {
                last.count = last.count.saturating_add(1);
                return;
            }
        }
        self.recent.push_back(RecentAction { text, count: 1 });
        while self.recent.len() > MAX_RECENT_ACTIONS {
            self.recent.pop_front();
        }
    }

    /// Elapsed time since spawn start.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Render a snapshot: spinner, phase header, tool counts, the current
    /// action and the recent-actions list.
    #[must_use]
    pub fn render(&self) -> String {
        self.render_at(self.elapsed())
    }

    /// Render with an explicit elapsed time (deterministic for tests).
    #[must_use]
    pub fn render_at(&self, elapsed: Duration) -> String {
        let frame_idx =
            usize::try_from(elapsed.as_millis() / SPINNER_FRAME_MS).unwrap_or(0) % SPINNER_FRAMES.len();
        let spinner = SPINNER_FRAMES[frame_idx];
        let secs = elapsed.as_secs();

        let mut out = format!(
            "{spinner} {} · {}/{} tools · {secs}s",
            self.phase.label(),
            self.tools_completed,
            self.tools_started
        );
        if let Some(action) = &self.current_action {
            out.push_str("\n  → ");
            out.push_str(action);
        }
        for entry in &self.recent {
            out.push_str("\n  ");
            out.push_str(&entry.text);
            if entry.count > 1 {
                out.push_str(&format!(" (x{})", entry.count));
            }
        }
        out
    }
}

/// De-duplicating forwarder to the external progress sink.
pub struct ProgressReporter {
    callback: Option<ProgressFn>,
    last_emitted: Option<String>,
}

impl ProgressReporter {
    /// Wrap an optional callback.
    #[must_use]
    pub fn new(callback: Option<ProgressFn>) -> Self {
        Self {
            callback,
            last_emitted: None,
        }
    }

    /// Emit a snapshot. Unforced emissions are dropped when the rendered
    /// text matches the previous emission; forced ones always go through.
    pub fn emit(&mut self, rendered: &str, forced: bool) {
        if !forced && self.last_emitted.as_deref() == Some(rendered) {
            return;
        }
        self.last_emitted = Some(rendered.to_string());
        if let Some(callback) = &self.callback {
            callback(rendered);
        }
    }
}

/// Short human-readable description of a tool call: name plus key
/// arguments, truncated for display.
#[must_use]
pub fn describe_tool_call(tool_name: &str, args: &serde_json::Value) -> String {
    let args_text = crate::display::format_tool_args(args, 60);
    if args_text.is_empty() {
        tool_name.to_string()
    } else {
        format!("{tool_name}({args_text})")
    }
}
