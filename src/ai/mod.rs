//! One-off completion client for session titles and handoff summaries.

mod client;

pub use client::*;

/// System prompt for generating a short session title from a task.
pub const TITLE_SYSTEM_PROMPT: &str = "\
You generate short titles for coding-agent sessions. Reply with a single \
line of at most eight words summarizing the task. No quotes, no trailing \
punctuation.";

/// System prompt for generating a handoff summary of a finished session.
pub const HANDOFF_SYSTEM_PROMPT: &str = "\
You summarize a finished coding-agent session for the next developer. \
Reply with a short paragraph covering what was attempted, what was \
produced, and anything left unfinished. Plain text only.";
