//! Orchestration of one agent invocation: usage accumulation, progress
//! tracking, event interpretation, termination control and the runner that
//! ties them to a live child process.

mod cancel;
mod interpret;
mod progress;
mod runner;
mod usage;

pub use cancel::*;
pub use interpret::*;
pub use progress::*;
pub use runner::*;
pub use usage::*;

/// Environment variable enabling the diagnostic trace side channel.
pub const ENV_DEBUG: &str = "SUBAGENT_RUNNER_DEBUG";

/// Write a single-line diagnostic trace of an internal event.
///
/// Emitted on stderr only when [`ENV_DEBUG`] is set; always mirrored to
/// `tracing` at debug level. Purely observational, never parsed back in.
pub fn debug_trace(kind: &str, detail: &str) {
    tracing::debug!(kind, detail, "subagent trace");
    if std::env::var_os(ENV_DEBUG).is_some() {
        eprintln!("[subagent:{kind}] {detail}");
    }
}
