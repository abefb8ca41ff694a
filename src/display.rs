//! Colored terminal output for the runner CLI.
//!
//! The formatting helpers (`truncate`, `format_tool_args`) are also used by
//! the interpreter to build tool-call descriptions for progress snapshots.

use std::io::{self, Write};

use owo_colors::OwoColorize;

/// Maximum length for truncated display strings.
const DEFAULT_MAX_LEN: usize = 80;

/// Truncate a string to a maximum length, adding ellipsis if truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let cut: String = s.chars().take(max_len - 3).collect();
        format!("{cut}...")
    }
}

/// Format tool arguments for display, truncating long values.
#[must_use]
pub fn format_tool_args(args: &serde_json::Value, max_len: usize) -> String {
    match args {
        serde_json::Value::Object(map) => {
            let pairs: Vec<String> = map
                .iter()
                .map(|(k, v)| {
                    let value_str = match v {
                        serde_json::Value::String(s) => truncate(s, max_len),
                        other => truncate(&other.to_string(), max_len),
                    };
                    format!("{k}={value_str}")
                })
                .collect();
            truncate(&pairs.join(", "), DEFAULT_MAX_LEN)
        }
        serde_json::Value::Null => String::new(),
        other => truncate(&other.to_string(), DEFAULT_MAX_LEN),
    }
}

/// Print spawn start information.
pub fn print_spawn_start(binary: &str, task: &str, interactive: bool) {
    let mode = if interactive { "interactive" } else { "one-shot" };
    println!(
        "{} {} ({}) task: {}",
        "[SPAWN]".blue().bold(),
        binary.cyan(),
        mode.dimmed(),
        truncate(task, DEFAULT_MAX_LEN)
    );
    let _ = io::stdout().flush();
}

/// Print a progress snapshot, replacing the notion of a live spinner with
/// one line per render.
pub fn print_progress(snapshot: &str) {
    println!("{}", snapshot.dimmed());
    let _ = io::stdout().flush();
}

/// Print spawn completion information.
pub fn print_spawn_end(exit_code: i32, cost_usd: f64, turns: u32) {
    if exit_code == 0 {
        println!(
            "{} exit {} (cost: ${:.4}, turns: {})",
            "[DONE]".green().bold(),
            exit_code,
            cost_usd,
            turns
        );
    } else {
        println!(
            "{} exit {} (cost: ${:.4}, turns: {})",
            "[FAIL]".red().bold(),
            exit_code,
            cost_usd,
            turns
        );
    }
    let _ = io::stdout().flush();
}

/// Print the final output text.
pub fn print_final_text(text: &str) {
    println!("{text}");
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
    let _ = io::stderr().flush();
}
