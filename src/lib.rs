//! Subagent Runner - subagent process orchestration over a line-delimited event protocol.

pub mod ai;
pub mod cli;
pub mod config;
pub mod display;
pub mod spawn;
