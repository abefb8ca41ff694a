//! CLI module tests.

mod process_test;
mod rpc_test;

/// Verify all public cli types are exported from the library.
#[test]
fn test_all_cli_types_exported() {
    use subagent_runner::cli::{
        AgentEvent, AgentMessage, AgentProcess, AgentProcessBuilder, RpcCommand, RpcInjector,
        SpawnError, StreamError, StreamParser, ToolExecution, Transport,
    };

    let _ = StreamParser::new();
    let _ = AgentProcessBuilder::one_shot("task");
    let _ = Transport::OneShot;
    let _ = AgentEvent::Unknown;

    let _: fn() -> SpawnError = || SpawnError::NotFound;
    let _: fn(&str) -> Result<AgentEvent, StreamError> = StreamParser::parse_line;
    let _: fn(ToolExecution) -> AgentEvent = AgentEvent::ToolExecutionStart;
    let _: fn(AgentMessage) -> AgentEvent = |message| AgentEvent::MessageEnd { message };
    let _ = RpcCommand::Abort;
    let _: Option<RpcInjector> = None;
    let _: Option<AgentProcess> = None;
}
