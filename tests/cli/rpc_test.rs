//! Tests for stdin command injection.

use subagent_runner::cli::RpcCommand;

#[test]
fn prompt_serializes_to_protocol_line() {
    let command = RpcCommand::Prompt {
        message: "explore the repo".to_string(),
    };
    assert_eq!(
        serde_json::to_string(&command).unwrap(),
        r#"{"type":"prompt","message":"explore the repo"}"#
    );
}

#[test]
fn follow_up_serializes_to_protocol_line() {
    let command = RpcCommand::FollowUp {
        message: "now write the report".to_string(),
    };
    assert_eq!(
        serde_json::to_string(&command).unwrap(),
        r#"{"type":"follow_up","message":"now write the report"}"#
    );
}

#[cfg(unix)]
mod with_process {
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, BufReader};

    use subagent_runner::cli::{
        AgentEvent, AgentProcess, AgentProcessBuilder, RpcInjector, StreamParser,
    };

    fn fake_agent(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("fake-agent.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn both_commands_reach_the_child_eagerly() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_agent(
            &dir,
            r#"read first
read second
echo '{"type":"result","result":"received both"}'"#,
        );

        let builder = AgentProcessBuilder::interactive();
        let mut process =
            AgentProcess::spawn(&script.display().to_string(), &builder).unwrap();

        let stdin = process.take_stdin().unwrap();
        let stdout = process.take_stdout().unwrap();

        let mut injector = RpcInjector::new(stdin, true);
        injector
            .send_task("explore", Some("write report"))
            .await
            .unwrap();
        assert_eq!(injector.expected_turns(), 2);

        let mut lines = BufReader::new(stdout).lines();
        let line = tokio::time::timeout(Duration::from_secs(5), lines.next_line())
            .await
            .expect("child did not answer")
            .unwrap()
            .unwrap();

        let event = StreamParser::parse_line(&line).unwrap();
        assert_eq!(
            event,
            AgentEvent::Result {
                result: "received both".to_string()
            }
        );

        process.wait().await.unwrap();
    }

    #[tokio::test]
    async fn turn_counting_reaches_expected() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_agent(&dir, "exec cat >/dev/null");

        let builder = AgentProcessBuilder::interactive();
        let mut process =
            AgentProcess::spawn(&script.display().to_string(), &builder).unwrap();
        let stdin = process.take_stdin().unwrap();

        let mut injector = RpcInjector::new(stdin, true);
        assert!(!injector.record_turn_end());
        assert!(injector.record_turn_end());
        assert_eq!(injector.completed_turns(), 2);

        drop(injector);
        let _ = process.wait().await;
    }
}
