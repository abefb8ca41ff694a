//! Tests for agent process spawning and control.

use subagent_runner::cli::{AgentProcess, AgentProcessBuilder, Transport};

#[test]
fn one_shot_builder_shape() {
    let builder = AgentProcessBuilder::one_shot("fix the bug")
        .model("agent-large")
        .allowed_tools(&["read_file".to_string(), "bash".to_string()]);
    let args = builder.build_args();

    assert_eq!(builder.transport(), Transport::OneShot);
    assert!(args.contains(&"--mode".to_string()));
    assert!(args.contains(&"json".to_string()));
    assert!(args.contains(&"--no-session".to_string()));
    assert!(args.contains(&"--model".to_string()));
    assert!(args.contains(&"read_file,bash".to_string()));
    assert_eq!(args.last().map(String::as_str), Some("fix the bug"));
}

#[test]
fn interactive_builder_shape() {
    let builder = AgentProcessBuilder::interactive();
    let args = builder.build_args();

    assert_eq!(builder.transport(), Transport::Interactive);
    assert!(args.contains(&"rpc".to_string()));
    assert!(!args.iter().any(|a| a.contains("fix")));
}

#[test]
fn builder_is_clone() {
    let builder = AgentProcessBuilder::one_shot("task").model("m");
    let cloned = builder.clone();
    assert_eq!(builder.build_args(), cloned.build_args());
}

#[tokio::test]
async fn spawn_echo_and_wait() {
    let builder = AgentProcessBuilder::one_shot("ignored");
    // echo ignores the protocol flags and just exits successfully.
    let result = AgentProcess::spawn("echo", &builder);

    assert!(result.is_ok());
    let mut process = result.unwrap();
    assert!(process.id().is_some());

    let status = process.wait().await;
    assert!(status.is_ok());
    assert!(status.unwrap().success());
}

#[tokio::test]
async fn spawn_nonexistent_binary_fails() {
    let builder = AgentProcessBuilder::one_shot("task");
    let result = AgentProcess::spawn("definitely-not-a-real-binary-xyz", &builder);
    assert!(result.is_err());
}

#[tokio::test]
async fn take_stdout_once() {
    let builder = AgentProcessBuilder::one_shot("hello");
    let mut process = AgentProcess::spawn("echo", &builder).unwrap();

    assert!(process.take_stdout().is_some());
    assert!(process.take_stdout().is_none());

    process.wait().await.unwrap();
}

#[tokio::test]
async fn one_shot_has_no_stdin() {
    let builder = AgentProcessBuilder::one_shot("hello");
    let mut process = AgentProcess::spawn("echo", &builder).unwrap();

    assert!(process.take_stdin().is_none());
    process.wait().await.unwrap();
}

#[tokio::test]
async fn interactive_has_stdin() {
    let builder = AgentProcessBuilder::interactive();
    let mut process = AgentProcess::spawn("cat", &builder).unwrap();

    let stdin = process.take_stdin();
    assert!(stdin.is_some());

    drop(stdin);
    let _ = process.wait().await;
}
