//! End-to-end runner tests against scripted fake agents.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use subagent_runner::spawn::{SpawnConfig, SpawnResult, Spawner, EXIT_ABORTED};

/// Write an executable shell script acting as the agent binary.
fn fake_agent(dir: &tempfile::TempDir, body: &str) -> String {
    let path = dir.path().join("fake-agent.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.display().to_string()
}

async fn run(spawner: Spawner, config: SpawnConfig) -> SpawnResult {
    tokio::time::timeout(Duration::from_secs(20), spawner.run(config))
        .await
        .expect("spawn did not finish in time")
        .expect("spawn failed")
}

#[tokio::test]
async fn one_shot_success_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_agent(
        &dir,
        r#"echo '{"type":"message_end","message":{"role":"assistant","content":"listed","usage":{"input":10,"output":5},"model":"agent-large","stopReason":"end_turn"}}'"#,
    );

    let config = SpawnConfig::new(dir.path(), "list files");
    let result = run(Spawner::with_binary(script), config).await;

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.usage.input_tokens, 10);
    assert_eq!(result.usage.output_tokens, 5);
    assert_eq!(result.usage.turns, 1);
    assert_eq!(result.model.as_deref(), Some("agent-large"));
    assert_eq!(result.stop_reason.as_deref(), Some("end_turn"));
    assert_eq!(result.final_text().as_deref(), Some("listed"));
    assert!(result.is_success());
}

#[tokio::test]
async fn result_event_overrides_assistant_text() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_agent(
        &dir,
        r#"echo '{"type":"message_end","message":{"role":"assistant","content":"draft"}}'
echo '{"type":"result","result":"authoritative"}'"#,
    );

    let config = SpawnConfig::new(dir.path(), "task");
    let result = run(Spawner::with_binary(script), config).await;

    assert_eq!(result.final_text().as_deref(), Some("authoritative"));
    assert_eq!(result.messages.len(), 1);
}

#[tokio::test]
async fn stdout_overflow_terminates_with_annotation() {
    let dir = tempfile::tempdir().unwrap();
    // Emit well over the limit, then linger so only termination ends us.
    let script = fake_agent(
        &dir,
        r#"head -c 8192 /dev/zero | tr '\0' 'x'
echo
exec sleep 30"#,
    );

    let config = SpawnConfig::new(dir.path(), "task");
    let spawner = Spawner::with_binary(script)
        .limits(1024, 256 * 1024)
        .grace_period(Duration::from_secs(2));
    let result = run(spawner, config).await;

    assert_ne!(result.exit_code, 0);
    assert!(
        result.stderr.contains("exceeded 1024 bytes"),
        "stderr was: {}",
        result.stderr
    );
}

#[tokio::test]
async fn stderr_overflow_truncates_and_terminates() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_agent(
        &dir,
        r#"head -c 8192 /dev/zero | tr '\0' 'e' 1>&2
exec sleep 30"#,
    );

    let config = SpawnConfig::new(dir.path(), "task");
    let spawner = Spawner::with_binary(script)
        .limits(1024 * 1024, 512)
        .grace_period(Duration::from_secs(2));
    let result = run(spawner, config).await;

    assert_ne!(result.exit_code, 0);
    assert!(result.stderr.contains("exceeded 512 bytes"));
    // Payload was truncated to the threshold before annotation.
    assert!(result.stderr.len() < 2048);
}

#[tokio::test]
async fn interactive_two_turns_normalizes_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_agent(
        &dir,
        r#"read first
echo '{"type":"message_end","message":{"role":"assistant","content":"explored","usage":{"input":5,"output":2},"stopReason":"end_turn"}}'
read second
echo '{"type":"message_end","message":{"role":"assistant","content":"report written","stopReason":"end_turn"}}'
exec sleep 30"#,
    );

    let config = SpawnConfig::new(dir.path(), "explore").with_follow_up("write report");
    let spawner = Spawner::with_binary(script).grace_period(Duration::from_secs(2));
    let result = run(spawner, config).await;

    // The kill was our own doing after the expected turns; success.
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.usage.turns, 2);
    assert_eq!(result.messages.len(), 2);
    assert_eq!(result.final_text().as_deref(), Some("report written"));
}

#[tokio::test]
async fn interactive_error_turn_terminates_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_agent(
        &dir,
        r#"read first
echo '{"type":"message_end","message":{"role":"assistant","content":"","stopReason":"error","errorMessage":"model refused"}}'
exec sleep 30"#,
    );

    let config = SpawnConfig::new(dir.path(), "explore").with_follow_up("write report");
    let spawner = Spawner::with_binary(script).grace_period(Duration::from_secs(2));
    let result = run(spawner, config).await;

    assert_ne!(result.exit_code, 0);
    assert_eq!(result.stop_reason.as_deref(), Some("error"));
    assert_eq!(result.error.as_deref(), Some("model refused"));
}

#[tokio::test]
async fn pre_cancelled_token_aborts_promptly() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_agent(&dir, "exec sleep 30");

    let cancel = CancellationToken::new();
    cancel.cancel();

    let config = SpawnConfig::new(dir.path(), "task").with_cancellation(cancel);
    let spawner = Spawner::with_binary(script).grace_period(Duration::from_secs(2));

    let started = std::time::Instant::now();
    let result = run(spawner, config).await;

    assert_eq!(result.exit_code, EXIT_ABORTED);
    assert_eq!(result.stop_reason.as_deref(), Some("aborted"));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn cancellation_mid_flight_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_agent(&dir, "exec sleep 30");

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let config = SpawnConfig::new(dir.path(), "task").with_cancellation(cancel);
    let spawner = Spawner::with_binary(script).grace_period(Duration::from_secs(2));
    let result = run(spawner, config).await;

    assert_eq!(result.exit_code, EXIT_ABORTED);
    assert_eq!(result.stop_reason.as_deref(), Some("aborted"));
}

#[tokio::test]
async fn sigterm_ignoring_child_is_force_killed() {
    let dir = tempfile::tempdir().unwrap();
    // Trap and ignore SIGTERM; only SIGKILL after the grace period ends it.
    let script = fake_agent(
        &dir,
        r#"trap '' TERM
read first
echo '{"type":"message_end","message":{"role":"assistant","content":"a","stopReason":"end_turn"}}'
read second
echo '{"type":"message_end","message":{"role":"assistant","content":"b","stopReason":"end_turn"}}'
sleep 30 >/dev/null 2>&1"#,
    );

    let config = SpawnConfig::new(dir.path(), "explore").with_follow_up("more");
    let spawner = Spawner::with_binary(script).grace_period(Duration::from_millis(500));

    let started = std::time::Instant::now();
    let result = run(spawner, config).await;

    // Still normalized: the turns completed, the kill was ours.
    assert_eq!(result.exit_code, 0);
    assert!(started.elapsed() < Duration::from_secs(15));
}

#[tokio::test]
async fn progress_snapshots_reach_the_sink() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_agent(
        &dir,
        r#"echo '{"type":"tool_execution_start","toolName":"read_file","args":{"path":"src/lib.rs"},"toolCallId":"1"}'
echo '{"type":"tool_execution_end","toolName":"read_file","args":{"path":"src/lib.rs"},"toolCallId":"1"}'
echo '{"type":"message_end","message":{"role":"assistant","content":"done","stopReason":"end_turn"}}'"#,
    );

    let snapshots = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&snapshots);

    let mut config = SpawnConfig::new(dir.path(), "task");
    config.on_progress = Some(Arc::new(move |s: &str| {
        sink.lock().unwrap().push(s.to_string());
    }));

    let result = run(Spawner::with_binary(script), config).await;
    assert_eq!(result.exit_code, 0);

    let snapshots = snapshots.lock().unwrap();
    assert!(snapshots.iter().any(|s| s.contains("read_file")));
    assert!(snapshots.iter().any(|s| s.contains("✓")));
    assert!(snapshots.iter().any(|s| s == "done"));
}

#[tokio::test]
async fn events_split_across_chunks_still_decode() {
    let dir = tempfile::tempdir().unwrap();
    // printf without trailing newline, then finish the line after a pause.
    let script = fake_agent(
        &dir,
        r#"printf '{"type":"message_end","message":{"role":"assistant","con'
sleep 0.2
printf 'tent":"split","stopReason":"end_turn"}}\n'"#,
    );

    let config = SpawnConfig::new(dir.path(), "task");
    let result = run(Spawner::with_binary(script), config).await;

    assert_eq!(result.messages.len(), 1);
    assert_eq!(result.final_text().as_deref(), Some("split"));
}

#[tokio::test]
async fn malformed_lines_do_not_break_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_agent(
        &dir,
        r#"echo 'this is not json'
echo '{"broken":'
echo '{"type":"message_end","message":{"role":"assistant","content":"fine","stopReason":"end_turn"}}'"#,
    );

    let config = SpawnConfig::new(dir.path(), "task");
    let result = run(Spawner::with_binary(script), config).await;

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.messages.len(), 1);
}

#[tokio::test]
async fn concurrent_spawns_do_not_interfere() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_agent(
        &dir,
        r#"echo '{"type":"message_end","message":{"role":"assistant","content":"hello","usage":{"input":1,"output":1},"stopReason":"end_turn"}}'"#,
    );

    let spawner = Spawner::with_binary(script);
    let a = spawner.run(SpawnConfig::new(dir.path(), "a"));
    let b = spawner.run(SpawnConfig::new(dir.path(), "b"));

    let (a, b) = tokio::join!(a, b);
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.usage.turns, 1);
    assert_eq!(b.usage.turns, 1);
}
