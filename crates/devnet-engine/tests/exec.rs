//! Integration tests for command execution inside containers.

use std::time::Duration;

use devnet_common::{DevnetError, EngineError};
use devnet_engine::{CancellationToken, CommandExecutor, ExecRequest};
use devnet_test_utils::{MockEngine, Operation};
use tokio::time::Instant;

const COMMAND_DURATION: Duration = Duration::from_secs(5);

fn setup() -> (std::sync::Arc<MockEngine>, CommandExecutor) {
    let engine = MockEngine::new();
    engine.add_container("metricbeat", "docker.elastic.co/beats/metricbeat:7.5.0", &[]);
    engine.set_exec_duration(COMMAND_DURATION);
    let executor = CommandExecutor::new(engine.client());
    (engine, executor)
}

#[tokio::test(start_paused = true)]
async fn test_detached_exec_returns_immediately() {
    let (engine, executor) = setup();
    let request = ExecRequest::new("metricbeat", ["metricbeat", "-e"])
        .as_user("root")
        .detached(true);

    let started = Instant::now();
    let handle = executor
        .exec(&CancellationToken::new(), &request)
        .await
        .unwrap();

    assert_eq!(started.elapsed(), Duration::ZERO);
    assert!(handle.detached);
    assert_eq!(handle.container, "metricbeat");

    let status = executor.status(&handle).await.unwrap();
    assert!(status.running);
    assert_eq!(status.exit_code, None);

    let spec = engine.exec_spec(&handle.id).unwrap();
    assert_eq!(spec.user, "root");
    assert_eq!(spec.cmd, vec!["metricbeat", "-e"]);
    assert!(!spec.tty);
    assert!(spec.detach);
}

#[tokio::test(start_paused = true)]
async fn test_attached_exec_waits_for_completion() {
    let (engine, executor) = setup();
    let request = ExecRequest::new("metricbeat", ["metricbeat", "setup"]);

    let started = Instant::now();
    let handle = executor
        .exec(&CancellationToken::new(), &request)
        .await
        .unwrap();

    assert!(started.elapsed() >= COMMAND_DURATION);
    assert!(!engine.exec_spec(&handle.id).unwrap().detach);
    let status = executor.status(&handle).await.unwrap();
    assert!(!status.running);
    assert_eq!(status.exit_code, Some(0));
}

#[tokio::test(start_paused = true)]
async fn test_detached_exec_can_be_polled_to_completion() {
    let (_engine, executor) = setup();
    let request = ExecRequest::new("metricbeat", ["sleep", "5"]).detached(true);

    let handle = executor
        .exec(&CancellationToken::new(), &request)
        .await
        .unwrap();
    tokio::time::sleep(COMMAND_DURATION).await;

    let status = executor.status(&handle).await.unwrap();
    assert!(!status.running);
    assert_eq!(status.exit_code, Some(0));
}

#[tokio::test]
async fn test_exec_in_stopped_container_fails_at_create() {
    let (engine, executor) = setup();
    engine.stop_container("metricbeat");

    let err = executor
        .exec(
            &CancellationToken::new(),
            &ExecRequest::new("metricbeat", ["true"]),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DevnetError::ExecCreate {
            source: EngineError::Conflict { .. },
            ..
        }
    ));
    assert!(!err.is_fatal());
    assert_eq!(engine.calls(Operation::StartExec), 0);
}

#[tokio::test]
async fn test_exec_start_failure_is_returned() {
    let (engine, executor) = setup();
    engine.fail(
        Operation::StartExec,
        EngineError::Api {
            status: 500,
            message: "OCI runtime exec failed".to_string(),
        },
    );

    let err = executor
        .exec(
            &CancellationToken::new(),
            &ExecRequest::new("metricbeat", ["missing-binary"]),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DevnetError::ExecStart { .. }));
    assert_eq!(engine.calls(Operation::CreateExec), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_waiting() {
    let (engine, executor) = setup();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = executor
        .exec(&cancel, &ExecRequest::new("metricbeat", ["sleep", "5"]))
        .await
        .unwrap_err();

    assert!(matches!(err, DevnetError::Cancelled { .. }));
    assert!(started.elapsed() < COMMAND_DURATION);
    assert_eq!(engine.calls(Operation::StartExec), 1);
}

#[tokio::test]
async fn test_cancelled_before_start_submits_nothing() {
    let (engine, executor) = setup();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = executor
        .exec(&cancel, &ExecRequest::new("metricbeat", ["true"]))
        .await
        .unwrap_err();

    assert!(matches!(err, DevnetError::Cancelled { .. }));
    assert_eq!(engine.calls(Operation::CreateExec), 0);
}
