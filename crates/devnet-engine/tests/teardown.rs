//! Integration tests for container removal and environment teardown.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use devnet_common::{DevnetConfig, DevnetError, EngineConfig, EngineError};
use devnet_engine::{ContainerEngine, ContainerRemover, DevEnvironment, RuntimeClient};
use devnet_test_utils::{MockEngine, Operation};

#[tokio::test]
async fn test_remove_running_container() {
    let engine = MockEngine::new();
    engine.add_container("mysql", "mysql:5.7", &[]);
    let remover = ContainerRemover::new(engine.client());

    remover.remove("mysql").await.unwrap();

    assert!(!engine.has_container("mysql"));
}

#[tokio::test]
async fn test_remove_missing_container() {
    let engine = MockEngine::new();
    let remover = ContainerRemover::new(engine.client());

    let err = remover.remove("mysql").await.unwrap_err();

    assert!(matches!(err, DevnetError::ContainerRemove { .. }));
    assert!(err.engine_error().is_some_and(EngineError::is_not_found));
}

#[test_log::test(tokio::test)]
async fn test_teardown_removes_containers_before_network() {
    let engine = MockEngine::new();
    engine.add_container("mysql", "mysql:5.7", &[]);
    engine.add_container("metricbeat", "metricbeat:7.5.0", &[]);
    let env = DevEnvironment::new(engine.client(), &DevnetConfig::default());

    env.network().get_dev_network().await.unwrap();
    env.network().attach("mysql", ["mysql"]).await.unwrap();
    env.network().attach("metricbeat", ["metricbeat"]).await.unwrap();

    env.teardown(&["mysql", "metricbeat"]).await.unwrap();

    assert!(!engine.has_container("mysql"));
    assert!(!engine.has_container("metricbeat"));
    assert!(!engine.has_network("elastic-dev-network"));
    assert_eq!(
        engine.call_log().last(),
        Some(&Operation::RemoveNetwork)
    );
}

#[tokio::test]
async fn test_teardown_stops_at_first_failure() {
    let engine = MockEngine::new();
    engine.add_container("mysql", "mysql:5.7", &[]);
    let env = DevEnvironment::new(engine.client(), &DevnetConfig::default());
    env.network().get_dev_network().await.unwrap();
    env.network().attach("mysql", ["mysql"]).await.unwrap();

    let err = env.teardown(&["ghost", "mysql"]).await.unwrap_err();

    assert!(matches!(err, DevnetError::ContainerRemove { .. }));
    assert!(engine.has_container("mysql"));
    assert!(engine.has_network("elastic-dev-network"));
    assert_eq!(engine.calls(Operation::RemoveNetwork), 0);
}

#[tokio::test]
async fn test_client_connects_once() {
    let engine = MockEngine::new();
    let connects = Arc::new(AtomicUsize::new(0));

    let client = {
        let engine = Arc::clone(&engine);
        let connects = Arc::clone(&connects);
        RuntimeClient::with_connector(EngineConfig::default(), move |_| {
            connects.fetch_add(1, Ordering::SeqCst);
            let engine: Arc<dyn ContainerEngine> = engine.clone();
            Ok(engine)
        })
    };
    assert!(!client.is_connected());

    let env = DevEnvironment::new(client.clone(), &DevnetConfig::default());
    env.network().get_dev_network().await.unwrap();
    env.inspector().find("mysql").await.unwrap();
    client.ping().await.unwrap();

    assert!(client.is_connected());
    assert_eq!(connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_client_init_failure_is_fatal() {
    let client = RuntimeClient::with_connector(EngineConfig::default(), |_| {
        Err(EngineError::Transport {
            message: "unsupported host".to_string(),
        })
    });
    let env = DevEnvironment::new(client, &DevnetConfig::default());

    let err = env.network().get_dev_network().await.unwrap_err();

    assert!(matches!(err, DevnetError::ClientInit { ref version, .. } if version == "1.39"));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_unreachable_engine() {
    let engine = MockEngine::new();
    engine.fail(
        Operation::Ping,
        EngineError::Transport {
            message: "connection refused".to_string(),
        },
    );

    let err = engine.client().ping().await.unwrap_err();

    assert!(matches!(err, DevnetError::Unreachable { .. }));
}
