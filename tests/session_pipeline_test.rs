mod common;

use common::{exited, MockExecutor};
use report_etl::{AppConfig, EtlEngine, EtlError, LocalStorage, SessionLoadPipeline};
use std::fs;
use tempfile::TempDir;

const STATUS: &str = "\nstatus\n";
const PUT: &str = "put 'sessions'";
const ALTER: &str = "alter 'sessions'";

fn write_exports(dir: &TempDir) {
    fs::write(
        dir.path().join("sessions_01.json"),
        r#"[
            {"session_id": "sess_001", "user_id": "user_000042", "timestamp": "2025-03-01T10:00:00",
             "city": "Kigali", "country": "RW", "device_type": "mobile", "duration": 320,
             "events": [{"type": "view", "product_id": "prod_00123"}]},
            {"session_id": "sess_002", "user_id": "user_000173", "city": "O'Fallon"}
        ]"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("sessions_02.json"),
        r#"{"session_id": "sess_003", "user_id": "user_000245", "device_type": "tablet"}"#,
    )
    .unwrap();
    fs::write(dir.path().join("sessions_03.json"), "{ not json").unwrap();
    fs::write(dir.path().join("products.json"), "[]").unwrap();
}

fn pipeline(
    dir: &TempDir,
    executor: MockExecutor,
) -> SessionLoadPipeline<LocalStorage, MockExecutor, AppConfig> {
    SessionLoadPipeline::new(LocalStorage::new(dir.path()), executor, AppConfig::default())
}

#[tokio::test]
async fn test_loads_one_batch_per_readable_file() {
    let dir = TempDir::new().unwrap();
    write_exports(&dir);
    let executor = MockExecutor::new()
        .on(STATUS, exited(0, "1 active master, 0 backup masters"))
        .on(ALTER, exited(0, "Updating all regions with the new schema..."))
        .on(PUT, exited(0, "Took 0.0100 seconds"));
    let probe = executor.clone();

    let summary = EtlEngine::new(pipeline(&dir, executor)).run().await.unwrap();

    assert_eq!(summary.written, vec!["sessions_01.json", "sessions_02.json"]);
    assert!(summary.failed.is_empty());

    let commands = probe.commands();
    assert!(commands[0].contains(STATUS));
    assert!(commands[1].contains(
        "alter 'sessions', {NAME => 'meta', VERSIONS => 1}, {NAME => 'geo', VERSIONS => 1}, \
         {NAME => 'device', VERSIONS => 1}, {NAME => 'stats', VERSIONS => 1}, \
         {NAME => 'events', VERSIONS => 1}"
    ));
    assert_eq!(probe.count_matching(PUT), 2);

    let first = &commands[2];
    assert!(first.contains("put 'sessions', 'sess_001', 'meta:user_id', 'user_000042'"));
    assert!(first.contains("put 'sessions', 'sess_001', 'stats:duration', '320'"));
    assert!(first.contains(
        r#"put 'sessions', 'sess_001', 'events:log', '[{"type":"view","product_id":"prod_00123"}]'"#
    ));
    assert!(first.contains(r"put 'sessions', 'sess_002', 'geo:city', 'O\'Fallon'"));
    assert!(first.contains("put 'sessions', 'sess_002', 'stats:duration', '0'"));
    assert!(first.contains("put 'sessions', 'sess_002', 'events:log', '[]'"));

    let second = &commands[3];
    assert!(second.contains("put 'sessions', 'sess_003', 'device:type', 'tablet'"));
}

#[tokio::test]
async fn test_connection_failure_is_fatal() {
    let dir = TempDir::new().unwrap();
    write_exports(&dir);
    let executor = MockExecutor::new().on(PUT, exited(0, ""));
    let probe = executor.clone();

    let err = EtlEngine::new(pipeline(&dir, executor))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, EtlError::ConnectionError { .. }));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(probe.commands().len(), 1);
    assert_eq!(probe.count_matching(PUT), 0);
}

#[tokio::test]
async fn test_failed_batch_is_recorded_and_run_continues() {
    let dir = TempDir::new().unwrap();
    write_exports(&dir);
    let executor = MockExecutor::new()
        .on(STATUS, exited(0, "ok"))
        .on("'sess_003'", exited(1, "ERROR: Unknown table sessions!"))
        .on(PUT, exited(0, ""));

    let summary = EtlEngine::new(pipeline(&dir, executor)).run().await.unwrap();

    assert_eq!(summary.written, vec!["sessions_01.json"]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, "sessions_02.json");
}

#[tokio::test]
async fn test_empty_input_directory_loads_nothing() {
    let dir = TempDir::new().unwrap();
    let executor = MockExecutor::new().on(STATUS, exited(0, "ok"));

    let probe = executor.clone();

    let summary = EtlEngine::new(pipeline(&dir, executor)).run().await.unwrap();
    assert!(summary.written.is_empty());
    assert!(summary.is_complete());
    assert_eq!(probe.count_matching(ALTER), 0);
}

#[tokio::test]
async fn test_family_setup_failure_does_not_stop_the_load() {
    let dir = TempDir::new().unwrap();
    write_exports(&dir);
    let executor = MockExecutor::new()
        .on(STATUS, exited(0, "ok"))
        .on(ALTER, exited(1, "ERROR: Table sessions is disabled"))
        .on(PUT, exited(0, ""));

    let summary = EtlEngine::new(pipeline(&dir, executor)).run().await.unwrap();
    assert_eq!(summary.written, vec!["sessions_01.json", "sessions_02.json"]);
    assert!(summary.is_complete());
}
