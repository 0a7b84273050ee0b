mod common;

use common::{exited, MockExecutor, MockStorage};
use report_etl::{AppConfig, EtlEngine, HBaseDemoPipeline};

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.hbase.startup_wait_seconds = 0;
    config
}

#[tokio::test]
async fn test_demo_starts_container_and_records_queries() {
    let scan_all = "ROW  COLUMN+CELL\n user_000042_001 column=meta:user_id, value=user_000042\n"
        .repeat(20);
    let executor = MockExecutor::new()
        .on("docker ps", exited(0, ""))
        .on("docker start hbase", exited(0, "hbase\n"))
        .on("PrefixFilter('user_000042')", exited(0, "2 row(s)\n"))
        .on("scan 'sessions'", exited(0, &scan_all))
        .on("count 'sessions'", exited(0, "3 row(s)\n"))
        .on("create 'sessions'", exited(1, "ERROR: Table already exists: sessions!"))
        .on("put 'sessions'", exited(0, ""));
    let probe = executor.clone();
    let storage = MockStorage::new();

    let summary = EtlEngine::new(HBaseDemoPipeline::new(storage.clone(), executor, config()))
        .run()
        .await
        .unwrap();
    assert_eq!(summary.written, vec!["hbase_results/query_output.txt"]);

    assert_eq!(probe.count_matching("docker start hbase"), 1);
    let commands = probe.commands();
    let create = commands
        .iter()
        .find(|c| c.contains("create 'sessions'"))
        .unwrap();
    assert!(create.contains("{NAME => 'device', VERSIONS => 1}"));
    let puts = commands.iter().find(|c| c.contains("put 'sessions'")).unwrap();
    assert_eq!(puts.matches("put 'sessions'").count(), 12);

    let output = storage
        .get_text("hbase_results/query_output.txt")
        .await
        .unwrap();
    assert!(output.contains("--- QUERY 2: Get sessions for user_000042 ---\n2 row(s)"));
    assert!(output.contains("--- QUERY 3: Count total sessions ---\n3 row(s)"));
    // The file keeps the full scan; only the console view is shortened.
    assert!(output.contains(scan_all.trim_end()));
}

#[tokio::test]
async fn test_running_container_is_not_restarted() {
    let executor = MockExecutor::new()
        .on("docker ps", exited(0, "hbase\n"))
        .on("hbase shell", exited(0, ""));
    let probe = executor.clone();

    EtlEngine::new(HBaseDemoPipeline::new(MockStorage::new(), executor, config()))
        .run()
        .await
        .unwrap();
    assert_eq!(probe.count_matching("docker start"), 0);
}

#[tokio::test]
async fn test_failed_queries_are_reported_in_output() {
    let storage = MockStorage::new();
    EtlEngine::new(HBaseDemoPipeline::new(storage.clone(), MockExecutor::new(), config()))
        .run()
        .await
        .unwrap();

    let output = storage
        .get_text("hbase_results/query_output.txt")
        .await
        .unwrap();
    assert!(output.contains("[query failed: could not start: docker: not found]"));
}
