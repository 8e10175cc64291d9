use std::fs;

use tdb_common::types::ConsoleChannel;
use tdb_engine::{
    DirectorySnapshotFetcher, LogContext, MemoryConsole, ReplayConfig, ReplayError,
    SnapshotFetcher,
};
use tempfile::TempDir;
use tracing::info;

const BARE: &str = r#"{"extents":[{"collectionType":null,"typeName":"Integer","extent":[{"address":"0x1","symbols":["theInt"],"value":{"value":5}}]}]}"#;
const WRAPPED: &str = r#"{"HeapDump":{"extents":[{"collectionType":null,"typeName":"Integer","extent":[{"address":"0x1","symbols":["theInt"],"value":{"value":5}}]}]}}"#;

fn context(console: &MemoryConsole) -> LogContext {
    let lines = [
        "43.0 APEX_CODE,FINEST;APEX_PROFILING,INFO;VISUALFORCE,FINER;",
        "t|METHOD_ENTRY|[1]|01p|Foo.run()",
        "t|HEAP_DUMP|[10]|07nA|Foo|ns|10",
        "t|HEAP_DUMP|[12]|07nB|Foo|ns|12",
        "t|METHOD_EXIT|[1]|Foo.run()",
    ];
    let mut ctx = LogContext::new(ReplayConfig::default(), lines.into_iter().map(String::from).collect())
        .with_console(Box::new(console.clone()));
    assert!(ctx.scan_for_heap_dumps());
    ctx
}

#[tokio::test]
async fn test_fetch_wrapped_and_bare_payloads() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("07nA.json"), WRAPPED).unwrap();
    fs::write(dir.path().join("07nB.json"), BARE).unwrap();

    let console = MemoryConsole::new();
    let mut ctx = context(&console);
    assert!(ctx.fetch_heap_dumps(&DirectorySnapshotFetcher::new(dir.path())).await);

    let records = ctx.heap_dumps();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|record| record.payload.is_some()));
    assert_eq!(records[0].payload, records[1].payload);

    let listing = console.texts(ConsoleChannel::Console);
    assert_eq!(listing, vec!["Fetching heap dumps: 07nA:Foo:10, 07nB:Foo:12".to_string()]);
    assert!(console.texts(ConsoleChannel::Stderr).is_empty());
}

#[tokio::test]
async fn test_missing_payload_is_reported_once() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("07nA.json"), BARE).unwrap();

    let console = MemoryConsole::new();
    let mut ctx = context(&console);
    assert!(!ctx.fetch_heap_dumps(&DirectorySnapshotFetcher::new(dir.path())).await);

    // The payload that did load is kept.
    assert!(ctx.heap_dumps()[0].payload.is_some());
    assert!(ctx.heap_dumps()[1].payload.is_none());

    let errors = console.texts(ConsoleChannel::Stderr);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("07nB"));
}

#[tokio::test]
async fn test_garbage_payload_fails() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("07nA.json"), "{ not json").unwrap();
    fs::write(dir.path().join("07nB.json"), r#"{"extents":[{"count":1}]}"#).unwrap();

    let fetcher = DirectorySnapshotFetcher::new(dir.path());
    assert!(matches!(fetcher.fetch("07nA").await, Err(ReplayError::Payload(_))));
    assert!(matches!(fetcher.fetch("07nB").await, Err(ReplayError::Payload(_))));
    assert!(matches!(fetcher.fetch("07nC").await, Err(ReplayError::SnapshotNotFound(id)) if id == "07nC"));

    let console = MemoryConsole::new();
    let mut ctx = context(&console);
    assert!(!ctx.fetch_heap_dumps(&fetcher).await);
    assert!(ctx.heap_dumps().iter().all(|record| record.payload.is_none()));
    assert_eq!(console.texts(ConsoleChannel::Stderr).len(), 1);
}

#[tokio::test]
async fn test_nothing_to_fetch() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");
    let console = MemoryConsole::new();
    let mut ctx = LogContext::new(ReplayConfig::default(), vec!["header".to_string()])
        .with_console(Box::new(console.clone()));
    assert!(!ctx.scan_for_heap_dumps());
    assert!(ctx.fetch_heap_dumps(&DirectorySnapshotFetcher::new("/nonexistent")).await);
    assert!(console.messages().is_empty());
}
