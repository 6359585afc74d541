//! Failure injection tests for the log stream.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics_sidecar::streaming::{LogLevel, ScriptedSource, STARTUP_MESSAGE};

mod common;

use common::{LineReader, MemorySink};

fn scripted() -> metrics_sidecar::streaming::SourceFactory {
    ScriptedSource::new([
        (LogLevel::Warning, "API request timeout"),
        (LogLevel::Error, "User authentication failed"),
        (LogLevel::Debug, "Cache refreshed"),
    ])
    .factory()
}

#[tokio::test]
async fn test_first_chunk_is_startup_marker() {
    let (sidecar, _sink) = common::start_default_sidecar().await;

    let res = common::client().get(sidecar.url("/logs")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "text/plain");

    let mut reader = LineReader::new(res);
    let raw = reader.next_raw().await.unwrap();
    let (timestamp, rest) = raw.split_once(' ').unwrap();
    assert!(DateTime::parse_from_rfc3339(timestamp).is_ok(), "{}", timestamp);
    assert!(timestamp.ends_with('Z'));
    assert_eq!(rest, format!("[INFO] - {}\n", STARTUP_MESSAGE));

    sidecar.shutdown.trigger();
    sidecar.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_lines_follow_at_interval_and_reach_durable_sink() {
    let sink = Arc::new(MemorySink::default());
    let sidecar = common::start_sidecar(sink.clone(), scripted(), 100).await;

    let res = common::client().get(sidecar.url("/logs")).send().await.unwrap();
    let mut reader = LineReader::new(res);

    let marker = reader.next_line().await;
    let first = reader.next_line().await;
    let second = reader.next_line().await;
    let third = reader.next_line().await;

    assert_eq!(marker.message, STARTUP_MESSAGE);
    assert_eq!((first.level, first.message.as_str()), (LogLevel::Warning, "API request timeout"));
    assert_eq!(second.level, LogLevel::Error);
    assert_eq!(third.level, LogLevel::Debug);

    let gap = third.timestamp - first.timestamp;
    assert!(gap >= chrono::Duration::milliseconds(150), "{:?}", gap);
    assert!(third.timestamp <= Utc::now());

    let durable = sink.lines();
    assert!(durable.len() >= 3);
    assert!(durable[0].ends_with("[WARNING] - API request timeout\n"));
    assert!(!durable.iter().any(|l| l.contains(STARTUP_MESSAGE)));

    sidecar.shutdown.trigger();
    sidecar.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_stream_survives_durable_sink_failure() {
    let sink = Arc::new(MemorySink::default());
    sink.set_failing(true);
    let sidecar = common::start_sidecar(sink.clone(), scripted(), 50).await;

    let res = common::client().get(sidecar.url("/logs")).send().await.unwrap();
    let mut reader = LineReader::new(res);

    reader.next_line().await;
    assert_eq!(reader.next_line().await.message, "API request timeout");
    assert_eq!(reader.next_line().await.message, "User authentication failed");
    assert!(sink.lines().is_empty());

    sink.set_failing(false);
    let mut line = reader.next_line().await;
    for _ in 0..2 {
        line = reader.next_line().await;
    }
    let durable = sink.lines();
    assert!(durable.iter().any(|l| *l == line.render()), "{:?}", durable);

    sidecar.shutdown.trigger();
    sidecar.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_disconnect_leaves_other_sessions_running() {
    let sink = Arc::new(MemorySink::default());
    let sidecar = common::start_sidecar(sink.clone(), scripted(), 50).await;
    let client = common::client();

    let mut doomed = LineReader::new(client.get(sidecar.url("/logs")).send().await.unwrap());
    let mut survivor = LineReader::new(client.get(sidecar.url("/logs")).send().await.unwrap());

    doomed.next_line().await;
    doomed.next_line().await;
    drop(doomed);

    for _ in 0..5 {
        survivor.next_line().await;
    }

    // Once the dropped session has noticed, only one generator keeps writing.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let before = sink.lines().len();
    tokio::time::sleep(Duration::from_millis(1000)).await;
    let written = sink.lines().len() - before;
    assert!(written > 0, "surviving session stopped writing");
    assert!(written <= 28, "two sessions still writing: {}", written);

    let res = client.get(sidecar.url("/metrics")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.text().await.unwrap().contains(r#"endpoint="/logs",method="GET"} 2"#));

    sidecar.shutdown.trigger();
    sidecar.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_shutdown_ends_open_streams() {
    let sink = Arc::new(MemorySink::default());
    let sidecar = common::start_sidecar(sink.clone(), scripted(), 50).await;
    let client = common::client();

    let mut a = LineReader::new(client.get(sidecar.url("/logs")).send().await.unwrap());
    let mut b = LineReader::new(client.get(sidecar.url("/logs")).send().await.unwrap());
    a.next_line().await;
    b.next_line().await;

    sidecar.shutdown.trigger();

    // Buffered lines may still arrive, then each body ends cleanly.
    while a.next_raw().await.is_some() {}
    while b.next_raw().await.is_some() {}

    tokio::time::timeout(Duration::from_secs(5), sidecar.handle)
        .await
        .expect("server did not drain")
        .unwrap()
        .unwrap();

    let after_stop = sink.lines().len();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(sink.lines().len(), after_stop);
}
