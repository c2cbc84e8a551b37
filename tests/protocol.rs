//! Wire protocol and admission control.

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use sku_feeder::sku::Report;
use sku_feeder::ShutdownCause;

mod common;

async fn read_all(stream: &mut TcpStream) -> String {
    let mut reply = String::new();
    tokio::time::timeout(common::REPLY_TIMEOUT, stream.read_to_string(&mut reply))
        .await
        .expect("server kept the connection open")
        .unwrap();
    reply
}

#[tokio::test]
async fn test_second_connection_rejected_when_limit_is_one() {
    let server = common::start_server(1, 60_000).await;

    let mut first = TcpStream::connect(server.addr).await.unwrap();
    let mut second = TcpStream::connect(server.addr).await.unwrap();

    // Rejected without the server reading anything, then closed.
    assert_eq!(read_all(&mut second).await, "limit connections reached\n");
    assert_eq!(server.registry.report(), Report::default());

    // The first connection proceeds normally.
    first.write_all(b"KASL-1234\n").await.unwrap();
    assert_eq!(read_all(&mut first).await, "OK\n");

    assert_eq!(server.send_admitted("terminate").await, "OK");
    let summary = server.finish().await.unwrap();

    assert_eq!(summary.cause, ShutdownCause::ClientTerminate);
    assert_eq!(
        summary.report,
        Report {
            unique: 1,
            duplicate: 0,
            invalid: 0
        }
    );
}

#[tokio::test]
async fn test_in_flight_connections_never_exceed_limit() {
    let server = common::start_server(2, 60_000).await;

    let _a = TcpStream::connect(server.addr).await.unwrap();
    let _b = TcpStream::connect(server.addr).await.unwrap();

    for _ in 0..3 {
        let mut extra = TcpStream::connect(server.addr).await.unwrap();
        assert_eq!(read_all(&mut extra).await, "limit connections reached\n");
    }
    assert_eq!(server.registry.report(), Report::default());

    server.terminate.trigger(ShutdownCause::ClientTerminate);
    let summary = server.finish().await.unwrap();
    assert_eq!(summary.cause, ShutdownCause::ClientTerminate);
}

#[tokio::test]
async fn test_sequential_submissions_are_counted() {
    let server = common::start_server(5, 60_000).await;

    for line in ["KASL-3423", "KASL-7770", "KASL-1234", "KASL-1234", "765-1234"] {
        assert_eq!(server.send(line).await, "OK");
    }
    assert_eq!(server.send("terminate").await, "OK");

    let sink = server.sink.clone();
    let store = server.store.clone();
    let summary = server.finish().await.unwrap();

    assert_eq!(
        summary.report,
        Report {
            unique: 3,
            duplicate: 1,
            invalid: 1
        }
    );
    assert_eq!(summary.persisted.inserted, 3);
    assert_eq!(store.len(), 3);

    let mut logged = sink.entries();
    logged.sort();
    assert_eq!(
        logged,
        vec![
            "Added sku: KASL-1234",
            "Added sku: KASL-3423",
            "Added sku: KASL-7770",
        ]
    );
}

#[tokio::test]
async fn test_one_line_per_connection() {
    let server = common::start_server(5, 60_000).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream.write_all(b"abcd-0001\r\nABCD-0002\n").await.unwrap();
    assert_eq!(read_all(&mut stream).await, "OK\n");

    server.terminate.trigger(ShutdownCause::ClientTerminate);
    let summary = server.finish().await.unwrap();
    assert_eq!(summary.report.unique, 1);
}

#[tokio::test]
async fn test_disconnect_without_newline_is_ignored() {
    let server = common::start_server(1, 60_000).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream.write_all(b"KASL-0001").await.unwrap();
    stream.shutdown().await.unwrap();
    assert_eq!(read_all(&mut stream).await, "");

    // The slot came back: a new connection is served.
    assert_eq!(server.send_admitted("KASL-0002").await, "OK");

    server.terminate.trigger(ShutdownCause::ClientTerminate);
    let summary = server.finish().await.unwrap();
    assert_eq!(
        summary.report,
        Report {
            unique: 1,
            duplicate: 0,
            invalid: 0
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_clients() {
    let server = std::sync::Arc::new(common::start_server(8, 60_000).await);
    let clients = 40;

    let mut tasks = Vec::new();
    for n in 0..clients {
        let server = server.clone();
        tasks.push(tokio::spawn(async move {
            server.send_admitted(&format!("abcd-{:04}", n % 10)).await
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), "OK");
    }

    let server = std::sync::Arc::try_unwrap(server)
        .ok()
        .expect("client tasks finished");
    server.terminate.trigger(ShutdownCause::ClientTerminate);
    let summary = server.finish().await.unwrap();

    assert_eq!(
        summary.report,
        Report {
            unique: 10,
            duplicate: 30,
            invalid: 0
        }
    );
}

#[tokio::test]
async fn test_listener_closed_after_shutdown() {
    let server = common::start_server(1, 60_000).await;
    let addr = server.addr;

    server.terminate.trigger(ShutdownCause::ClientTerminate);
    server.finish().await.unwrap();

    let connect = tokio::time::timeout(Duration::from_secs(1), TcpStream::connect(addr)).await;
    assert!(matches!(connect, Ok(Err(_))));
}
