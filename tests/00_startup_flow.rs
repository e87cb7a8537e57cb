//! Startup negotiation through a live proxy: SSL denial, database
//! validation, and startup forwarding.

mod support;

use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use gevulot::pg::message::Message;
use support::{FakeBackend, recv_startup_frame, send_bytes, ssl_request, startup_message};

#[tokio::test]
async fn forwards_the_startup_message_unchanged() {
    let backend = FakeBackend::start().await;
    let listen = support::reserve_addr();
    let _proxy = support::start_proxy(&listen, &backend.database_url("hired_dev")).await;

    let mut client = TcpStream::connect(&listen).await.unwrap();

    let startup = Message::Startup(startup_message("hired_dev"));
    send_bytes(&mut client, startup.frame().bytes()).await;

    let mut upstream = backend.accept().await;
    let forwarded = recv_startup_frame(&mut upstream).await;

    assert_eq!(forwarded, startup.frame().bytes());
}

#[tokio::test]
async fn denies_ssl_then_proxies_the_retry() {
    let backend = FakeBackend::start().await;
    let listen = support::reserve_addr();
    let _proxy = support::start_proxy(&listen, &backend.database_url("hired_dev")).await;

    let mut client = TcpStream::connect(&listen).await.unwrap();

    // SSL probe: the proxy answers with exactly one 'N' byte.
    send_bytes(&mut client, ssl_request().frame().bytes()).await;

    let mut denial = [0u8; 1];
    client.read_exact(&mut denial).await.unwrap();
    assert_eq!(denial, [b'N']);

    // The retry with a plain v3 startup reaches the backend unchanged.
    let startup = Message::Startup(startup_message("hired_dev"));
    send_bytes(&mut client, startup.frame().bytes()).await;

    let mut upstream = backend.accept().await;
    let forwarded = recv_startup_frame(&mut upstream).await;

    assert_eq!(forwarded, startup.frame().bytes());
}

#[tokio::test]
async fn rejects_a_database_mismatch_without_dialing_upstream() {
    let backend = FakeBackend::start().await;
    let listen = support::reserve_addr();
    let _proxy = support::start_proxy(&listen, &backend.database_url("db_a")).await;

    let mut client = TcpStream::connect(&listen).await.unwrap();

    send_bytes(
        &mut client,
        startup_message("db_b").frame().bytes(),
    )
    .await;

    // The proxy never dials the backend...
    backend.expect_no_connection().await;

    // ...and hangs up on the client.
    let mut buf = [0u8; 1];
    let read = timeout(Duration::from_secs(5), client.read(&mut buf))
        .await
        .expect("proxy kept the socket open");

    assert!(matches!(read, Ok(0) | Err(_)), "unexpected data: {read:?}");
}

#[tokio::test]
async fn rejects_unsupported_protocol_versions() {
    let backend = FakeBackend::start().await;
    let listen = support::reserve_addr();
    let _proxy = support::start_proxy(&listen, &backend.database_url("hired_dev")).await;

    let mut client = TcpStream::connect(&listen).await.unwrap();

    let mut ancient = startup_message("hired_dev");
    ancient.protocol_version = 131072; // 2.0

    send_bytes(&mut client, ancient.frame().bytes()).await;

    backend.expect_no_connection().await;

    let mut buf = [0u8; 1];
    let read = timeout(Duration::from_secs(5), client.read(&mut buf))
        .await
        .expect("proxy kept the socket open");

    assert!(matches!(read, Ok(0) | Err(_)), "unexpected data: {read:?}");
}
