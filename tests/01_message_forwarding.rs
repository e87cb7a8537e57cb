//! Per-direction message forwarding through an established session:
//! queries down, result sets up, unknown message kinds untouched.

mod support;

use tokio::net::TcpStream;

use gevulot::pg::frame::StandardFrame;
use gevulot::pg::message::command_complete::CommandComplete;
use gevulot::pg::message::data_row::DataRow;
use gevulot::pg::message::query::Query;
use gevulot::pg::message::ready_for_query::{ReadyForQuery, TransactionStatus};
use gevulot::pg::message::Message;
use support::{FakeBackend, recv_frame, recv_startup_frame, send_bytes, startup_message};

/// Complete the startup handshake and hand back both ends of the session.
async fn establish_session(backend: &FakeBackend, listen: &str) -> (TcpStream, TcpStream) {
    let mut client = TcpStream::connect(listen).await.unwrap();

    send_bytes(
        &mut client,
        Message::Startup(startup_message("hired_dev")).frame().bytes(),
    )
    .await;

    let mut upstream = backend.accept().await;
    recv_startup_frame(&mut upstream).await;

    (client, upstream)
}

#[tokio::test]
async fn forwards_queries_and_results_in_order() {
    let backend = FakeBackend::start().await;
    let listen = support::reserve_addr();
    let _proxy = support::start_proxy(&listen, &backend.database_url("hired_dev")).await;

    let (mut client, mut upstream) = establish_session(&backend, &listen).await;

    // Client -> backend: a simple query arrives byte-identical.
    let query = Message::Query(Query {
        query: "SELECT email FROM users".to_owned(),
    });
    send_bytes(&mut client, query.frame().bytes()).await;
    assert_eq!(recv_frame(&mut upstream).await, query.frame().bytes());

    // Backend -> client: the whole result set comes back in order,
    // including a NULL (not empty) column value.
    let results = [
        Message::DataRow(DataRow {
            values: vec![Some(b"a@example.com".to_vec()), None],
        }),
        Message::CommandComplete(CommandComplete {
            tag: "SELECT 1".to_owned(),
        }),
        Message::ReadyForQuery(ReadyForQuery {
            transaction_status: TransactionStatus::Idle,
        }),
    ];

    for message in &results {
        send_bytes(&mut upstream, message.frame().bytes()).await;
    }

    for message in &results {
        assert_eq!(recv_frame(&mut client).await, message.frame().bytes());
    }
}

#[tokio::test]
async fn passes_unknown_message_kinds_through_untouched() {
    let backend = FakeBackend::start().await;
    let listen = support::reserve_addr();
    let _proxy = support::start_proxy(&listen, &backend.database_url("hired_dev")).await;

    let (mut client, mut upstream) = establish_session(&backend, &listen).await;

    // '$' is no PostgreSQL message kind at all.
    let oddball = StandardFrame::new(b'$', b"test test");

    send_bytes(&mut client, oddball.bytes()).await;
    assert_eq!(recv_frame(&mut upstream).await, oddball.bytes());

    // The other direction too.
    let oddball_reply = StandardFrame::new(b'%', b"tset tset");

    send_bytes(&mut upstream, oddball_reply.bytes()).await;
    assert_eq!(recv_frame(&mut client).await, oddball_reply.bytes());
}

#[tokio::test]
async fn extended_protocol_frames_survive_the_round_trip() {
    let backend = FakeBackend::start().await;
    let listen = support::reserve_addr();
    let _proxy = support::start_proxy(&listen, &backend.database_url("hired_dev")).await;

    let (mut client, mut upstream) = establish_session(&backend, &listen).await;

    // Parse/Bind/Execute/Sync share type bytes with backend messages; they
    // must flow client->backend without being reinterpreted.
    let extended = [
        StandardFrame::new(b'P', b"\0SELECT $1\0\0\0"),
        StandardFrame::new(b'B', b"\0\0\0\0\0\0\0\0"),
        StandardFrame::new(b'E', b"\0\0\0\0\0"),
        StandardFrame::new(b'S', b""),
    ];

    for frame in &extended {
        send_bytes(&mut client, frame.bytes()).await;
    }

    for frame in &extended {
        assert_eq!(recv_frame(&mut upstream).await, frame.bytes());
    }
}
