use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::sleep;

use gevulot::pg::frame::{read_standard_frame, read_startup_frame};
use gevulot::pg::message::startup::{
    PROTOCOL_VERSION, SSL_REQUEST_CODE, StartupMessage, StartupParameter,
};
use gevulot::server::{Config, ConfigDistributor, Server};

// -----------------------------------------------------------------------------
// ----- Proxy harness ---------------------------------------------------------

/// A running proxy plus the handles the tests drive it with.
pub struct Proxy {
    #[allow(dead_code)]
    pub server: Server,
    #[allow(dead_code)]
    pub distributor: ConfigDistributor,
    #[allow(dead_code)]
    pub config_tx: mpsc::Sender<Config>,
}

/// Reserve an ephemeral port by binding and immediately releasing it.
pub fn reserve_addr() -> String {
    let listener = StdTcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().unwrap().to_string()
}

/// Start a proxy listening on `listen`, proxying to `database_url`, and
/// wait until it accepts connections.
pub async fn start_proxy(listen: &str, database_url: &str) -> Proxy {
    let (config_tx, config_rx) = mpsc::channel(4);
    let distributor = ConfigDistributor::new(config_rx);
    let server = Server::new(Arc::new(distributor.clone()));

    config_tx
        .send(config(listen, database_url))
        .await
        .expect("seed config");

    let running = server.clone();
    tokio::spawn(async move {
        let _ = running.start().await;
    });

    wait_for_listen(listen).await;

    Proxy {
        server,
        distributor,
        config_tx,
    }
}

pub fn config(listen: &str, database_url: &str) -> Config {
    Config {
        listen: listen.to_owned(),
        database_url: database_url.to_owned(),
    }
}

pub async fn wait_for_listen(addr: &str) {
    for _ in 0..100 {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }

        sleep(Duration::from_millis(50)).await;
    }

    panic!("proxy did not start listening on {addr}");
}

/// Wait until connections to `addr` are refused (the listener went away).
#[allow(dead_code)]
pub async fn wait_for_refused(addr: &str) {
    for _ in 0..100 {
        if TcpStream::connect(addr).await.is_err() {
            return;
        }

        sleep(Duration::from_millis(50)).await;
    }

    panic!("listener on {addr} never went away");
}

// -----------------------------------------------------------------------------
// ----- Fake PostgreSQL backend -----------------------------------------------

/// Listens like a PostgreSQL server would; tests drive each accepted
/// connection by hand.
pub struct FakeBackend {
    listener: TcpListener,
    pub addr: String,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind backend");
        let addr = listener.local_addr().unwrap().to_string();

        Self { listener, addr }
    }

    pub fn database_url(&self, database: &str) -> String {
        format!("postgres://hired@{}/{database}", self.addr)
    }

    pub async fn accept(&self) -> TcpStream {
        let (stream, _peer) = self.listener.accept().await.expect("backend accept");
        stream
    }

    /// Expect no upstream connection to arrive within the grace window.
    #[allow(dead_code)]
    pub async fn expect_no_connection(&self) {
        let result =
            tokio::time::timeout(Duration::from_millis(500), self.listener.accept()).await;

        assert!(result.is_err(), "backend unexpectedly received a connection");
    }
}

// -----------------------------------------------------------------------------
// ----- Wire helpers ----------------------------------------------------------

pub fn startup_message(database: &str) -> StartupMessage {
    StartupMessage {
        protocol_version: PROTOCOL_VERSION,
        parameters: vec![
            StartupParameter {
                name: "user".to_owned(),
                value: "hired".to_owned(),
            },
            StartupParameter {
                name: "database".to_owned(),
                value: database.to_owned(),
            },
        ],
    }
}

#[allow(dead_code)]
pub fn ssl_request() -> StartupMessage {
    StartupMessage {
        protocol_version: SSL_REQUEST_CODE,
        parameters: vec![],
    }
}

pub async fn send_bytes(stream: &mut TcpStream, bytes: &[u8]) {
    stream.write_all(bytes).await.expect("write");
}

/// Read one startup frame off the stream and return its raw bytes.
pub async fn recv_startup_frame(stream: &mut TcpStream) -> Vec<u8> {
    let frame = read_startup_frame(stream).await.expect("startup frame");
    frame.bytes().to_vec()
}

/// Read one standard frame off the stream and return its raw bytes.
#[allow(dead_code)]
pub async fn recv_frame(stream: &mut TcpStream) -> Vec<u8> {
    let frame = read_standard_frame(stream).await.expect("standard frame");
    frame.bytes().to_vec()
}
