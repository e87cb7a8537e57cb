//! A proxied PostgreSQL session: one client connection, one upstream
//! connection, and the pumps that shuttle messages between them.
//!
//! ```text
//! ┌──────────┐                  ┌─────────────────┐                  ┌──────────┐
//! │          │◀───── db_out ────│                 │◀─── client_in ───│          │
//! │    DB    │                  │     Gevulot     │                  │  Client  │
//! │          │────── db_in ────▶│                 │──── client_out ─▶│          │
//! └──────────┘                  └─────────────────┘                  └──────────┘
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace};

use crate::errors::{Error, Result};
use crate::pg::conn::Conn;
use crate::pg::dsn::{ConnectionSettings, parse_database_uri};
use crate::pg::message::Message;
use crate::pg::message::startup::{PROTOCOL_VERSION, StartupMessage};
use crate::server::distributor::ConfigStore;
use crate::server::event::Event;

/// Capacity of each in-memory message channel. Full channels block their
/// producer, which is the intended backpressure.
const MESSAGE_CHANNEL_CAPACITY: usize = 64;

// -----------------------------------------------------------------------------
// ----- Session ---------------------------------------------------------------

/// One client↔proxy↔database triad. Clones share the same session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    /// Global configuration provider.
    config: Arc<dyn ConfigStore>,

    /// Client socket, consumed when the session starts.
    client: parking_lot::Mutex<Option<TcpStream>>,

    /// Database connection parameters parsed from the config, cached on
    /// first use.
    settings: tokio::sync::Mutex<Option<ConnectionSettings>>,

    /// Fired when the session is closed.
    closed: Event,
}

impl Session {
    pub fn new(client: TcpStream, config: Arc<dyn ConfigStore>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                config,
                client: parking_lot::Mutex::new(Some(client)),
                settings: tokio::sync::Mutex::new(None),
                closed: Event::new(),
            }),
        }
    }

    /// Drive the session until the client or the database hangs up, or
    /// until `close` is called. Blocks; the server runs it in its own task.
    pub async fn start(&self) -> Result<()> {
        info!("session: initializing a new session");

        if self.inner.closed.has_fired() {
            return Err(Error::SessionClosed);
        }

        let client_stream = self
            .inner
            .client
            .lock()
            .take()
            .ok_or(Error::SessionClosed)?;

        let result = self.run(client_stream).await;

        self.close();

        match &result {
            Ok(()) => info!("session: completed"),
            Err(err) => error!("session: error: {err}"),
        }

        result
    }

    /// Close the session. Idempotent; every pump observes the closure and
    /// exits, dropping both sockets.
    pub fn close(&self) {
        if !self.inner.closed.fire() {
            return;
        }

        info!("session: closing");
    }
}

// -----------------------------------------------------------------------------
// ----- Session: Private ------------------------------------------------------

impl Session {
    async fn run(&self, client_stream: TcpStream) -> Result<()> {
        let mut client_conn = Conn::frontend(client_stream);

        // Startup negotiation, interruptible by close()
        let negotiation = tokio::select! {
            res = self.negotiate_session_params(&mut client_conn) => res,
            _ = self.inner.closed.done() => Err(Error::SessionClosed),
        };

        let db_conn = negotiation?;

        // One pump per socket direction plus the dispatcher between them
        let (client_read, client_write) = client_conn.into_split();
        let (db_read, db_write) = db_conn.into_split();

        let (client_in_tx, client_in_rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);
        let (client_out_tx, client_out_rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);
        let (db_in_tx, db_in_rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);
        let (db_out_tx, db_out_rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);

        let (result_tx, mut result_rx) = mpsc::channel(5);

        self.spawn_session_task(&result_tx, client_in_pump(client_read, client_in_tx));
        self.spawn_session_task(&result_tx, client_out_pump(client_out_rx, client_write));
        self.spawn_session_task(&result_tx, db_in_pump(db_read, db_in_tx));
        self.spawn_session_task(&result_tx, db_out_pump(db_out_rx, db_write));
        self.spawn_session_task(
            &result_tx,
            dispatch(client_in_rx, db_out_tx, db_in_rx, client_out_tx),
        );

        drop(result_tx);

        // The first task to finish decides the outcome; closing the session
        // tells the rest to exit, and we wait for every one of them.
        let mut outcome = Ok(());
        let mut decided = false;

        while let Some(result) = result_rx.recv().await {
            if !decided {
                outcome = result;
                decided = true;
                self.close();
            }
        }

        outcome
    }

    /// Run one session task, racing its body against session closure.
    fn spawn_session_task<F>(&self, results: &mpsc::Sender<Result<()>>, body: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let closed = self.inner.closed.clone();
        let results = results.clone();

        tokio::spawn(async move {
            let result = tokio::select! {
                res = body => res,
                _ = closed.done() => Ok(()),
            };

            // Capacity covers every task, so this never blocks.
            let _ = results.send(result).await;
        });
    }

    /// Establish session parameters with the client, then connect to the
    /// configured database on the client's behalf.
    async fn negotiate_session_params(
        &self,
        client_conn: &mut Conn<TcpStream>,
    ) -> Result<Conn<TcpStream>> {
        debug!("session: waiting for the client startup message");

        let mut ssl_request_denied = false;

        loop {
            let startup_message = client_conn.recv_startup_message().await?;

            if startup_message.is_ssl_request() {
                // One denial per session; a client probing twice is not
                // speaking the protocol.
                if ssl_request_denied {
                    return Err(Error::MalformedMessage);
                }

                info!("session: client requested SSL; denying");
                client_conn.send_byte(b'N').await?;

                ssl_request_denied = true;
                continue;
            }

            if startup_message.protocol_version != PROTOCOL_VERSION {
                return Err(Error::UnsupportedProtocolVersion(
                    startup_message.protocol_version,
                ));
            }

            // The client must target the database we are proxying
            let allowed_db = self.connection_param("database").await?;
            let requested_db = startup_message.get_parameter("database").unwrap_or_default();

            if requested_db != allowed_db {
                return Err(Error::DatabaseMismatch {
                    requested: requested_db.to_owned(),
                    allowed: allowed_db,
                });
            }

            return self.establish_db_connection(startup_message).await;
        }
    }

    /// Dial the database and forward the client's startup message
    /// unchanged.
    async fn establish_db_connection(
        &self,
        startup_message: StartupMessage,
    ) -> Result<Conn<TcpStream>> {
        let host = self.connection_param("host").await?;
        let port = self.connection_param("port").await?;

        let port: u16 = port
            .parse()
            .map_err(|_| Error::InvalidDatabaseUri(format!("invalid port {port:?}")))?;

        debug!("session: connecting to the database at {host}:{port}");

        let stream = TcpStream::connect((host.as_str(), port)).await?;
        let _ = stream.set_nodelay(true);

        let mut db_conn = Conn::backend(stream);
        db_conn
            .send_message(&Message::Startup(startup_message))
            .await?;

        Ok(db_conn)
    }

    /// Look up a database connection parameter, parsing the configured URL
    /// on first use.
    async fn connection_param(&self, name: &str) -> Result<String> {
        let mut settings = self.inner.settings.lock().await;

        if settings.is_none() {
            // get() blocks until a config is available
            let config = self.inner.config.get().await?;

            *settings = Some(parse_database_uri(&config.database_url)?);
        }

        Ok(settings
            .as_ref()
            .and_then(|settings| settings.get(name))
            .unwrap_or_default()
            .to_owned())
    }
}

// -----------------------------------------------------------------------------
// ----- Pumps -----------------------------------------------------------------

/// Pump messages from the client socket into the client_in channel.
async fn client_in_pump(
    mut conn: Conn<ReadHalf<TcpStream>>,
    inbox: mpsc::Sender<Message>,
) -> Result<()> {
    loop {
        let message = conn.recv_message().await?;

        if inbox.send(message).await.is_err() {
            return Ok(());
        }
    }
}

/// Drain the client_out channel into the client socket.
async fn client_out_pump(
    mut outbox: mpsc::Receiver<Message>,
    mut conn: Conn<WriteHalf<TcpStream>>,
) -> Result<()> {
    while let Some(message) = outbox.recv().await {
        conn.send_message(&message).await?;
    }

    Ok(())
}

/// Pump messages from the database socket into the db_in channel.
async fn db_in_pump(
    mut conn: Conn<ReadHalf<TcpStream>>,
    inbox: mpsc::Sender<Message>,
) -> Result<()> {
    loop {
        let message = conn.recv_message().await?;

        if inbox.send(message).await.is_err() {
            return Ok(());
        }
    }
}

/// Drain the db_out channel into the database socket.
async fn db_out_pump(
    mut outbox: mpsc::Receiver<Message>,
    mut conn: Conn<WriteHalf<TcpStream>>,
) -> Result<()> {
    while let Some(message) = outbox.recv().await {
        conn.send_message(&message).await?;
    }

    Ok(())
}

/// Move messages between the two directions, preserving per-direction
/// order. Today this forwards one-to-one; result-set rewriting rules will
/// hook in here, keyed on message kind.
async fn dispatch(
    mut client_in: mpsc::Receiver<Message>,
    db_out: mpsc::Sender<Message>,
    mut db_in: mpsc::Receiver<Message>,
    client_out: mpsc::Sender<Message>,
) -> Result<()> {
    loop {
        tokio::select! {
            maybe_message = client_in.recv() => match maybe_message {
                Some(message) => {
                    trace!("session: client -> db: {message:?}");

                    if db_out.send(message).await.is_err() {
                        return Ok(());
                    }
                }

                None => return Ok(()),
            },

            maybe_message = db_in.recv() => match maybe_message {
                Some(message) => {
                    trace!("session: db -> client: {message:?}");

                    if client_out.send(message).await.is_err() {
                        return Ok(());
                    }
                }

                None => return Ok(()),
            },
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pg::message::startup::{SSL_REQUEST_CODE, StartupParameter};
    use crate::server::config::Config;
    use crate::server::distributor::ConfigDistributor;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (accepted, connected) =
            tokio::join!(listener.accept(), TcpStream::connect(addr));

        (connected.unwrap(), accepted.unwrap().0)
    }

    fn config_store(database_url: &str) -> Arc<dyn ConfigStore> {
        let (source_tx, source_rx) = mpsc::channel(1);

        source_tx
            .try_send(Config {
                listen: "127.0.0.1:0".to_owned(),
                database_url: database_url.to_owned(),
            })
            .unwrap();

        // Keep the source alive for the duration of the test
        std::mem::forget(source_tx);

        Arc::new(ConfigDistributor::new(source_rx))
    }

    fn startup_for(database: &str) -> StartupMessage {
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

    #[tokio::test]
    async fn rejects_database_mismatch_before_dialing() {
        let (mut client_side, proxy_side) = tcp_pair().await;

        // Port 1 would fail the dial; the mismatch must happen first.
        let session = Session::new(proxy_side, config_store("postgres://u@127.0.0.1:1/db_a"));
        let handle = tokio::spawn(async move { session.start().await });

        client_side
            .write_all(startup_for("db_b").frame().bytes())
            .await
            .unwrap();

        assert!(matches!(
            handle.await.unwrap(),
            Err(Error::DatabaseMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn rejects_unsupported_protocol_version() {
        let (mut client_side, proxy_side) = tcp_pair().await;

        let session = Session::new(proxy_side, config_store("postgres://u@127.0.0.1:1/db_a"));
        let handle = tokio::spawn(async move { session.start().await });

        let old_protocol = StartupMessage {
            protocol_version: 131072, // 2.0
            parameters: startup_for("db_a").parameters,
        };

        client_side
            .write_all(old_protocol.frame().bytes())
            .await
            .unwrap();

        assert!(matches!(
            handle.await.unwrap(),
            Err(Error::UnsupportedProtocolVersion(131072))
        ));
    }

    #[tokio::test]
    async fn denies_ssl_once_then_rejects_a_second_probe() {
        let (mut client_side, proxy_side) = tcp_pair().await;

        let session = Session::new(proxy_side, config_store("postgres://u@127.0.0.1:1/db_a"));
        let handle = tokio::spawn(async move { session.start().await });

        let ssl_request = StartupMessage {
            protocol_version: SSL_REQUEST_CODE,
            parameters: vec![],
        };

        client_side
            .write_all(ssl_request.frame().bytes())
            .await
            .unwrap();

        let mut denial = [0u8; 1];
        client_side.read_exact(&mut denial).await.unwrap();
        assert_eq!(denial, [b'N']);

        // A second probe on the same session is a protocol error.
        client_side
            .write_all(ssl_request.frame().bytes())
            .await
            .unwrap();

        assert!(matches!(
            handle.await.unwrap(),
            Err(Error::MalformedMessage)
        ));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_fails_later_start() {
        let (_client_side, proxy_side) = tcp_pair().await;

        let session = Session::new(proxy_side, config_store("postgres://u@127.0.0.1:1/db_a"));

        session.close();
        session.close();

        assert!(matches!(
            session.start().await,
            Err(Error::SessionClosed)
        ));
    }

    #[tokio::test]
    async fn close_interrupts_a_blocked_negotiation() {
        let (_client_side, proxy_side) = tcp_pair().await;

        let session = Session::new(proxy_side, config_store("postgres://u@127.0.0.1:1/db_a"));
        let started = session.clone();
        let handle = tokio::spawn(async move { started.start().await });

        // Give the session a moment to block on the startup read.
        tokio::task::yield_now().await;
        session.close();

        assert!(matches!(
            handle.await.unwrap(),
            Err(Error::SessionClosed)
        ));
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
