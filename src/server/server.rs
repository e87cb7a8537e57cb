//! Listener lifecycle, accept loop, config-driven rebinding and the
//! session registry.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::errors::{Error, Result};
use crate::server::config::Config;
use crate::server::distributor::{ConfigChangedCheck, ConfigStore};
use crate::server::event::Event;
use crate::server::session::Session;

/// How long `close` waits for spawned tasks before declaring a bug.
const SHUTDOWN_WATCHDOG: Duration = Duration::from_secs(5);

// -----------------------------------------------------------------------------
// ----- Server ----------------------------------------------------------------

/// A masking PostgreSQL proxy server. Clones share the same server.
#[derive(Clone)]
pub struct Server {
    inner: Arc<ServerInner>,
}

struct ServerInner {
    /// Configuration provider.
    config: Arc<dyn ConfigStore>,

    /// Fired when `start` is called.
    start: Event,

    /// Fired when `close` is called.
    shutdown: Event,

    /// Guards the active listener handle and the session registry.
    state: parking_lot::Mutex<ServerState>,

    /// Tracks every task the server spawns so `close` can wait for them.
    tasks: TaskRegistry,

    /// When set, called with the bound address after `serve` installed a
    /// new listener but before it accepts connections.
    #[cfg(test)]
    serve_hook: parking_lot::Mutex<Option<mpsc::UnboundedSender<SocketAddr>>>,
}

#[derive(Default)]
struct ServerState {
    /// Retirement signal of the accept loop currently serving.
    listener: Option<Event>,

    next_session_id: u64,
    sessions: HashMap<u64, Session>,
}

impl Server {
    pub fn new(config: Arc<dyn ConfigStore>) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                config,
                start: Event::new(),
                shutdown: Event::new(),
                state: parking_lot::Mutex::new(ServerState::default()),
                tasks: TaskRegistry::new(),
                #[cfg(test)]
                serve_hook: parking_lot::Mutex::new(None),
            }),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Server: Public --------------------------------------------------------

impl Server {
    /// Listen on the address named by the current config and serve client
    /// connections, rebinding whenever the configured listen address
    /// changes. Callable once per server; blocks until `close`.
    ///
    /// Always returns an error: [`Error::ServerClosed`] after `close`,
    /// [`Error::ServerAlreadyStarted`] on a second call.
    pub async fn start(&self) -> Result<()> {
        if self.inner.shutdown.has_fired() {
            return Err(Error::ServerClosed);
        }

        if !self.inner.start.fire() {
            return Err(Error::ServerAlreadyStarted);
        }

        // Watch for listen-address changes
        let (updates_tx, mut updates_rx) = mpsc::channel(1);

        let listen_changed: ConfigChangedCheck = Box::new(|old, new| {
            old.map(|old| old.listen != new.listen).unwrap_or(true)
        });

        let subscription = self
            .inner
            .config
            .subscribe(updates_tx, vec![listen_changed])
            .await?;

        let result = loop {
            tokio::select! {
                maybe_config = updates_rx.recv() => {
                    let Some(config) = maybe_config else {
                        // The distributor dropped us; only shutdown can end
                        // the server now.
                        self.inner.shutdown.done().await;
                        break Err(Error::ServerClosed);
                    };

                    self.rebind(config).await;
                }

                _ = self.inner.shutdown.done() => break Err(Error::ServerClosed),
            }
        };

        self.inner.config.unsubscribe(subscription).await;

        debug!("server: start loop finished");

        result
    }

    /// Install the listener (retiring any previous one) and accept client
    /// connections until the listener is retired or fails.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let retire = Event::new();

        self.change_listener(retire.clone())?;

        info!("server: ready to accept client connections");

        #[cfg(test)]
        self.notify_serve_hook(&listener);

        loop {
            tokio::select! {
                // Retired by a rebind or by close; a normal exit.
                _ = retire.done() => {
                    debug!("server: listener retired");
                    return Ok(());
                }

                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let server = self.clone();

                        self.spawn_tracked(async move {
                            let _ = server.serve_conn(stream, peer).await;
                        });
                    }

                    Err(err) if is_transient_accept_error(&err) => {
                        warn!("server: transient error while accepting: {err}");
                        continue;
                    }

                    Err(err) => {
                        error!("server: error while accepting client connection: {err}");
                        return Err(err.into());
                    }
                }
            }
        }
    }

    /// Proxy one accepted connection to the configured database. Blocks
    /// until either end hangs up.
    pub async fn serve_conn(&self, stream: TcpStream, peer: SocketAddr) -> Result<()> {
        if self.inner.shutdown.has_fired() {
            return Err(Error::ServerClosed);
        }

        info!("server: new client connection from {peer}");

        let _ = stream.set_nodelay(true);

        let session = Session::new(stream, self.inner.config.clone());
        let session_id = self.register_session(session.clone())?;

        let result = session.start().await;

        self.remove_session(session_id);

        debug!("server: connection from {peer} finished");

        result
    }

    /// Close the listener and every active session, then wait for all
    /// spawned tasks to finish. Idempotent.
    ///
    /// Panics if tasks fail to quiesce within the watchdog window; a task
    /// that ignores shutdown is a programming bug, not a runtime
    /// condition.
    pub async fn close(&self) {
        if !self.inner.shutdown.fire() {
            return;
        }

        info!("server: closing");

        {
            let mut state = self.inner.state.lock();

            if let Some(listener) = state.listener.take() {
                listener.fire();
            }

            for (_, session) in state.sessions.drain() {
                session.close();
            }
        }

        let Some(mut drained) = self.inner.tasks.release() else {
            return;
        };

        let quiesced = tokio::time::timeout(SHUTDOWN_WATCHDOG, async {
            while drained.recv().await.is_some() {}
        })
        .await;

        if quiesced.is_err() {
            panic!("server: tasks are still running after server close");
        }

        debug!("server: close finished");
    }
}

// -----------------------------------------------------------------------------
// ----- Server: Private -------------------------------------------------------

impl Server {
    /// Bind the new listen address and hand the listener to a fresh serve
    /// task. Bind failures are logged, not fatal: the previous listener
    /// (if any) keeps serving.
    async fn rebind(&self, config: Config) {
        info!("server: serving on {}", config.listen);

        let listener = match TcpListener::bind(&config.listen).await {
            Ok(listener) => listener,
            Err(err) => {
                error!("server: can't listen on {}: {err}", config.listen);
                return;
            }
        };

        let server = self.clone();

        self.spawn_tracked(async move {
            let _ = server.serve(listener).await;
        });
    }

    /// Swap in the retirement handle for a new accept loop, firing the
    /// previous one so its `serve` task returns.
    fn change_listener(&self, retire: Event) -> Result<()> {
        if self.inner.shutdown.has_fired() {
            return Err(Error::ServerClosed);
        }

        let mut state = self.inner.state.lock();

        if let Some(previous) = state.listener.replace(retire) {
            debug!("server: closing the old listener");
            previous.fire();
        }

        Ok(())
    }

    fn register_session(&self, session: Session) -> Result<u64> {
        let mut state = self.inner.state.lock();

        if self.inner.shutdown.has_fired() {
            return Err(Error::ServerClosed);
        }

        let session_id = state.next_session_id;
        state.next_session_id += 1;
        state.sessions.insert(session_id, session);

        Ok(session_id)
    }

    fn remove_session(&self, session_id: u64) {
        self.inner.state.lock().sessions.remove(&session_id);
    }

    /// Spawn a task recorded in the registry so `close` waits for it. No
    /// new tasks are spawned once closing has begun.
    fn spawn_tracked<F>(&self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let Some(token) = self.inner.tasks.token() else {
            return;
        };

        tokio::spawn(async move {
            future.await;
            drop(token);
        });
    }

    #[cfg(test)]
    fn notify_serve_hook(&self, listener: &TcpListener) {
        if let Some(hook) = &*self.inner.serve_hook.lock() {
            if let Ok(addr) = listener.local_addr() {
                let _ = hook.send(addr);
            }
        }
    }

    #[cfg(test)]
    fn set_serve_hook(&self, hook: mpsc::UnboundedSender<SocketAddr>) {
        *self.inner.serve_hook.lock() = Some(hook);
    }
}

// -----------------------------------------------------------------------------
// ----- TaskRegistry ----------------------------------------------------------

/// Counts in-flight tasks with sender clones: when every clone is dropped
/// the drain channel reports empty, which is how `close` knows the server
/// has quiesced.
struct TaskRegistry {
    guard: parking_lot::Mutex<Option<mpsc::Sender<()>>>,
    drained: parking_lot::Mutex<Option<mpsc::Receiver<()>>>,
}

impl TaskRegistry {
    fn new() -> Self {
        let (guard_tx, guard_rx) = mpsc::channel(1);

        Self {
            guard: parking_lot::Mutex::new(Some(guard_tx)),
            drained: parking_lot::Mutex::new(Some(guard_rx)),
        }
    }

    /// A token to hold for the lifetime of a task; `None` once released.
    fn token(&self) -> Option<mpsc::Sender<()>> {
        self.guard.lock().clone()
    }

    /// Give up the registry's own token and take the drain end. Returns
    /// `None` if already released.
    fn release(&self) -> Option<mpsc::Receiver<()>> {
        self.guard.lock().take();
        self.drained.lock().take()
    }
}

fn is_transient_accept_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
    )
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
