//! The proxy server: lifecycle-managed listener, live reconfiguration
//! fan-out, and per-connection sessions.

pub mod config;
pub mod distributor;
pub mod event;
pub mod server;
pub mod session;

pub use config::Config;
pub use distributor::{ConfigChangedCheck, ConfigDistributor, ConfigStore, SubscriptionId};
pub use event::Event;
pub use server::Server;
pub use session::Session;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::errors::{Error, Result};

// -----------------------------------------------------------------------------
// ----- run -------------------------------------------------------------------

/// Run the proxy against a stream of configuration snapshots until the
/// process is told to stop. This is the server entry point the CLI wires
/// in; tests inject their own.
pub async fn run(config_rx: mpsc::Receiver<Config>) -> Result<()> {
    let distributor = ConfigDistributor::new(config_rx);
    let server = Server::new(Arc::new(distributor.clone()));

    let result = tokio::select! {
        res = server.start() => res,

        _ = tokio::signal::ctrl_c() => {
            info!("server: received interrupt; shutting down");
            Ok(())
        }
    };

    server.close().await;
    distributor.close().await;

    match result {
        // A close-induced exit is a clean shutdown, not a failure.
        Err(Error::ServerClosed) => Ok(()),
        other => other,
    }
}
