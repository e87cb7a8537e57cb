//! Config reload triggers: SIGHUP (unix) and a modification-time poll.
//!
//! Whichever trigger fires, the file is re-read and the fresh snapshot is
//! pushed into the config channel. A snapshot that fails to load is logged
//! and dropped; the previous configuration stays active.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::cli::config_file::read_server_config;
use crate::server::Config;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

// -----------------------------------------------------------------------------
// ----- spawn -----------------------------------------------------------------

/// Start watching the config file in a background task. The task lives
/// until the receiving side of `updates` goes away.
pub(crate) fn spawn(path: PathBuf, updates: mpsc::Sender<Config>) {
    tokio::spawn(watch_config(path, updates));
}

// -----------------------------------------------------------------------------
// ----- Watch loop ------------------------------------------------------------

#[cfg(unix)]
async fn watch_config(path: PathBuf, updates: mpsc::Sender<Config>) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sighup = match signal(SignalKind::hangup()) {
        Ok(sighup) => sighup,
        Err(err) => {
            error!("watcher: cannot install SIGHUP handler: {err}");
            return;
        }
    };

    let mut poll = tokio::time::interval(POLL_INTERVAL);
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut last_modified = modified_at(&path).await;

    loop {
        tokio::select! {
            _ = sighup.recv() => {
                debug!("watcher: received SIGHUP; reloading config");

                last_modified = modified_at(&path).await;

                if !reload(&path, &updates).await {
                    return;
                }
            }

            _ = poll.tick() => {
                if !poll_once(&path, &updates, &mut last_modified).await {
                    return;
                }
            }
        }
    }
}

#[cfg(not(unix))]
async fn watch_config(path: PathBuf, updates: mpsc::Sender<Config>) {
    let mut poll = tokio::time::interval(POLL_INTERVAL);
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut last_modified = modified_at(&path).await;

    loop {
        poll.tick().await;

        if !poll_once(&path, &updates, &mut last_modified).await {
            return;
        }
    }
}

/// One poll round. Returns false when the update channel is gone and the
/// watcher should stop.
async fn poll_once(
    path: &Path,
    updates: &mpsc::Sender<Config>,
    last_modified: &mut Option<SystemTime>,
) -> bool {
    let modified = modified_at(path).await;

    if modified.is_some() && modified != *last_modified {
        debug!("watcher: {} changed on disk; reloading config", path.display());

        *last_modified = modified;

        return reload(path, updates).await;
    }

    true
}

/// Re-read the config and push it downstream. Load failures keep the
/// previous config. Returns false when the update channel is gone.
async fn reload(path: &Path, updates: &mpsc::Sender<Config>) -> bool {
    let config = match read_server_config(path) {
        Ok(config) => config,
        Err(err) => {
            error!("watcher: error loading config file {}: {err}", path.display());
            return true;
        }
    };

    updates.send(config).await.is_ok()
}

async fn modified_at(path: &Path) -> Option<SystemTime> {
    let metadata = tokio::fs::metadata(path).await.ok()?;

    metadata.modified().ok()
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
