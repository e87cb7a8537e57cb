//! One-to-many configuration fan-out.
//!
//! A single producer pushes [`Config`] snapshots into a channel; the
//! distributor owns the receiving end and multiplexes snapshots to any
//! number of subscribers, each with optional change filters.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc};
use tracing::debug;

use crate::errors::{Error, Result};
use crate::server::config::Config;
use crate::server::event::Event;

// -----------------------------------------------------------------------------
// ----- ConfigStore -----------------------------------------------------------

/// Predicate deciding whether a subscriber cares about a transition from
/// `old` (absent before the first snapshot) to `new`.
pub type ConfigChangedCheck = Box<dyn Fn(Option<&Config>, &Config) -> bool + Send + Sync>;

/// Handle identifying one subscription; returned by `subscribe`, consumed
/// by `unsubscribe`.
pub type SubscriptionId = u64;

/// The API the server uses to obtain configuration.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Return the current active configuration, blocking until the first
    /// snapshot arrives if there is none yet.
    async fn get(&self) -> Result<Config>;

    /// Subscribe the channel to configuration updates. When checks are
    /// given, a snapshot is delivered only if at least one returns true.
    async fn subscribe(
        &self,
        sink: mpsc::Sender<Config>,
        checks: Vec<ConfigChangedCheck>,
    ) -> Result<SubscriptionId>;

    /// Cancel the subscription. Unknown handles are ignored.
    async fn unsubscribe(&self, id: SubscriptionId);
}

// -----------------------------------------------------------------------------
// ----- ConfigDistributor -----------------------------------------------------

/// [`ConfigStore`] implementation that consumes one source channel and
/// fans snapshots out to subscribers. Clones share the same distributor.
#[derive(Clone)]
pub struct ConfigDistributor {
    inner: Arc<Inner>,
}

struct Inner {
    /// Guards last seen snapshot and subscriptions. Delivery happens while
    /// the write guard is held, so subscriber channels must drain promptly;
    /// a full sink intentionally backpressures the whole fan-out.
    state: RwLock<State>,

    /// Source channel; taken by the monitor task on first subscribe.
    source: parking_lot::Mutex<Option<mpsc::Receiver<Config>>>,

    /// Fired when the monitor task is started.
    started: Event,

    /// Fired when the distributor is closed.
    closed: Event,
}

#[derive(Default)]
struct State {
    last_config: Option<Config>,
    next_id: SubscriptionId,
    subscriptions: HashMap<SubscriptionId, Subscription>,
}

struct Subscription {
    sink: mpsc::Sender<Config>,
    checks: Vec<ConfigChangedCheck>,
}

impl ConfigDistributor {
    pub fn new(source: mpsc::Receiver<Config>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(State::default()),
                source: parking_lot::Mutex::new(Some(source)),
                started: Event::new(),
                closed: Event::new(),
            }),
        }
    }

    /// Stop the monitor task and cancel all subscriptions. Idempotent;
    /// `get` and `subscribe` fail afterwards.
    pub async fn close(&self) {
        close_distributor(&self.inner).await;
    }
}

#[async_trait]
impl ConfigStore for ConfigDistributor {
    async fn get(&self) -> Result<Config> {
        if self.inner.closed.has_fired() {
            return Err(Error::ConfigDistributorClosed);
        }

        // Shortcut: return the cached snapshot
        let snapshot = self.inner.state.read().await.last_config.clone();

        if let Some(config) = snapshot {
            return Ok(config);
        }

        // Wait for the next snapshot from the source
        self.wait_for_next_config().await
    }

    async fn subscribe(
        &self,
        sink: mpsc::Sender<Config>,
        checks: Vec<ConfigChangedCheck>,
    ) -> Result<SubscriptionId> {
        if self.inner.closed.has_fired() {
            return Err(Error::ConfigDistributorClosed);
        }

        let mut state = self.inner.state.write().await;

        // Deliver the current snapshot right away, before the subscription
        // is registered, so the subscriber never misses the active config.
        if let Some(last_config) = state.last_config.clone() {
            if should_deliver(&checks, None, &last_config) {
                let _ = sink.send(last_config).await;
            }
        }

        let id = state.next_id;
        state.next_id += 1;
        state.subscriptions.insert(id, Subscription { sink, checks });

        drop(state);

        // First subscriber starts the monitor task
        if self.inner.started.fire() {
            let source = self.inner.source.lock().take();

            if let Some(source) = source {
                tokio::spawn(monitor_config(self.inner.clone(), source));
            }
        }

        Ok(id)
    }

    async fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.state.write().await.subscriptions.remove(&id);
    }
}

// -----------------------------------------------------------------------------
// ----- ConfigDistributor: Private --------------------------------------------

impl ConfigDistributor {
    /// Wait for the next snapshot by subscribing to ourselves for the
    /// duration of the call.
    async fn wait_for_next_config(&self) -> Result<Config> {
        let (next_config_tx, mut next_config_rx) = mpsc::channel(1);

        let id = self.subscribe(next_config_tx, Vec::new()).await?;

        let result = tokio::select! {
            maybe_config = next_config_rx.recv() => {
                maybe_config.ok_or(Error::ConfigDistributorClosed)
            }

            _ = self.inner.closed.done() => Err(Error::ConfigDistributorClosed),
        };

        self.unsubscribe(id).await;

        result
    }
}

// -----------------------------------------------------------------------------
// ----- Monitor task ----------------------------------------------------------

/// Wait for snapshots from the source and notify subscribers until the
/// source or the distributor closes.
async fn monitor_config(inner: Arc<Inner>, mut source: mpsc::Receiver<Config>) {
    debug!("config_distributor: monitor loop started");

    loop {
        tokio::select! {
            maybe_config = source.recv() => match maybe_config {
                Some(new_config) => notify_subscribers(&inner, new_config).await,

                None => {
                    debug!("config_distributor: source closed; closing the distributor");
                    close_distributor(&inner).await;
                    break;
                }
            },

            _ = inner.closed.done() => break,
        }
    }

    debug!("config_distributor: monitor loop exited");
}

/// Record the new snapshot and deliver it to every subscription whose
/// checks accept the transition. Runs under the write lock so subscribers
/// observe snapshots in source order.
async fn notify_subscribers(inner: &Inner, new_config: Config) {
    let mut state = inner.state.write().await;

    let old_config = state.last_config.replace(new_config.clone());

    let mut dropped = Vec::new();

    for (id, subscription) in state.subscriptions.iter() {
        if !should_deliver(&subscription.checks, old_config.as_ref(), &new_config) {
            continue;
        }

        // A send only fails when the subscriber dropped its receiver; the
        // subscription is dead weight then.
        if subscription.sink.send(new_config.clone()).await.is_err() {
            dropped.push(*id);
        }
    }

    for id in dropped {
        state.subscriptions.remove(&id);
    }
}

async fn close_distributor(inner: &Inner) {
    if !inner.closed.fire() {
        return;
    }

    inner.state.write().await.subscriptions.clear();
}

/// An empty check list accepts everything; otherwise any check may accept.
fn should_deliver(checks: &[ConfigChangedCheck], old: Option<&Config>, new: &Config) -> bool {
    if checks.is_empty() {
        return true;
    }

    checks.iter().any(|check| check(old, new))
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
