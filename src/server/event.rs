//! One-shot event: fire once, observe forever.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

// -----------------------------------------------------------------------------
// ----- Event -----------------------------------------------------------------

/// A one-time event that may occur in the future.
///
/// Exactly one caller wins `fire()`; every observer of `done()` wakes when
/// it happens, including observers that subscribe afterwards. Clones share
/// the same underlying event.
#[derive(Clone, Debug)]
pub struct Event {
    inner: Arc<EventInner>,
}

#[derive(Debug)]
struct EventInner {
    fired: AtomicBool,
    done_tx: watch::Sender<bool>,
}

impl Event {
    pub fn new() -> Self {
        let (done_tx, _done_rx) = watch::channel(false);

        Self {
            inner: Arc::new(EventInner {
                fired: AtomicBool::new(false),
                done_tx,
            }),
        }
    }

    /// Cause the event to complete. Safe to call multiple times and
    /// concurrently; returns true only for the call that actually fired it.
    pub fn fire(&self) -> bool {
        if self
            .inner
            .fired
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        // Wake everyone waiting on done(). Send only fails when there are
        // no receivers, which is fine: future done() calls read the flag.
        let _ = self.inner.done_tx.send(true);

        true
    }

    /// True once `fire` has been called.
    pub fn has_fired(&self) -> bool {
        self.inner.fired.load(Ordering::SeqCst)
    }

    /// Wait until the event fires. Returns immediately if it already has.
    pub async fn done(&self) {
        if self.has_fired() {
            return;
        }

        let mut done_rx = self.inner.done_tx.subscribe();
        let _ = done_rx.wait_for(|fired| *fired).await;
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fire_returns_true_exactly_once() {
        let event = Event::new();

        assert!(!event.has_fired());
        assert!(event.fire());
        assert!(!event.fire());
        assert!(event.has_fired());
    }

    #[tokio::test]
    async fn done_resolves_after_fire() {
        let event = Event::new();
        let waiter = event.clone();

        let handle = tokio::spawn(async move {
            waiter.done().await;
        });

        event.fire();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn done_resolves_immediately_when_already_fired() {
        let event = Event::new();
        event.fire();

        // Must not hang.
        event.done().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_fire_has_a_single_winner() {
        let event = Event::new();
        let mut handles = Vec::new();

        for _ in 0..1000 {
            let event = event.clone();
            handles.push(tokio::spawn(async move { event.fire() }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        assert!(event.has_fired());
        event.done().await;
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
