//! Per-connection liveness ticker.
//!
//! Logs a liveness tick for the connection at a fixed interval. The task is
//! owned by a [`HeartbeatGuard`]; dropping the guard signals the task through a
//! `watch` channel and it exits at its next wakeup.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Cancels the heartbeat task when dropped.
#[derive(Debug)]
pub struct HeartbeatGuard {
    cancel: watch::Sender<bool>,
    ticks: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl HeartbeatGuard {
    /// Spawn a heartbeat for `peer` ticking every `interval`.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero.
    pub fn spawn(peer: impl Into<String>, interval: Duration) -> Self {
        let peer = peer.into();
        let (cancel, mut cancelled) = watch::channel(false);
        let ticks = Arc::new(AtomicU64::new(0));
        let counter = ticks.clone();

        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
                        debug!(peer = %peer, ticks = n, "connection still alive");
                    }
                    changed = cancelled.changed() => {
                        if changed.is_err() || *cancelled.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!(peer = %peer, "heartbeat stopped");
        });

        Self {
            cancel,
            ticks,
            handle: Some(handle),
        }
    }

    /// Number of ticks emitted so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Cancel the task and wait for it to exit.
    pub async fn stop(mut self) {
        let _ = self.cancel.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for HeartbeatGuard {
    fn drop(&mut self) {
        let _ = self.cancel.send(true);
    }
}
