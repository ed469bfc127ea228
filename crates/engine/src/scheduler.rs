// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-cadence reconciliation driver.
//!
//! Runs one poll of its target per period, gated on visibility: while the
//! console is hidden the cadence keeps ticking but no network work happens,
//! and the first return to visibility polls immediately instead of waiting
//! out the remainder of the period.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing::info;

/// Something the scheduler drives. One call is one reconciliation pass;
/// the target owns its own error handling.
#[async_trait]
pub trait PollTarget: Clone + Send + Sync + 'static {
    async fn poll(&self);
}

#[derive(Clone)]
pub struct PollingScheduler<T: PollTarget> {
    target: T,
    period: Duration,
    visible: Arc<AtomicBool>,
    wake: Arc<Notify>,
    shutdown: watch::Sender<bool>,
    active: Arc<AtomicBool>,
}

impl<T: PollTarget> PollingScheduler<T> {
    pub fn new(target: T, period: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            target,
            period,
            visible: Arc::new(AtomicBool::new(true)),
            wake: Arc::new(Notify::new()),
            shutdown,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    /// Gate polling on console visibility. Turning visible again wakes the
    /// worker for an immediate pass.
    pub fn set_visible(&self, visible: bool) {
        let was = self.visible.swap(visible, Ordering::SeqCst);
        if visible && !was {
            self.wake.notify_one();
        }
    }

    /// Force an extra pass now, out of cadence. Used after user actions
    /// whose effect should show without waiting out the period.
    pub fn trigger(&self) {
        self.wake.notify_one();
    }

    /// Start the cadence. Idempotent: a second start while running is a
    /// no-op. The first pass happens immediately when visible.
    pub fn start(&self) {
        if self.active.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown.send_replace(false);
        let scheduler = self.clone();
        let shutdown = self.shutdown.subscribe();
        info!(period_ms = self.period.as_millis() as u64, "polling scheduler starting");
        tokio::spawn(async move {
            scheduler.run(shutdown).await;
            scheduler.active.store(false, Ordering::SeqCst);
        });
    }

    pub fn stop(&self) {
        info!("polling scheduler stopping");
        self.shutdown.send_replace(true);
    }

    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                return;
            }
            if self.visible.load(Ordering::SeqCst) {
                self.target.poll().await;
            }
            tokio::select! {
                _ = shutdown.changed() => return,
                () = tokio::time::sleep(self.period) => {},
                () = self.wake.notified() => {},
            }
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
