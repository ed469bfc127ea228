// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live event stream client for one run.
//!
//! Owns the run's deduplicated [`EventLog`] and a background task that
//! keeps the push channel open: connect, drain payloads into the log,
//! reconnect after a fixed delay when the transport drops. Because the log
//! is idempotent, the one-shot history pull and the live stream can overlap
//! freely and still converge on the same event list.

use crate::bus::{ChangeBus, StateChange};
use crate::error::EngineError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};
use usher_backend::BackendApi;
use usher_core::{EventLog, PlanId, RunEvent, RunId};

const HISTORY_PAGE_LIMIT: u64 = 500;

/// Connection state of the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Not started, or stopped.
    Idle,
    Connecting,
    Connected,
    /// Transport dropped; a reconnect is pending.
    Disconnected,
}

#[derive(Clone)]
pub struct EventStreamClient<B: BackendApi> {
    backend: B,
    bus: ChangeBus,
    run_id: RunId,
    plan_id: Option<PlanId>,
    log: Arc<Mutex<EventLog>>,
    state: Arc<Mutex<StreamState>>,
    reconnect_delay: Duration,
    shutdown: watch::Sender<bool>,
    active: Arc<AtomicBool>,
}

impl<B: BackendApi> EventStreamClient<B> {
    pub fn new(
        backend: B,
        bus: ChangeBus,
        run_id: RunId,
        plan_id: Option<PlanId>,
        reconnect_delay: Duration,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            backend,
            bus,
            run_id,
            plan_id,
            log: Arc::new(Mutex::new(EventLog::new())),
            state: Arc::new(Mutex::new(StreamState::Idle)),
            reconnect_delay,
            shutdown,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Snapshot of the merged event list, in first-seen order.
    pub fn events(&self) -> Vec<RunEvent> {
        self.log.lock().events().to_vec()
    }

    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }

    pub fn state(&self) -> StreamState {
        *self.state.lock()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Drop the log, including the seen-key set. Used on run change.
    pub fn clear(&self) {
        self.log.lock().clear();
        self.publish();
    }

    /// One-shot pull of prior events, paged until a short page. Safe to
    /// call while the live stream is running.
    pub async fn load_history(&self) -> Result<(), EngineError> {
        let mut cursor = 0;
        loop {
            let page = self
                .backend
                .fetch_events(&self.run_id, self.plan_id.as_ref(), cursor, HISTORY_PAGE_LIMIT)
                .await?;
            let page_len = page.len() as u64;
            let appended = self.log.lock().merge(page);
            if appended > 0 {
                self.publish();
            }
            if page_len < HISTORY_PAGE_LIMIT {
                return Ok(());
            }
            cursor += page_len;
        }
    }

    /// Start the background connect/drain/reconnect loop. Idempotent: a
    /// second start while running is a no-op.
    pub fn start(&self) {
        if self.active.swap(true, Ordering::SeqCst) {
            return;
        }
        // A fresh shutdown edge for this generation of the worker.
        self.shutdown.send_replace(false);
        let worker = self.clone();
        let shutdown = self.shutdown.subscribe();
        info!(run_id = %self.run_id, "event stream starting");
        tokio::spawn(async move {
            worker.run(shutdown).await;
            worker.active.store(false, Ordering::SeqCst);
            worker.set_state(StreamState::Idle);
        });
    }

    /// Signal the worker to exit. The log is retained.
    pub fn stop(&self) {
        info!(run_id = %self.run_id, "event stream stopping");
        self.shutdown.send_replace(true);
    }

    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                return;
            }
            self.set_state(StreamState::Connecting);
            let opened = tokio::select! {
                _ = shutdown.changed() => return,
                opened = self
                    .backend
                    .open_event_stream(&self.run_id, self.plan_id.as_ref()) => opened,
            };
            match opened {
                Ok(mut payloads) => {
                    self.set_state(StreamState::Connected);
                    loop {
                        tokio::select! {
                            _ = shutdown.changed() => return,
                            payload = payloads.recv() => match payload {
                                Some(payload) => self.ingest(&payload),
                                None => break,
                            },
                        }
                    }
                }
                Err(error) => {
                    debug!(run_id = %self.run_id, error = %error, "stream open failed");
                }
            }
            self.set_state(StreamState::Disconnected);
            tokio::select! {
                _ = shutdown.changed() => return,
                () = tokio::time::sleep(self.reconnect_delay) => {},
            }
        }
    }

    fn ingest(&self, payload: &str) {
        let appended = self.log.lock().merge_payload(payload);
        if appended > 0 {
            self.publish();
        }
    }

    fn set_state(&self, next: StreamState) {
        let changed = {
            let mut state = self.state.lock();
            let changed = *state != next;
            *state = next;
            changed
        };
        if changed {
            self.publish();
        }
    }

    fn publish(&self) {
        self.bus.publish(StateChange::Stream {
            run_id: self.run_id.clone(),
        });
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
