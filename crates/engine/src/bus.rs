// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change-notification bus.
//!
//! Every lock/queue/stream mutation publishes here so the console can
//! re-read state when something changed instead of polling the stores.
//! Publishing with no subscribers is a no-op.

use tokio::sync::broadcast;
use usher_core::RunId;

const BUS_CAPACITY: usize = 64;

/// What part of the client state changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    Lock,
    Queue,
    Stream { run_id: RunId },
    RunOrder,
}

#[derive(Debug, Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<StateChange>,
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, change: StateChange) {
        // No receivers is fine: state is still persisted and readable.
        let _ = self.tx.send(change);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
