// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted display order of runs.
//!
//! The console shows the run the user cares about first; promoting a run
//! moves it to the front without disturbing the relative order of the
//! rest. The list survives restart and is pruned against the set of runs
//! that still exist.

use crate::bus::{ChangeBus, StateChange};
use crate::error::EngineError;
use parking_lot::Mutex;
use std::sync::Arc;
use usher_core::RunId;
use usher_storage::{KvStore, StateStore};

#[derive(Clone)]
pub struct RunOrder<S: KvStore> {
    order: Arc<Mutex<Vec<RunId>>>,
    store: StateStore<S>,
    bus: ChangeBus,
}

impl<S: KvStore> RunOrder<S> {
    /// Load the persisted order (empty when nothing was saved).
    pub fn new(store: StateStore<S>, bus: ChangeBus) -> Result<Self, EngineError> {
        let order = store.load_run_order()?;
        Ok(Self {
            order: Arc::new(Mutex::new(order)),
            store,
            bus,
        })
    }

    pub fn order(&self) -> Vec<RunId> {
        self.order.lock().clone()
    }

    /// Move a run to the front, inserting it when unknown. Promoting the
    /// run already at the front is a no-op (nothing persisted).
    pub fn promote(&self, run_id: &RunId) -> Result<(), EngineError> {
        {
            let order = self.order.lock();
            if order.first() == Some(run_id) {
                return Ok(());
            }
        }
        self.persist_with(|order| {
            order.retain(|id| id != run_id);
            order.insert(0, run_id.clone());
        })
    }

    /// Drop runs no longer present on the backend, preserving order.
    pub fn retain_known(&self, live: &[RunId]) -> Result<(), EngineError> {
        let changed = {
            let order = self.order.lock();
            order.iter().any(|id| !live.contains(id))
        };
        if !changed {
            return Ok(());
        }
        self.persist_with(|order| order.retain(|id| live.contains(id)))
    }

    fn persist_with(&self, apply: impl FnOnce(&mut Vec<RunId>)) -> Result<(), EngineError> {
        let snapshot = {
            let mut order = self.order.lock();
            apply(&mut order);
            order.clone()
        };
        self.store.save_run_order(&snapshot)?;
        self.bus.publish(StateChange::RunOrder);
        Ok(())
    }
}

#[cfg(test)]
#[path = "run_order_tests.rs"]
mod tests;
