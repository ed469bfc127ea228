// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed accessors over the key-value port.
//!
//! Five documents are persisted: the plan lock, the execution queue, the
//! queue-paused flag, the learned base workspace, and the run display
//! order. Each loads to its zero value when absent so first launch needs
//! no migration step.

use crate::kv::KvStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use usher_core::{LockState, QueueItem, RunId};

pub const KEY_PLAN_LOCK: &str = "plan-lock";
pub const KEY_EXECUTION_QUEUE: &str = "execution-queue";
pub const KEY_QUEUE_PAUSED: &str = "queue-paused";
pub const KEY_BASE_WORKSPACE: &str = "base-workspace";
pub const KEY_RUN_DISPLAY_ORDER: &str = "run-display-order";

/// Errors from persistence operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Typed state accessors over any [`KvStore`].
#[derive(Debug, Clone)]
pub struct StateStore<S: KvStore> {
    store: S,
}

impl<S: KvStore> StateStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn load<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, StoreError> {
        match self.store.get(key)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(T::default()),
        }
    }

    fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;
        self.store.put(key, &json)
    }

    pub fn load_lock(&self) -> Result<LockState, StoreError> {
        self.load(KEY_PLAN_LOCK)
    }

    pub fn save_lock(&self, lock: &LockState) -> Result<(), StoreError> {
        self.save(KEY_PLAN_LOCK, lock)
    }

    pub fn load_queue(&self) -> Result<Vec<QueueItem>, StoreError> {
        self.load(KEY_EXECUTION_QUEUE)
    }

    pub fn save_queue(&self, items: &[QueueItem]) -> Result<(), StoreError> {
        self.save(KEY_EXECUTION_QUEUE, &items)
    }

    pub fn load_queue_paused(&self) -> Result<bool, StoreError> {
        self.load(KEY_QUEUE_PAUSED)
    }

    pub fn save_queue_paused(&self, paused: bool) -> Result<(), StoreError> {
        self.save(KEY_QUEUE_PAUSED, &paused)
    }

    pub fn load_base_workspace(&self) -> Result<Option<String>, StoreError> {
        self.load(KEY_BASE_WORKSPACE)
    }

    pub fn save_base_workspace(&self, workspace: &str) -> Result<(), StoreError> {
        self.save(KEY_BASE_WORKSPACE, &Some(workspace))
    }

    pub fn load_run_order(&self) -> Result<Vec<RunId>, StoreError> {
        self.load(KEY_RUN_DISPLAY_ORDER)
    }

    pub fn save_run_order(&self, order: &[RunId]) -> Result<(), StoreError> {
        self.save(KEY_RUN_DISPLAY_ORDER, &order)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
