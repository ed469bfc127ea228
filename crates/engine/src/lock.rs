// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The process-wide execution lock component.
//!
//! Wraps the pure [`LockState`] machine with persistence, change-bus
//! publication, and the remote pause/resume/cancel calls. Remote-backed
//! transitions flip local state only after the backend call succeeds;
//! everything else mutates locally and saves through the store port.

use crate::bus::{ChangeBus, StateChange};
use crate::error::EngineError;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;
use usher_backend::BackendApi;
use usher_core::{Clock, LockState, PlanId, RunId, StartDecision};
use usher_storage::{KvStore, StateStore};

#[derive(Debug, Clone)]
pub struct ExecutionLock<B, S, C>
where
    B: BackendApi,
    S: KvStore,
    C: Clock + Clone,
{
    state: Arc<Mutex<LockState>>,
    store: StateStore<S>,
    backend: B,
    bus: ChangeBus,
    clock: C,
}

impl<B, S, C> ExecutionLock<B, S, C>
where
    B: BackendApi,
    S: KvStore,
    C: Clock + Clone,
{
    /// Load the persisted lock (idle when nothing was saved).
    pub fn new(
        backend: B,
        store: StateStore<S>,
        bus: ChangeBus,
        clock: C,
    ) -> Result<Self, EngineError> {
        let state = store.load_lock()?;
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            store,
            backend,
            bus,
            clock,
        })
    }

    /// Point-in-time copy of the lock state.
    pub fn snapshot(&self) -> LockState {
        self.state.lock().clone()
    }

    /// Guard consulted by every plan-start call site.
    pub fn can_start_new_plan(&self) -> StartDecision {
        self.state.lock().can_start_new_plan()
    }

    /// Mutate, persist, publish. The mutex is released before the save so
    /// it is never held across I/O.
    fn mutate(&self, apply: impl FnOnce(&mut LockState)) -> Result<(), EngineError> {
        let snapshot = {
            let mut state = self.state.lock();
            apply(&mut state);
            state.clone()
        };
        self.store.save_lock(&snapshot)?;
        self.bus.publish(StateChange::Lock);
        Ok(())
    }

    /// Take the lock for a plan.
    pub fn lock_for_plan(
        &self,
        plan_id: &PlanId,
        run_id: Option<&RunId>,
    ) -> Result<(), EngineError> {
        let now = self.clock.epoch_ms();
        info!(plan_id = %plan_id, "locking for plan");
        self.mutate(|state| state.lock_for_plan(plan_id.clone(), run_id.cloned(), now))
    }

    /// Attach a run id resolved after the lock was taken.
    pub fn set_active_run(&self, run_id: &RunId) -> Result<(), EngineError> {
        self.mutate(|state| state.set_active_run(run_id.clone()))
    }

    /// Remote pause; local state flips only on success.
    pub async fn pause_execution(&self) -> Result<(), EngineError> {
        let (plan_id, run_id) = self.active_pair("pause")?;
        self.backend.pause_plan(&plan_id, &run_id).await?;
        info!(plan_id = %plan_id, run_id = %run_id, "execution paused");
        self.mutate(|state| {
            state.pause();
        })
    }

    /// Remote resume; local state flips only on success.
    pub async fn resume_execution(&self) -> Result<(), EngineError> {
        let (plan_id, run_id) = self.active_pair("resume")?;
        self.backend.resume_plan(&plan_id, &run_id).await?;
        info!(plan_id = %plan_id, run_id = %run_id, "execution resumed");
        self.mutate(|state| {
            state.resume();
        })
    }

    /// Remote cancel of every run of the active plan; resets locally only
    /// on success.
    pub async fn cancel_execution(&self) -> Result<(), EngineError> {
        let plan_id = {
            let state = self.state.lock();
            state.active_plan_id.clone().ok_or(EngineError::Blocked {
                reason: "no active plan to cancel".to_string(),
            })?
        };
        self.backend.cancel_plan_runs(&plan_id).await?;
        info!(plan_id = %plan_id, "plan runs canceled, unlocking");
        self.mutate(LockState::reset)
    }

    /// Bulk transition into awaiting-review.
    pub fn set_awaiting_review(
        &self,
        run_ids: impl IntoIterator<Item = RunId>,
    ) -> Result<(), EngineError> {
        self.mutate(|state| state.set_awaiting_review(run_ids))
    }

    /// Add one pending review (idempotent).
    pub fn add_pending_review(&self, run_id: &RunId) -> Result<(), EngineError> {
        info!(run_id = %run_id, "run awaiting review");
        self.mutate(|state| state.add_pending_review(run_id.clone()))
    }

    /// Resolve one pending review; the lock resets to idle when it was the
    /// last one.
    pub fn remove_pending_review(&self, run_id: &RunId) -> Result<(), EngineError> {
        info!(run_id = %run_id, "pending review resolved");
        self.mutate(|state| {
            state.remove_pending_review(run_id);
        })
    }

    /// Unconditional reset.
    pub fn force_unlock(&self) -> Result<(), EngineError> {
        info!("force unlock");
        self.mutate(LockState::reset)
    }

    /// The active plan finished without a review gate; release the lock.
    pub fn complete_without_review(&self) -> Result<(), EngineError> {
        info!("completed without review, unlocking");
        self.mutate(LockState::reset)
    }

    fn active_pair(&self, action: &str) -> Result<(PlanId, RunId), EngineError> {
        let state = self.state.lock();
        match (&state.active_plan_id, &state.active_run_id) {
            (Some(plan_id), Some(run_id)) => Ok((plan_id.clone(), run_id.clone())),
            _ => Err(EngineError::Blocked {
                reason: format!("cannot {action}: no active run"),
            }),
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
