// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan lock state machine.
//!
//! One instance exists process-wide: it answers "is some plan currently
//! occupying the system". All mutation goes through the transition methods
//! below; direct field assignment would break the invariant that
//! `status == Idle` iff `active_plan_id` is `None` iff
//! `pending_review_runs` is empty.

use crate::id::{PlanId, RunId};
use crate::status::LockStatus;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Answer from the start guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartDecision {
    Allowed,
    Blocked { reason: String },
}

impl StartDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, StartDecision::Allowed)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            StartDecision::Allowed => None,
            StartDecision::Blocked { reason } => Some(reason),
        }
    }
}

/// Persisted lock state. Survives restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LockState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_plan_id: Option<PlanId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_run_id: Option<RunId>,
    #[serde(default)]
    pub status: LockStatus,
    #[serde(default)]
    pub pending_review_runs: IndexSet<RunId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_at_epoch_ms: Option<u64>,
}

impl LockState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.status == LockStatus::Idle
    }

    /// `Idle -> Executing`. Created implicitly on first plan start.
    pub fn lock_for_plan(&mut self, plan_id: PlanId, run_id: Option<RunId>, now_epoch_ms: u64) {
        self.active_plan_id = Some(plan_id);
        self.active_run_id = run_id;
        self.status = LockStatus::Executing;
        self.pending_review_runs.clear();
        self.locked_at_epoch_ms = Some(now_epoch_ms);
    }

    /// Attach a run id learned after the lock was taken (confirm responses
    /// may omit it; the list fallback resolves it later).
    pub fn set_active_run(&mut self, run_id: RunId) {
        self.active_run_id = Some(run_id);
    }

    /// `Executing -> Paused`. Returns false (unchanged) from any other state.
    pub fn pause(&mut self) -> bool {
        if self.status != LockStatus::Executing {
            return false;
        }
        self.status = LockStatus::Paused;
        true
    }

    /// `Paused -> Executing`. Returns false (unchanged) from any other state.
    pub fn resume(&mut self) -> bool {
        if self.status != LockStatus::Paused {
            return false;
        }
        self.status = LockStatus::Executing;
        true
    }

    /// Bulk transition into `AwaitingReview` with the given pending set.
    /// An empty set resets to idle instead: the lock never sits in
    /// `AwaitingReview` with nothing to review.
    pub fn set_awaiting_review(&mut self, run_ids: impl IntoIterator<Item = RunId>) {
        self.pending_review_runs = run_ids.into_iter().collect();
        if self.pending_review_runs.is_empty() {
            self.reset();
        } else {
            self.status = LockStatus::AwaitingReview;
        }
    }

    /// Add one pending review. Idempotent: re-adding a present id is a no-op.
    pub fn add_pending_review(&mut self, run_id: RunId) {
        self.pending_review_runs.insert(run_id);
        self.status = LockStatus::AwaitingReview;
    }

    /// Remove one pending review. When the set becomes empty the whole lock
    /// resets to idle, not just the one run. Returns whether the id was
    /// present.
    pub fn remove_pending_review(&mut self, run_id: &RunId) -> bool {
        let removed = self.pending_review_runs.shift_remove(run_id);
        if removed && self.pending_review_runs.is_empty() {
            self.reset();
        }
        removed
    }

    /// Unconditional reset to idle (force-unlock, complete-without-review,
    /// successful remote cancel).
    pub fn reset(&mut self) {
        *self = LockState::idle();
    }

    /// Guard, not a transition: may a new plan start right now?
    pub fn can_start_new_plan(&self) -> StartDecision {
        match self.status {
            LockStatus::Idle => StartDecision::Allowed,
            LockStatus::Executing | LockStatus::Paused => StartDecision::Blocked {
                reason: format!(
                    "plan {} is {} (run {})",
                    self.active_plan_id
                        .as_ref()
                        .map(PlanId::as_str)
                        .unwrap_or("?"),
                    self.status,
                    self.active_run_id
                        .as_ref()
                        .map(RunId::as_str)
                        .unwrap_or("unassigned"),
                ),
            },
            LockStatus::AwaitingReview => StartDecision::Blocked {
                reason: format!(
                    "plan {} has {} run(s) awaiting review",
                    self.active_plan_id
                        .as_ref()
                        .map(PlanId::as_str)
                        .unwrap_or("?"),
                    self.pending_review_runs.len(),
                ),
            },
        }
    }

    /// Invariant check used by tests and post-load validation: idle means
    /// no plan and nothing pending, and the pending set is non-empty
    /// exactly in `AwaitingReview`.
    pub fn invariant_holds(&self) -> bool {
        let idle = self.status == LockStatus::Idle;
        idle == self.active_plan_id.is_none()
            && (!idle || self.pending_review_runs.is_empty())
            && ((self.status == LockStatus::AwaitingReview)
                == !self.pending_review_runs.is_empty())
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
