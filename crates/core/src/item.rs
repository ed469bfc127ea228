// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue item record and its status transitions.

use crate::id::{ChatId, PlanId, QueueItemId, RunId};
use crate::status::{ExecutionState, ReviewState, UnifiedStatus};
use serde::{Deserialize, Serialize};

/// One plan-execution request, owned exclusively by the queue.
///
/// `finished_at_epoch_ms` is set exactly once, on the first transition into
/// a terminal state; a stale-run-id refresh back into `Retrying` clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: QueueItemId,
    pub plan_id: PlanId,
    pub plan_text: String,
    pub status: ExecutionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_status: Option<ReviewState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    pub queued_at_epoch_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_epoch_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_epoch_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_workspace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<ChatId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_title: Option<String>,
}

impl QueueItem {
    pub fn new(
        id: QueueItemId,
        plan_id: PlanId,
        plan_text: impl Into<String>,
        queued_at_epoch_ms: u64,
    ) -> Self {
        Self {
            id,
            plan_id,
            plan_text: plan_text.into(),
            status: ExecutionState::Queued,
            review_status: None,
            run_id: None,
            queued_at_epoch_ms,
            started_at_epoch_ms: None,
            finished_at_epoch_ms: None,
            base_workspace: None,
            chat_id: None,
            chat_title: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_in_flight(&self) -> bool {
        self.status.is_in_flight()
    }

    /// `Queued -> Starting`, stamping `started_at` on first entry.
    pub fn mark_starting(&mut self, now_epoch_ms: u64) {
        self.status = ExecutionState::Starting;
        if self.started_at_epoch_ms.is_none() {
            self.started_at_epoch_ms = Some(now_epoch_ms);
        }
    }

    /// `Starting -> Running` with the resolved run id.
    pub fn mark_running(&mut self, run_id: RunId) {
        self.status = ExecutionState::Running;
        self.run_id = Some(run_id);
    }

    /// Terminal failure, stamping `finished_at` once.
    pub fn mark_failed(&mut self, now_epoch_ms: u64) {
        self.apply_status(UnifiedStatus::new(ExecutionState::Failed), now_epoch_ms);
    }

    /// Terminal cancellation, stamping `finished_at` once.
    pub fn mark_canceled(&mut self, now_epoch_ms: u64) {
        self.apply_status(UnifiedStatus::new(ExecutionState::Canceled), now_epoch_ms);
    }

    /// Adopt a freshly resolved status. `finished_at` is stamped on the
    /// first terminal transition only and never overwritten.
    pub fn apply_status(&mut self, status: UnifiedStatus, now_epoch_ms: u64) {
        self.status = status.execution;
        self.review_status = status.review;
        if status.execution.is_terminal() {
            if self.finished_at_epoch_ms.is_none() {
                self.finished_at_epoch_ms = Some(now_epoch_ms);
            }
        } else {
            self.finished_at_epoch_ms = None;
        }
    }

    /// A stale run id was replaced during polling: back to `Retrying` with
    /// the refreshed id, terminal timestamp cleared.
    pub fn retry_with(&mut self, run_id: RunId) {
        self.status = ExecutionState::Retrying;
        self.review_status = None;
        self.run_id = Some(run_id);
        self.finished_at_epoch_ms = None;
    }
}

#[cfg(test)]
#[path = "item_tests.rs"]
mod tests;
