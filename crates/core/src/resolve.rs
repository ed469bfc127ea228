// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-source status resolution.
//!
//! The backend's run record and the plan's task snapshot can disagree: the
//! record lags behind task reality, and snapshots can be incomplete. The
//! resolver picks whichever source is more conservative about declaring a
//! plan genuinely finished, and never overrides a backend review gate.

use crate::status::{ExecutionState, ReviewState, TaskState, UnifiedStatus};

/// Map a raw backend status string onto [`UnifiedStatus`].
///
/// Case-insensitive, hyphens normalized to underscores. Unknown or absent
/// input maps to running with no review: a transient status the client does
/// not recognize must never freeze the UI in a terminal state.
pub fn normalize_backend_status(raw: Option<&str>) -> UnifiedStatus {
    let Some(raw) = raw else {
        return UnifiedStatus::new(ExecutionState::Running);
    };
    let norm = raw.trim().to_ascii_lowercase().replace('-', "_");
    match norm.as_str() {
        "queued" | "pending" | "waiting" => UnifiedStatus::new(ExecutionState::Queued),
        "starting" | "initializing" => UnifiedStatus::new(ExecutionState::Starting),
        // Pause is a lock concern; the run still occupies the system.
        "running" | "executing" | "in_progress" | "paused" => {
            UnifiedStatus::new(ExecutionState::Running)
        }
        "retrying" => UnifiedStatus::new(ExecutionState::Retrying),
        "completed" | "complete" | "done" | "success" | "succeeded" => {
            UnifiedStatus::completed(None)
        }
        "failed" | "error" => UnifiedStatus::new(ExecutionState::Failed),
        "canceled" | "cancelled" => UnifiedStatus::new(ExecutionState::Canceled),
        "discarded" => UnifiedStatus::new(ExecutionState::Discarded),
        "awaiting_review" | "pending_review" | "review_pending" => {
            UnifiedStatus::completed(Some(ReviewState::Pending))
        }
        "approved" => UnifiedStatus::completed(Some(ReviewState::Approved)),
        "applied" => UnifiedStatus::completed(Some(ReviewState::Applied)),
        "rejected" => UnifiedStatus::completed(Some(ReviewState::Rejected)),
        "reworking" => UnifiedStatus::completed(Some(ReviewState::Reworking)),
        _ => UnifiedStatus::new(ExecutionState::Running),
    }
}

/// Collapse a task snapshot into an execution state, or `None` when the
/// snapshot carries no signal (empty, or nothing recognizable).
pub fn derive_status_from_tasks(tasks: &[TaskState]) -> Option<ExecutionState> {
    if tasks.is_empty() {
        return None;
    }
    if tasks.iter().all(|t| *t == TaskState::Done) {
        return Some(ExecutionState::Completed);
    }
    if tasks.iter().any(|t| *t == TaskState::Failed) {
        return Some(ExecutionState::Failed);
    }
    if tasks.iter().any(|t| *t == TaskState::Canceled) {
        return Some(ExecutionState::Canceled);
    }
    if tasks.iter().any(TaskState::is_active) {
        return Some(ExecutionState::Running);
    }
    None
}

/// Reconcile the backend run record with the task snapshot.
///
/// Policy, in order:
/// - a backend review gate (`review == pending`) is trusted outright;
/// - task-derived `Running` against a terminal-looking backend record
///   (`failed`/`canceled`/`discarded`) means the record is stale: `Retrying`;
/// - task-derived `Completed` keeps the backend's review state, defaulting
///   to `Pending` when the backend omitted review metadata;
/// - any other task-derived state passes through without review;
/// - with no task signal, the normalized backend status stands.
pub fn resolve_status(backend: Option<&str>, tasks: Option<&[TaskState]>) -> UnifiedStatus {
    let normalized = normalize_backend_status(backend);
    if normalized.review == Some(ReviewState::Pending) {
        return normalized;
    }

    if let Some(derived) = tasks.and_then(derive_status_from_tasks) {
        return match derived {
            ExecutionState::Running
                if matches!(
                    normalized.execution,
                    ExecutionState::Failed | ExecutionState::Canceled | ExecutionState::Discarded
                ) =>
            {
                UnifiedStatus::new(ExecutionState::Retrying)
            }
            ExecutionState::Completed => {
                UnifiedStatus::completed(Some(normalized.review.unwrap_or(ReviewState::Pending)))
            }
            other => UnifiedStatus::new(other),
        };
    }

    normalized
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
