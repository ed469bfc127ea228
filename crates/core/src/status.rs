// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status vocabulary shared by the queue, the lock, and the resolver.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution phase of a plan run as tracked by the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Queued,
    Starting,
    Running,
    /// Backend record looked terminal but the task snapshot says otherwise;
    /// also entered when a stale run id is replaced during polling.
    Retrying,
    Completed,
    Failed,
    Canceled,
    Discarded,
}

impl ExecutionState {
    /// Terminal states never transition further on their own; only a
    /// stale-run-id refresh can pull an item back out (into `Retrying`).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionState::Completed
                | ExecutionState::Failed
                | ExecutionState::Canceled
                | ExecutionState::Discarded
        )
    }

    /// States that occupy the single execution slot.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            ExecutionState::Starting | ExecutionState::Running | ExecutionState::Retrying
        )
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionState::Queued => write!(f, "queued"),
            ExecutionState::Starting => write!(f, "starting"),
            ExecutionState::Running => write!(f, "running"),
            ExecutionState::Retrying => write!(f, "retrying"),
            ExecutionState::Completed => write!(f, "completed"),
            ExecutionState::Failed => write!(f, "failed"),
            ExecutionState::Canceled => write!(f, "canceled"),
            ExecutionState::Discarded => write!(f, "discarded"),
        }
    }
}

/// Review phase of a completed run's patchset.
///
/// Absence of review (the wire's `none` or `null`) is modeled as
/// `Option::<ReviewState>::None`, never as a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Pending,
    Approved,
    Applied,
    Rejected,
    Reworking,
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewState::Pending => write!(f, "pending"),
            ReviewState::Approved => write!(f, "approved"),
            ReviewState::Applied => write!(f, "applied"),
            ReviewState::Rejected => write!(f, "rejected"),
            ReviewState::Reworking => write!(f, "reworking"),
        }
    }
}

/// Occupancy state of the process-wide plan lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockStatus {
    #[default]
    Idle,
    Executing,
    Paused,
    AwaitingReview,
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockStatus::Idle => write!(f, "idle"),
            LockStatus::Executing => write!(f, "executing"),
            LockStatus::Paused => write!(f, "paused"),
            LockStatus::AwaitingReview => write!(f, "awaiting_review"),
        }
    }
}

/// Status of one sub-task in a plan's task snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Todo,
    Doing,
    Running,
    Stale,
    Done,
    Failed,
    Canceled,
}

impl TaskState {
    /// Parse a backend task-status string. Case-insensitive, hyphens treated
    /// as underscores; unknown strings yield `None` (no signal).
    pub fn parse(raw: &str) -> Option<TaskState> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "todo" | "pending" => Some(TaskState::Todo),
            "doing" | "in_progress" => Some(TaskState::Doing),
            "running" => Some(TaskState::Running),
            "stale" => Some(TaskState::Stale),
            "done" | "completed" => Some(TaskState::Done),
            "failed" | "error" => Some(TaskState::Failed),
            "canceled" | "cancelled" => Some(TaskState::Canceled),
            _ => None,
        }
    }

    /// Active tasks keep the plan counted as running.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            TaskState::Todo | TaskState::Doing | TaskState::Stale | TaskState::Running
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Todo => write!(f, "todo"),
            TaskState::Doing => write!(f, "doing"),
            TaskState::Running => write!(f, "running"),
            TaskState::Stale => write!(f, "stale"),
            TaskState::Done => write!(f, "done"),
            TaskState::Failed => write!(f, "failed"),
            TaskState::Canceled => write!(f, "canceled"),
        }
    }
}

/// The one status value all control decisions read.
///
/// Invariant: `review` is `Some` only when `execution == Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedStatus {
    pub execution: ExecutionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewState>,
}

impl UnifiedStatus {
    /// A status with no review component.
    pub fn new(execution: ExecutionState) -> Self {
        Self {
            execution,
            review: None,
        }
    }

    /// A completed status carrying review metadata.
    pub fn completed(review: Option<ReviewState>) -> Self {
        Self {
            execution: ExecutionState::Completed,
            review,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.execution.is_terminal()
    }

    /// Completed with the review gate still open.
    pub fn needs_review(&self) -> bool {
        self.execution == ExecutionState::Completed && self.review == Some(ReviewState::Pending)
    }
}

impl fmt::Display for UnifiedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.review {
            Some(review) => write!(f, "{}/{}", self.execution, review),
            None => write!(f, "{}", self.execution),
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
