// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The remote backend port.
//!
//! The backend is authoritative for execution; this client only confirms
//! plans, reads run and task state, and relays lifecycle actions. The port
//! is implemented by [`crate::HttpBackend`] in production and by
//! [`crate::FakeBackend`] in tests.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use usher_core::{PlanId, RunEvent, RunId, TaskState};

/// Errors from backend operations
#[derive(Debug, Error)]
pub enum BackendError {
    /// Network failure, stream error, or a non-2xx response without an
    /// application error body. Always recovered locally via retry/poll.
    #[error("transport error: {0}")]
    Transport(String),
    /// The backend answered `{ok: false, error}`. Surfaced to the user,
    /// never corrupts local state.
    #[error("backend error: {message}")]
    Application { message: String },
    /// The run disappeared server-side. No retry.
    #[error("not found")]
    NotFound,
    /// A 2xx body the client could not decode.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Payload for `POST /api/assistant/confirm`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub plan_id: PlanId,
    pub workspace: Option<String>,
    pub mode: String,
    pub policy: Option<String>,
}

/// Response to a confirm call. The run id may be absent: some backends
/// start the run asynchronously and only surface the id via the run list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmOutcome {
    pub run_id: Option<RunId>,
    pub status: Option<String>,
}

/// One run's record, normalized from the alias-laden wire shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRecord {
    pub run_id: Option<RunId>,
    pub status: Option<String>,
    pub workspace_main_root: Option<String>,
    pub patchset_path: Option<String>,
}

/// One entry of the run list, used for id recovery and polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: RunId,
    pub plan_id: Option<PlanId>,
    pub status: Option<String>,
}

/// Plan detail: the parsed task snapshot plus the raw chain text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanDetail {
    pub tasks: Vec<TaskState>,
    pub task_chain_text: Option<String>,
}

/// Async port to the execution backend.
#[async_trait]
pub trait BackendApi: Clone + Send + Sync + 'static {
    /// Confirm (start) a plan.
    async fn confirm_plan(&self, request: &ConfirmRequest) -> Result<ConfirmOutcome, BackendError>;

    /// Fetch one run's record.
    async fn get_run(
        &self,
        run_id: &RunId,
        plan_id: Option<&PlanId>,
    ) -> Result<RunRecord, BackendError>;

    /// List runs, optionally scoped to a workspace.
    async fn list_runs(&self, workspace: Option<&str>) -> Result<Vec<RunSummary>, BackendError>;

    /// Fetch a plan's task snapshot.
    async fn get_plan(&self, plan_id: &PlanId) -> Result<PlanDetail, BackendError>;

    /// One-shot pull of prior events, already normalized.
    async fn fetch_events(
        &self,
        run_id: &RunId,
        plan_id: Option<&PlanId>,
        cursor: u64,
        limit: u64,
    ) -> Result<Vec<RunEvent>, BackendError>;

    /// Open the push channel. Each received string is one raw message
    /// payload; the channel closing means the transport ended.
    async fn open_event_stream(
        &self,
        run_id: &RunId,
        plan_id: Option<&PlanId>,
    ) -> Result<mpsc::Receiver<String>, BackendError>;

    /// Apply a completed run's patchset.
    async fn apply_run(&self, run_id: &RunId) -> Result<(), BackendError>;

    /// Discard a completed run's patchset.
    async fn discard_run(&self, run_id: &RunId) -> Result<(), BackendError>;

    /// Cancel one run.
    async fn cancel_run(&self, run_id: &RunId) -> Result<(), BackendError>;

    /// Pause the active run.
    async fn pause_plan(&self, plan_id: &PlanId, run_id: &RunId) -> Result<(), BackendError>;

    /// Resume the paused run.
    async fn resume_plan(&self, plan_id: &PlanId, run_id: &RunId) -> Result<(), BackendError>;

    /// Cancel every run of a plan.
    async fn cancel_plan_runs(&self, plan_id: &PlanId) -> Result<(), BackendError>;
}
