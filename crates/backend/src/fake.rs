// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake backend for deterministic testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::api::{
    BackendApi, BackendError, ConfirmOutcome, ConfirmRequest, PlanDetail, RunRecord, RunSummary,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use usher_core::{PlanId, RunEvent, RunId, TaskState};

const STREAM_CHANNEL_CAPACITY: usize = 64;

/// Recorded call to FakeBackend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Confirm { plan_id: PlanId },
    GetRun { run_id: RunId },
    ListRuns,
    GetPlan { plan_id: PlanId },
    FetchEvents { run_id: RunId, cursor: u64, limit: u64 },
    OpenStream { run_id: RunId },
    ApplyRun { run_id: RunId },
    DiscardRun { run_id: RunId },
    CancelRun { run_id: RunId },
    Pause { plan_id: PlanId, run_id: RunId },
    Resume { plan_id: PlanId, run_id: RunId },
    CancelPlanRuns { plan_id: PlanId },
}

/// Fake backend for testing.
///
/// Allows programmatic control over responses and records all calls.
/// One-shot error injection: a scripted error is returned once, then
/// cleared (`Option::take`), matching how transport faults come and go.
#[derive(Clone, Default)]
pub struct FakeBackend {
    inner: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<BackendCall>,
    confirm_outcome: ConfirmOutcome,
    runs: HashMap<RunId, RunRecord>,
    run_list: Vec<RunSummary>,
    plans: HashMap<PlanId, PlanDetail>,
    history: HashMap<RunId, Vec<RunEvent>>,
    confirm_error: Option<BackendError>,
    get_run_error: Option<BackendError>,
    list_runs_error: Option<BackendError>,
    pause_error: Option<BackendError>,
    resume_error: Option<BackendError>,
    cancel_plan_error: Option<BackendError>,
    stream_error: Option<BackendError>,
    stream_senders: Vec<mpsc::Sender<String>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<BackendCall> {
        self.inner.lock().calls.clone()
    }

    /// Clear recorded calls
    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    /// Script the confirm response.
    pub fn set_confirm_run_id(&self, run_id: Option<&str>) {
        self.inner.lock().confirm_outcome = ConfirmOutcome {
            run_id: run_id.map(RunId::new),
            status: None,
        };
    }

    /// Register or replace a run record.
    pub fn set_run(&self, run_id: &str, record: RunRecord) {
        self.inner.lock().runs.insert(RunId::new(run_id), record);
    }

    /// Register a run with just a status.
    pub fn set_run_status(&self, run_id: &str, status: &str) {
        self.set_run(
            run_id,
            RunRecord {
                run_id: Some(RunId::new(run_id)),
                status: Some(status.to_string()),
                ..RunRecord::default()
            },
        );
    }

    /// Remove a run so the next fetch sees `NotFound`.
    pub fn remove_run(&self, run_id: &str) {
        self.inner.lock().runs.remove(&RunId::new(run_id));
    }

    /// Script the run list returned by `list_runs`.
    pub fn set_run_list(&self, list: Vec<(&str, Option<&str>, Option<&str>)>) {
        self.inner.lock().run_list = list
            .into_iter()
            .map(|(run_id, plan_id, status)| RunSummary {
                run_id: RunId::new(run_id),
                plan_id: plan_id.map(PlanId::new),
                status: status.map(str::to_string),
            })
            .collect();
    }

    /// Script a plan's task snapshot from backend status strings.
    pub fn set_plan_tasks(&self, plan_id: &str, statuses: &[&str]) {
        let tasks: Vec<TaskState> = statuses.iter().filter_map(|s| TaskState::parse(s)).collect();
        self.inner.lock().plans.insert(
            PlanId::new(plan_id),
            PlanDetail {
                tasks,
                task_chain_text: None,
            },
        );
    }

    /// Script the history pull for a run from wire-shaped event objects.
    pub fn set_history(&self, run_id: &str, wire_events: &[Value]) {
        let events: Vec<RunEvent> = wire_events.iter().filter_map(RunEvent::from_wire).collect();
        self.inner.lock().history.insert(RunId::new(run_id), events);
    }

    pub fn set_confirm_error(&self, error: BackendError) {
        self.inner.lock().confirm_error = Some(error);
    }

    pub fn set_get_run_error(&self, error: BackendError) {
        self.inner.lock().get_run_error = Some(error);
    }

    pub fn set_list_runs_error(&self, error: BackendError) {
        self.inner.lock().list_runs_error = Some(error);
    }

    pub fn set_pause_error(&self, error: BackendError) {
        self.inner.lock().pause_error = Some(error);
    }

    pub fn set_resume_error(&self, error: BackendError) {
        self.inner.lock().resume_error = Some(error);
    }

    pub fn set_cancel_plan_error(&self, error: BackendError) {
        self.inner.lock().cancel_plan_error = Some(error);
    }

    /// Fail the next stream open attempt.
    pub fn set_stream_error(&self, error: BackendError) {
        self.inner.lock().stream_error = Some(error);
    }

    /// Sender side of the most recently opened stream, for pushing
    /// payloads from the test. Dropping it simulates transport loss.
    pub fn last_stream_sender(&self) -> Option<mpsc::Sender<String>> {
        self.inner.lock().stream_senders.last().cloned()
    }

    /// Drop all held sender sides, closing every open stream.
    pub fn close_streams(&self) {
        self.inner.lock().stream_senders.clear();
    }

    /// How many times a stream was opened.
    pub fn stream_open_count(&self) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, BackendCall::OpenStream { .. }))
            .count()
    }
}

#[async_trait]
impl BackendApi for FakeBackend {
    async fn confirm_plan(&self, request: &ConfirmRequest) -> Result<ConfirmOutcome, BackendError> {
        let mut inner = self.inner.lock();
        inner.calls.push(BackendCall::Confirm {
            plan_id: request.plan_id.clone(),
        });
        if let Some(error) = inner.confirm_error.take() {
            return Err(error);
        }
        Ok(inner.confirm_outcome.clone())
    }

    async fn get_run(
        &self,
        run_id: &RunId,
        _plan_id: Option<&PlanId>,
    ) -> Result<RunRecord, BackendError> {
        let mut inner = self.inner.lock();
        inner.calls.push(BackendCall::GetRun {
            run_id: run_id.clone(),
        });
        if let Some(error) = inner.get_run_error.take() {
            return Err(error);
        }
        inner.runs.get(run_id).cloned().ok_or(BackendError::NotFound)
    }

    async fn list_runs(&self, _workspace: Option<&str>) -> Result<Vec<RunSummary>, BackendError> {
        let mut inner = self.inner.lock();
        inner.calls.push(BackendCall::ListRuns);
        if let Some(error) = inner.list_runs_error.take() {
            return Err(error);
        }
        Ok(inner.run_list.clone())
    }

    async fn get_plan(&self, plan_id: &PlanId) -> Result<PlanDetail, BackendError> {
        let mut inner = self.inner.lock();
        inner.calls.push(BackendCall::GetPlan {
            plan_id: plan_id.clone(),
        });
        Ok(inner.plans.get(plan_id).cloned().unwrap_or_default())
    }

    async fn fetch_events(
        &self,
        run_id: &RunId,
        _plan_id: Option<&PlanId>,
        cursor: u64,
        limit: u64,
    ) -> Result<Vec<RunEvent>, BackendError> {
        let mut inner = self.inner.lock();
        inner.calls.push(BackendCall::FetchEvents {
            run_id: run_id.clone(),
            cursor,
            limit,
        });
        let events = inner.history.get(run_id).cloned().unwrap_or_default();
        let events = events
            .into_iter()
            .skip(cursor as usize)
            .take(limit as usize)
            .collect();
        Ok(events)
    }

    async fn open_event_stream(
        &self,
        run_id: &RunId,
        _plan_id: Option<&PlanId>,
    ) -> Result<mpsc::Receiver<String>, BackendError> {
        let mut inner = self.inner.lock();
        inner.calls.push(BackendCall::OpenStream {
            run_id: run_id.clone(),
        });
        if let Some(error) = inner.stream_error.take() {
            return Err(error);
        }
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        inner.stream_senders.push(tx);
        Ok(rx)
    }

    async fn apply_run(&self, run_id: &RunId) -> Result<(), BackendError> {
        self.inner.lock().calls.push(BackendCall::ApplyRun {
            run_id: run_id.clone(),
        });
        Ok(())
    }

    async fn discard_run(&self, run_id: &RunId) -> Result<(), BackendError> {
        self.inner.lock().calls.push(BackendCall::DiscardRun {
            run_id: run_id.clone(),
        });
        Ok(())
    }

    async fn cancel_run(&self, run_id: &RunId) -> Result<(), BackendError> {
        self.inner.lock().calls.push(BackendCall::CancelRun {
            run_id: run_id.clone(),
        });
        Ok(())
    }

    async fn pause_plan(&self, plan_id: &PlanId, run_id: &RunId) -> Result<(), BackendError> {
        let mut inner = self.inner.lock();
        inner.calls.push(BackendCall::Pause {
            plan_id: plan_id.clone(),
            run_id: run_id.clone(),
        });
        if let Some(error) = inner.pause_error.take() {
            return Err(error);
        }
        Ok(())
    }

    async fn resume_plan(&self, plan_id: &PlanId, run_id: &RunId) -> Result<(), BackendError> {
        let mut inner = self.inner.lock();
        inner.calls.push(BackendCall::Resume {
            plan_id: plan_id.clone(),
            run_id: run_id.clone(),
        });
        if let Some(error) = inner.resume_error.take() {
            return Err(error);
        }
        Ok(())
    }

    async fn cancel_plan_runs(&self, plan_id: &PlanId) -> Result<(), BackendError> {
        let mut inner = self.inner.lock();
        inner.calls.push(BackendCall::CancelPlanRuns {
            plan_id: plan_id.clone(),
        });
        if let Some(error) = inner.cancel_plan_error.take() {
            return Err(error);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
