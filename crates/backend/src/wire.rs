// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire DTOs and the normalization boundary.
//!
//! The backend's JSON is alias-laden (`run_id`/`runId`, `status`/`state`)
//! and envelope-happy (`{run: {...}}` vs flattened fields, bare arrays vs
//! `{runs: [...]}`). Everything is mapped into the canonical `api` types
//! here, once, so no alias survives past this module.

use crate::api::{ConfirmOutcome, PlanDetail, RunRecord, RunSummary};
use serde::Deserialize;
use serde_json::Value;
use usher_core::{PlanId, RunId, TaskState};

/// Body of a confirm response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfirmWire {
    #[serde(default, alias = "runId")]
    pub run_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ConfirmWire {
    pub fn into_outcome(self) -> ConfirmOutcome {
        ConfirmOutcome {
            run_id: self.run_id.map(RunId::new),
            status: self.status,
        }
    }
}

/// One run, whatever the envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunWire {
    #[serde(default, alias = "runId", alias = "id")]
    pub run_id: Option<String>,
    #[serde(default, alias = "planId")]
    pub plan_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default, alias = "workspaceMainRoot")]
    pub workspace_main_root: Option<String>,
    #[serde(default, alias = "patchsetPath")]
    pub patchset_path: Option<String>,
}

impl RunWire {
    /// `status` wins over its `state` alias when both are present.
    pub fn effective_status(&self) -> Option<&str> {
        self.status.as_deref().or(self.state.as_deref())
    }

    pub fn into_record(self) -> RunRecord {
        let status = self.effective_status().map(str::to_string);
        RunRecord {
            run_id: self.run_id.map(RunId::new),
            status,
            workspace_main_root: self.workspace_main_root,
            patchset_path: self.patchset_path,
        }
    }

    pub fn into_summary(self) -> Option<RunSummary> {
        let status = self.effective_status().map(str::to_string);
        Some(RunSummary {
            run_id: RunId::new(self.run_id?),
            plan_id: self.plan_id.map(PlanId::new),
            status,
        })
    }
}

/// Unwrap the run envelope: `{run: {...}}` or flattened fields.
pub fn parse_run(value: &Value) -> Result<RunWire, serde_json::Error> {
    match value.get("run") {
        Some(run) if run.is_object() => serde_json::from_value(run.clone()),
        _ => serde_json::from_value(value.clone()),
    }
}

/// Unwrap the run list: a bare array or `{runs: [...]}`. Entries without a
/// run id are dropped.
pub fn parse_run_list(value: &Value) -> Result<Vec<RunSummary>, serde_json::Error> {
    let array = value
        .as_array()
        .or_else(|| value.get("runs").and_then(Value::as_array))
        .cloned()
        .unwrap_or_default();
    let mut summaries = Vec::with_capacity(array.len());
    for entry in array {
        let wire: RunWire = serde_json::from_value(entry)?;
        if let Some(summary) = wire.into_summary() {
            summaries.push(summary);
        }
    }
    Ok(summaries)
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TaskWire {
    #[serde(default, alias = "state")]
    status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TaskListWire {
    #[serde(default)]
    tasks: Vec<TaskWire>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PlanBodyWire {
    #[serde(default)]
    raw_plan: Option<TaskListWire>,
}

/// Body of a plan detail response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanWire {
    #[serde(default)]
    snapshot: Option<TaskListWire>,
    #[serde(default)]
    plan: Option<PlanBodyWire>,
    #[serde(default)]
    task_chain_text: Option<String>,
}

impl PlanWire {
    /// The live snapshot wins; the raw plan definition is the fallback for
    /// a run the scheduler has not materialized yet. Unknown task statuses
    /// contribute no signal.
    pub fn into_detail(self) -> PlanDetail {
        let tasks = self
            .snapshot
            .or_else(|| self.plan.and_then(|p| p.raw_plan))
            .map(|list| {
                list.tasks
                    .iter()
                    .filter_map(|t| t.status.as_deref().and_then(TaskState::parse))
                    .collect()
            })
            .unwrap_or_default();
        PlanDetail {
            tasks,
            task_chain_text: self.task_chain_text,
        }
    }
}

/// Body of a history pull: `{events: [...]}` or a bare array.
pub fn parse_event_list(value: &Value) -> Vec<Value> {
    value
        .as_array()
        .or_else(|| value.get("events").and_then(Value::as_array))
        .cloned()
        .unwrap_or_default()
}

/// Application-level failure detection: `{ok: false, error}` bodies arrive
/// with any HTTP status.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationBody {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApplicationBody {
    pub fn failure_message(value: &Value) -> Option<String> {
        let body: ApplicationBody = serde_json::from_value(value.clone()).ok()?;
        if body.ok == Some(false) {
            Some(body.error.unwrap_or_else(|| "backend error".to_string()))
        } else {
            None
        }
    }
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
