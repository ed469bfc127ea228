// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP implementation of the backend port.
//!
//! JSON over HTTP under a configurable base URL, plus one SSE channel per
//! run. Error taxonomy: 404 is `NotFound`; an `{ok: false, error}` body is
//! `Application` regardless of HTTP status; other non-2xx responses and
//! connection failures are `Transport`.

use crate::api::{
    BackendApi, BackendError, ConfirmOutcome, ConfirmRequest, PlanDetail, RunRecord, RunSummary,
};
use crate::sse::spawn_sse_relay;
use crate::wire::{
    parse_event_list, parse_run, parse_run_list, ApplicationBody, ConfirmWire, PlanWire,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::debug;
use usher_core::{PlanId, RunEvent, RunId};

const STREAM_CHANNEL_CAPACITY: usize = 256;
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Decode a response, mapping the error taxonomy.
    async fn decode(&self, response: reqwest::Response) -> Result<Value, BackendError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound);
        }
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let value: Option<Value> = serde_json::from_str(&text).ok();
        if let Some(message) = value.as_ref().and_then(ApplicationBody::failure_message) {
            return Err(BackendError::Application { message });
        }
        if !status.is_success() {
            return Err(BackendError::Transport(format!(
                "status {status}: {}",
                sanitize_body(&text)
            )));
        }
        value.ok_or_else(|| BackendError::Decode(format!("invalid JSON: {}", sanitize_body(&text))))
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Value, BackendError> {
        let response = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        self.decode(response).await
    }

    async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, BackendError> {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        self.decode(response).await
    }
}

/// Error bodies can be huge HTML pages; keep messages displayable.
fn sanitize_body(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{cut}…")
    }
}

fn plan_query(plan_id: Option<&PlanId>) -> Vec<(&'static str, String)> {
    plan_id
        .map(|p| vec![("planId", p.as_str().to_string())])
        .unwrap_or_default()
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn confirm_plan(&self, request: &ConfirmRequest) -> Result<ConfirmOutcome, BackendError> {
        let mut body = json!({
            "planId": request.plan_id.as_str(),
            "mode": request.mode,
        });
        if let Some(workspace) = &request.workspace {
            body["workspace"] = json!(workspace);
        }
        if let Some(policy) = &request.policy {
            body["policy"] = json!(policy);
        }
        let value = self.post_json("/api/assistant/confirm", body).await?;
        let wire: ConfirmWire =
            serde_json::from_value(value).map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(wire.into_outcome())
    }

    async fn get_run(
        &self,
        run_id: &RunId,
        plan_id: Option<&PlanId>,
    ) -> Result<RunRecord, BackendError> {
        let value = self
            .get_json(&format!("/api/runs/{run_id}"), &plan_query(plan_id))
            .await?;
        let wire = parse_run(&value).map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(wire.into_record())
    }

    async fn list_runs(&self, workspace: Option<&str>) -> Result<Vec<RunSummary>, BackendError> {
        let query = workspace
            .map(|w| vec![("workspace", w.to_string())])
            .unwrap_or_default();
        let value = self.get_json("/api/runs", &query).await?;
        parse_run_list(&value).map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn get_plan(&self, plan_id: &PlanId) -> Result<PlanDetail, BackendError> {
        let value = self.get_json(&format!("/api/plans/{plan_id}"), &[]).await?;
        let wire: PlanWire =
            serde_json::from_value(value).map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(wire.into_detail())
    }

    async fn fetch_events(
        &self,
        run_id: &RunId,
        plan_id: Option<&PlanId>,
        cursor: u64,
        limit: u64,
    ) -> Result<Vec<RunEvent>, BackendError> {
        let mut query = plan_query(plan_id);
        query.push(("cursor", cursor.to_string()));
        query.push(("limit", limit.to_string()));
        let value = self
            .get_json(&format!("/api/runs/{run_id}/events"), &query)
            .await?;
        Ok(parse_event_list(&value)
            .iter()
            .filter_map(RunEvent::from_wire)
            .collect())
    }

    async fn open_event_stream(
        &self,
        run_id: &RunId,
        plan_id: Option<&PlanId>,
    ) -> Result<mpsc::Receiver<String>, BackendError> {
        let response = self
            .client
            .get(self.url(&format!("/api/runs/{run_id}/events/stream")))
            .query(&plan_query(plan_id))
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound);
        }
        if !status.is_success() {
            return Err(BackendError::Transport(format!(
                "stream failed with status {status}"
            )));
        }
        debug!(run_id = %run_id, "event stream opened");
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        spawn_sse_relay(response, tx);
        Ok(rx)
    }

    async fn apply_run(&self, run_id: &RunId) -> Result<(), BackendError> {
        self.post_json(&format!("/api/runs/{run_id}/apply"), json!({}))
            .await
            .map(|_| ())
    }

    async fn discard_run(&self, run_id: &RunId) -> Result<(), BackendError> {
        self.post_json(&format!("/api/runs/{run_id}/discard"), json!({}))
            .await
            .map(|_| ())
    }

    async fn cancel_run(&self, run_id: &RunId) -> Result<(), BackendError> {
        self.post_json(&format!("/api/runs/{run_id}/cancel"), json!({}))
            .await
            .map(|_| ())
    }

    async fn pause_plan(&self, plan_id: &PlanId, run_id: &RunId) -> Result<(), BackendError> {
        self.post_json(
            "/api/pause",
            json!({"planId": plan_id.as_str(), "runId": run_id.as_str()}),
        )
        .await
        .map(|_| ())
    }

    async fn resume_plan(&self, plan_id: &PlanId, run_id: &RunId) -> Result<(), BackendError> {
        self.post_json(
            "/api/resume",
            json!({"planId": plan_id.as_str(), "runId": run_id.as_str()}),
        )
        .await
        .map(|_| ())
    }

    async fn cancel_plan_runs(&self, plan_id: &PlanId) -> Result<(), BackendError> {
        self.post_json("/api/cancel-plan-runs", json!({"planId": plan_id.as_str()}))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
