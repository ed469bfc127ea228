// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::id::{PlanId, QueueItemId};
use crate::item::QueueItem;
use crate::status::TaskState;
use serde_json::{json, Value};

/// Wire-shaped event object with an explicit id.
pub fn wire_event(id: &str, kind: &str, message: &str) -> Value {
    json!({
        "id": id,
        "type": kind,
        "message": message,
        "ts": "2026-01-01T00:00:00Z",
    })
}

/// Wire-shaped event object without an id (exercises the fallback key).
pub fn anonymous_wire_event(kind: &str, message: &str) -> Value {
    json!({
        "type": kind,
        "message": message,
    })
}

/// Parse a list of backend task-status strings, dropping unknowns, the way
/// plan snapshots are ingested.
pub fn tasks(statuses: &[&str]) -> Vec<TaskState> {
    statuses.iter().filter_map(|s| TaskState::parse(s)).collect()
}

/// A queued item with deterministic id and timestamp.
pub fn queued_item(n: u32, plan_id: &str) -> QueueItem {
    QueueItem::new(
        QueueItemId::new(format!("q-{n}")),
        PlanId::new(plan_id),
        format!("plan text {n}"),
        1_000 + u64::from(n),
    )
}
