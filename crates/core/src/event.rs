// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run event normalization, dedup keying, and the merged event log.
//!
//! Wire events are loose JSON objects with many synonymous field names.
//! They cross into one canonical [`RunEvent`] exactly once, at ingestion;
//! everything downstream reads only the canonical shape. The log keeps
//! events in first-seen order and is idempotent under at-least-once
//! delivery (duplicate push messages, overlapping history and live
//! windows).

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Field aliases probed, in order, for each canonical field.
const ID_FIELDS: &[&str] = &["id", "event_id", "eventId", "uuid", "seq"];
const TIMESTAMP_FIELDS: &[&str] = &["timestamp", "ts", "time", "created_at", "createdAt"];
const KIND_FIELDS: &[&str] = &["type", "kind", "event", "event_type", "eventType"];
const STEP_FIELDS: &[&str] = &["step_id", "stepId", "task_id", "taskId", "step", "node_id"];
const MESSAGE_FIELDS: &[&str] = &["message", "msg", "text", "detail", "description", "output"];
const LEVEL_FIELDS: &[&str] = &["level", "severity"];

/// Human classification of an event for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

/// Canonical event record. Never mutated after ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEvent {
    /// Stable dedup key: the wire event id, or a hash of the other fields.
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    pub message: String,
    pub level: EventLevel,
}

impl RunEvent {
    /// Normalize one wire event object into the canonical record.
    ///
    /// Returns `None` for anything that is not a JSON object.
    pub fn from_wire(value: &Value) -> Option<RunEvent> {
        let obj = value.as_object()?;

        let event_id = first_string(obj, ID_FIELDS);
        let timestamp = first_string(obj, TIMESTAMP_FIELDS);
        let kind = first_string(obj, KIND_FIELDS).unwrap_or_else(|| "event".to_string());
        let step_id = first_string(obj, STEP_FIELDS);
        let message = first_string(obj, MESSAGE_FIELDS).unwrap_or_default();
        let level = classify_level(first_string(obj, LEVEL_FIELDS).as_deref(), &kind);

        let key = match &event_id {
            Some(id) => id.clone(),
            None => fallback_key(timestamp.as_deref(), &kind, step_id.as_deref(), &message),
        };

        Some(RunEvent {
            key,
            event_id,
            timestamp,
            kind,
            step_id,
            message,
            level,
        })
    }
}

/// First present field whose value renders as a string. Numbers are
/// accepted too: sequence ids and epoch timestamps arrive as numbers.
fn first_string(obj: &serde_json::Map<String, Value>, fields: &[&str]) -> Option<String> {
    for field in fields {
        match obj.get(*field) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// Classify from the explicit level field when present, else from the kind.
fn classify_level(level: Option<&str>, kind: &str) -> EventLevel {
    let probe = level.unwrap_or(kind).to_ascii_lowercase();
    if probe.contains("error") || probe.contains("fail") || probe.contains("fatal") {
        EventLevel::Error
    } else if probe.contains("warn") {
        EventLevel::Warn
    } else {
        EventLevel::Info
    }
}

/// Dedup hash for events without an id: SHA-256 over the remaining fields,
/// `|`-joined, with `~` marking an absent field so absent and empty-string
/// values do not collide.
fn fallback_key(timestamp: Option<&str>, kind: &str, step_id: Option<&str>, message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(timestamp.unwrap_or("~").as_bytes());
    hasher.update(b"|");
    hasher.update(kind.as_bytes());
    hasher.update(b"|");
    hasher.update(step_id.unwrap_or("~").as_bytes());
    hasher.update(b"|");
    hasher.update(message.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Extract the event array from a push payload.
///
/// Payloads arrive in four shapes: a bare array, `{events: [...]}`,
/// `{data: {events: [...]}}`, or a single event object.
pub fn extract_events(payload: &Value) -> Vec<Value> {
    if let Some(array) = payload.as_array() {
        return array.clone();
    }
    if let Some(array) = payload.get("events").and_then(Value::as_array) {
        return array.clone();
    }
    if let Some(array) = payload
        .get("data")
        .and_then(|d| d.get("events"))
        .and_then(Value::as_array)
    {
        return array.clone();
    }
    if payload.is_object() {
        return vec![payload.clone()];
    }
    Vec::new()
}

/// Deduplicated event log for one run, in first-seen order.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Vec<RunEvent>,
    seen: IndexSet<String>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge canonical events; duplicates (by key) are dropped.
    /// Returns how many events were appended.
    pub fn merge(&mut self, events: impl IntoIterator<Item = RunEvent>) -> usize {
        let mut appended = 0;
        for event in events {
            if self.seen.insert(event.key.clone()) {
                self.events.push(event);
                appended += 1;
            }
        }
        appended
    }

    /// Merge wire event objects, normalizing each. Non-objects are skipped.
    pub fn merge_wire<'a>(&mut self, values: impl IntoIterator<Item = &'a Value>) -> usize {
        let events: Vec<RunEvent> = values.into_iter().filter_map(RunEvent::from_wire).collect();
        self.merge(events)
    }

    /// Merge one raw push payload. Malformed JSON is dropped silently
    /// (returns 0); a broken message must never take the stream down.
    pub fn merge_payload(&mut self, payload: &str) -> usize {
        let Ok(value) = serde_json::from_str::<Value>(payload) else {
            return 0;
        };
        let wire = extract_events(&value);
        self.merge_wire(wire.iter())
    }

    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop everything, including the seen-key set. Used on run change.
    pub fn clear(&mut self) {
        self.events.clear();
        self.seen.clear();
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
