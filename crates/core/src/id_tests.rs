// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::borrow::Borrow;
use std::collections::HashMap;

#[test]
fn plan_id_new_and_as_str() {
    let id = PlanId::new("plan-7");
    assert_eq!(id.as_str(), "plan-7");
}

#[test]
fn run_id_display() {
    let id = RunId::new("run-42");
    assert_eq!(format!("{}", id), "run-42");
    assert_eq!(id.to_string(), "run-42");
}

#[test]
fn id_from_string_and_str() {
    let owned: PlanId = String::from("owned").into();
    let borrowed: PlanId = "borrowed".into();
    assert_eq!(owned.as_str(), "owned");
    assert_eq!(borrowed.as_str(), "borrowed");
}

#[test]
fn id_partial_eq_str() {
    let id = RunId::new("r1");
    assert_eq!(id, *"r1");
    assert_eq!(id, "r1");
}

#[test]
fn id_borrow_enables_map_lookup_by_str() {
    let mut map = HashMap::new();
    map.insert(RunId::new("k"), 42);
    assert_eq!(map.get("k"), Some(&42));
    let id = RunId::new("key");
    let borrowed: &str = id.borrow();
    assert_eq!(borrowed, "key");
}

#[test]
fn id_serde_is_a_bare_string() {
    let id = QueueItemId::new("item-1");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"item-1\"");
    let back: QueueItemId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn id_short_truncates() {
    let id = RunId::new("abcdefghijklmnop");
    assert_eq!(id.short(8), "abcdefgh");
    assert_eq!(RunId::new("abc").short(8), "abc");
}

#[test]
fn uuid_gen_creates_unique_ids() {
    let id_gen = UuidIdGen;
    let id1 = id_gen.next();
    let id2 = id_gen.next();
    assert_ne!(id1, id2);
    assert_eq!(id1.len(), 36); // UUID format
}

#[test]
fn sequential_gen_creates_predictable_ids() {
    let id_gen = SequentialIdGen::new("item");
    assert_eq!(id_gen.next(), "item-1");
    assert_eq!(id_gen.next(), "item-2");
    assert_eq!(id_gen.next(), "item-3");
}

#[test]
fn sequential_gen_is_cloneable_and_shared() {
    let id_gen1 = SequentialIdGen::new("shared");
    let id_gen2 = id_gen1.clone();
    assert_eq!(id_gen1.next(), "shared-1");
    assert_eq!(id_gen2.next(), "shared-2");
    assert_eq!(id_gen1.next(), "shared-3");
}
