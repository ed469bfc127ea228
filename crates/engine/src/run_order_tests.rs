// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use usher_storage::MemoryStore;

fn ids(raw: &[&str]) -> Vec<RunId> {
    raw.iter().copied().map(RunId::new).collect()
}

fn wired() -> (RunOrder<MemoryStore>, StateStore<MemoryStore>) {
    let store = StateStore::new(MemoryStore::new());
    let order = RunOrder::new(store.clone(), ChangeBus::new()).unwrap();
    (order, store)
}

#[test]
fn promote_moves_to_front_preserving_the_rest() {
    let (order, _) = wired();
    order.promote(&RunId::new("r1")).unwrap();
    order.promote(&RunId::new("r2")).unwrap();
    order.promote(&RunId::new("r3")).unwrap();
    assert_eq!(order.order(), ids(&["r3", "r2", "r1"]));

    order.promote(&RunId::new("r1")).unwrap();
    assert_eq!(order.order(), ids(&["r1", "r3", "r2"]));
}

#[test]
fn promoting_the_front_run_changes_nothing() {
    let (order, _) = wired();
    order.promote(&RunId::new("r1")).unwrap();
    order.promote(&RunId::new("r1")).unwrap();
    assert_eq!(order.order(), ids(&["r1"]));
}

#[test]
fn order_survives_reload() {
    let (order, store) = wired();
    order.promote(&RunId::new("r1")).unwrap();
    order.promote(&RunId::new("r2")).unwrap();

    let reloaded = RunOrder::new(store, ChangeBus::new()).unwrap();
    assert_eq!(reloaded.order(), ids(&["r2", "r1"]));
}

#[test]
fn retain_known_prunes_dead_runs() {
    let (order, store) = wired();
    for id in ["r1", "r2", "r3"] {
        order.promote(&RunId::new(id)).unwrap();
    }
    order.retain_known(&ids(&["r3", "r1"])).unwrap();
    assert_eq!(order.order(), ids(&["r3", "r1"]));
    assert_eq!(store.load_run_order().unwrap(), ids(&["r3", "r1"]));
}

#[tokio::test]
async fn changes_are_published_on_the_bus() {
    let store = StateStore::new(MemoryStore::new());
    let bus = ChangeBus::new();
    let mut rx = bus.subscribe();
    let order = RunOrder::new(store, bus).unwrap();

    order.promote(&RunId::new("r1")).unwrap();
    assert_eq!(rx.recv().await.unwrap(), StateChange::RunOrder);
}
