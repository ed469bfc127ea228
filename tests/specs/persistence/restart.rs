//! Everything the engine persists must survive a process restart.
//!
//! Each spec reopens the file store from disk for the second world, so the
//! round trip really goes through the state file.

use crate::prelude::*;
use std::path::Path;
use usher_core::{ExecutionState, LockStatus};
use usher_storage::FileStore;

fn open(path: &Path) -> FileStore {
    FileStore::open(path.join("state.json")).unwrap()
}

#[tokio::test]
async fn queue_and_lock_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();

    let w = world_on(open(dir.path()));
    w.enqueue("p1");
    w.enqueue("p2");
    w.backend.set_confirm_run_id(Some("r1"));
    w.backend.set_run_status("r1", "running");
    w.queue.start_next_queued().await.unwrap();
    drop(w);

    let restarted = world_on(open(dir.path()));
    let items = restarted.queue.items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].status, ExecutionState::Running);
    assert_eq!(items[0].run_id, Some("r1".into()));
    assert_eq!(items[1].plan_id, "p2");
    assert_eq!(items[1].status, ExecutionState::Queued);

    let state = restarted.lock.snapshot();
    assert_eq!(state.status, LockStatus::Executing);
    assert_eq!(state.active_plan_id, Some("p1".into()));
    assert!(state.invariant_holds());
}

#[tokio::test]
async fn paused_flag_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();

    let w = world_on(open(dir.path()));
    w.run_plan("p1", "r1").await;
    w.queue.cancel_all().await.unwrap();
    drop(w);

    let restarted = world_on(open(dir.path()));
    assert!(restarted.queue.is_paused());
    assert_eq!(
        restarted.queue.items()[0].status,
        ExecutionState::Canceled
    );
}

#[tokio::test]
async fn learned_workspace_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();

    let w = world_on(open(dir.path()));
    w.queue
        .enqueue(
            &"p1".into(),
            "text",
            usher_engine::EnqueueOrigin {
                workspace_candidate: Some("/home/dev/project".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    drop(w);

    let restarted = world_on(open(dir.path()));
    restarted.enqueue("p2");
    let items = restarted.queue.items();
    assert_eq!(items[1].base_workspace.as_deref(), Some("/home/dev/project"));
}
