//! Recovery paths: missing run ids, stale ids, disagreeing status sources.

use crate::prelude::*;
use usher_backend::BackendError;
use usher_core::{ExecutionState, LockStatus};
use usher_engine::{EngineError, EnqueueOrigin};

#[tokio::test]
async fn run_id_is_recovered_from_the_run_list() {
    let w = world();
    w.enqueue("p1");
    // The backend accepted the plan but answered without a run id.
    w.backend.set_confirm_run_id(None);
    w.backend
        .set_run_list(vec![("r7", Some("p1"), Some("running"))]);
    w.backend.set_run_status("r7", "running");

    let started = w.queue.start_next_queued().await.unwrap();
    assert_eq!(started, Some("r7".into()));
    assert_eq!(w.queue.items()[0].run_id, Some("r7".into()));
    assert_eq!(w.lock.snapshot().active_run_id, Some("r7".into()));
}

#[tokio::test]
async fn no_recoverable_run_id_fails_fast_and_frees_the_slot() {
    let w = world();
    w.enqueue("p1");
    w.backend.set_confirm_run_id(None);

    let err = w.queue.start_next_queued().await.unwrap_err();
    assert!(matches!(err, EngineError::RunIdUnresolved { .. }));
    assert_eq!(w.queue.items()[0].status, ExecutionState::Failed);
    assert!(w.lock.snapshot().is_idle());
    assert!(w.lock.can_start_new_plan().is_allowed());
}

#[tokio::test]
async fn stale_run_id_is_replaced_without_losing_the_item() {
    let w = world();
    w.run_plan("p1", "r1").await;

    // The backend restarted the plan under a fresh run.
    w.backend
        .set_run_list(vec![("r2", Some("p1"), Some("running"))]);
    w.backend.set_run_status("r2", "running");
    w.queue.poll_queue().await.unwrap();

    let item = &w.queue.items()[0];
    assert_eq!(item.run_id, Some("r2".into()));
    assert_eq!(item.status, ExecutionState::Running);
    assert_eq!(w.lock.snapshot().active_run_id, Some("r2".into()));
}

#[tokio::test]
async fn one_failed_task_fails_the_plan() {
    let w = world();
    w.run_plan("p1", "r1").await;

    // The record still says running; the snapshot knows better.
    w.backend.set_plan_tasks("p1", &["done", "done", "failed"]);
    w.queue.poll_queue().await.unwrap();

    assert_eq!(w.queue.items()[0].status, ExecutionState::Failed);
    assert!(w.lock.snapshot().is_idle());
}

#[tokio::test]
async fn active_tasks_outvote_a_terminal_record() {
    let w = world();
    w.run_plan("p1", "r1").await;

    w.backend.set_run_status("r1", "failed");
    w.backend.set_plan_tasks("p1", &["done", "doing"]);
    w.queue.poll_queue().await.unwrap();

    assert_eq!(w.queue.items()[0].status, ExecutionState::Retrying);
    assert_eq!(w.lock.snapshot().status, LockStatus::Executing);
}

#[tokio::test]
async fn transport_faults_never_change_local_state() {
    let w = world();
    w.run_plan("p1", "r1").await;

    w.backend
        .set_list_runs_error(BackendError::Transport("flaky".to_string()));
    w.backend
        .set_get_run_error(BackendError::Transport("flaky".to_string()));
    w.queue.poll_queue().await.unwrap();

    assert_eq!(w.queue.items()[0].status, ExecutionState::Running);
    assert_eq!(w.lock.snapshot().status, LockStatus::Executing);
}

#[tokio::test]
async fn artifact_paths_never_become_the_base_workspace() {
    let w = world();
    w.queue
        .enqueue(
            &"p1".into(),
            "text",
            EnqueueOrigin {
                workspace_candidate: Some("/ws/artifacts/stages/s1/repo".to_string()),
                ..EnqueueOrigin::default()
            },
        )
        .unwrap();
    assert_eq!(w.queue.items()[0].base_workspace, None);

    // A real workspace is accepted and remembered for later plans.
    w.queue
        .enqueue(
            &"p2".into(),
            "text",
            EnqueueOrigin {
                workspace_candidate: Some("/home/dev/project".to_string()),
                ..EnqueueOrigin::default()
            },
        )
        .unwrap();
    w.enqueue("p3");
    let items = w.queue.items();
    assert_eq!(items[1].base_workspace.as_deref(), Some("/home/dev/project"));
    assert_eq!(items[2].base_workspace.as_deref(), Some("/home/dev/project"));
}
