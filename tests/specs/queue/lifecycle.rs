//! End-to-end queue lifecycle: enqueue, start, complete, review, advance.

use crate::prelude::*;
use usher_core::{ExecutionState, LockStatus, ReviewState};
use usher_engine::EngineError;

#[tokio::test]
async fn plan_flows_from_enqueue_to_reviewed_completion() {
    let w = world();
    let mut changes = w.bus.subscribe();
    w.run_plan("p1", "r1").await;
    assert_eq!(w.lock.snapshot().status, LockStatus::Executing);
    assert!(changes.recv().await.is_ok());

    w.clock.set_epoch_ms(42_000);
    w.backend.set_run_status("r1", "completed");
    w.backend.set_plan_tasks("p1", &["done", "done", "done"]);
    w.queue.poll_queue().await.unwrap();

    let items = w.queue.items();
    assert_eq!(items[0].status, ExecutionState::Completed);
    assert_eq!(items[0].review_status, Some(ReviewState::Pending));
    assert_eq!(items[0].finished_at_epoch_ms, Some(42_000));
    assert_eq!(w.lock.snapshot().status, LockStatus::AwaitingReview);

    // Approving the patchset resolves the review and frees the slot.
    w.lock.remove_pending_review(&"r1".into()).unwrap();
    assert!(w.lock.snapshot().is_idle());
    assert!(w.lock.can_start_new_plan().is_allowed());
}

#[tokio::test]
async fn only_one_plan_occupies_the_system() {
    let w = world();
    w.run_plan("p1", "r1").await;

    let err = w
        .queue
        .enqueue(&"p2".into(), "text", Default::default())
        .unwrap_err();
    assert!(matches!(err, EngineError::Blocked { .. }));

    // The reason names the plan in the way.
    let decision = w.lock.can_start_new_plan();
    assert!(decision.reason().unwrap().contains("p1"));
}

#[tokio::test]
async fn queued_plans_run_one_after_another() {
    let w = world();
    w.enqueue("p1");
    w.enqueue("p2");
    w.backend.set_confirm_run_id(Some("r1"));
    w.backend.set_run_status("r1", "running");
    w.backend
        .set_run_list(vec![("r1", Some("p1"), Some("running"))]);
    w.queue.start_next_queued().await.unwrap();

    // p1 finishes clean (no review gate); the next cycle starts p2.
    w.backend.set_run_status("r1", "completed");
    w.backend.set_confirm_run_id(Some("r2"));
    w.backend.set_run_status("r2", "running");
    w.queue.poll_queue().await.unwrap();

    let items = w.queue.items();
    assert_eq!(items[0].status, ExecutionState::Completed);
    assert_eq!(items[1].status, ExecutionState::Running);
    assert_eq!(w.lock.snapshot().active_plan_id, Some("p2".into()));
}

#[tokio::test]
async fn cancel_all_stops_everything_and_stays_paused() {
    let w = world();
    w.enqueue("p1");
    w.enqueue("p2");
    w.backend.set_confirm_run_id(Some("r1"));
    w.backend.set_run_status("r1", "running");
    w.queue.start_next_queued().await.unwrap();

    w.queue.cancel_all().await.unwrap();

    assert!(w.queue.is_paused());
    assert!(w.store.load_queue_paused().unwrap());
    assert!(w.lock.snapshot().is_idle());
    for item in w.queue.items() {
        assert_eq!(item.status, ExecutionState::Canceled);
    }

    // Paused means the slot stays empty even with the backend healthy.
    w.queue.poll_queue().await.unwrap();
    assert!(w.lock.snapshot().is_idle());
}
