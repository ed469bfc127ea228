//! Lock lifecycle around reviews, pause, and cancel.

use crate::prelude::*;
use usher_backend::{BackendCall, BackendError};
use usher_core::{LockStatus, RunId};

#[tokio::test]
async fn last_review_removal_resets_the_whole_lock() {
    let w = world();
    w.run_plan("p1", "r1").await;
    w.lock.add_pending_review(&"r1".into()).unwrap();
    w.lock.add_pending_review(&"r2".into()).unwrap();

    w.lock.remove_pending_review(&"r1".into()).unwrap();
    let state = w.lock.snapshot();
    assert_eq!(state.status, LockStatus::AwaitingReview);
    assert!(state.invariant_holds());

    w.lock.remove_pending_review(&"r2".into()).unwrap();
    let state = w.lock.snapshot();
    assert!(state.is_idle());
    assert_eq!(state.active_plan_id, None);
    assert!(state.pending_review_runs.is_empty());
    assert!(state.invariant_holds());
}

#[tokio::test]
async fn pause_and_resume_follow_the_backend() {
    let w = world();
    w.run_plan("p1", "r1").await;

    w.lock.pause_execution().await.unwrap();
    assert_eq!(w.lock.snapshot().status, LockStatus::Paused);

    // Resume is refused remotely: local state must not flip.
    w.backend
        .set_resume_error(BackendError::Application {
            message: "not pausable".to_string(),
        });
    assert!(w.lock.resume_execution().await.is_err());
    assert_eq!(w.lock.snapshot().status, LockStatus::Paused);

    w.lock.resume_execution().await.unwrap();
    assert_eq!(w.lock.snapshot().status, LockStatus::Executing);
}

#[tokio::test]
async fn cancel_reaches_every_run_of_the_plan() {
    let w = world();
    w.run_plan("p1", "r1").await;

    w.lock.cancel_execution().await.unwrap();
    assert!(w.lock.snapshot().is_idle());
    assert!(w
        .backend
        .calls()
        .contains(&BackendCall::CancelPlanRuns {
            plan_id: "p1".into()
        }));
}

#[tokio::test]
async fn lock_survives_a_restart_mid_review() {
    let w = world();
    w.run_plan("p1", "r1").await;
    w.lock.add_pending_review(&"r1".into()).unwrap();

    let restarted = world_with(w.backend.clone(), w.kv.clone());
    let state = restarted.lock.snapshot();
    assert_eq!(state.status, LockStatus::AwaitingReview);
    assert!(state.pending_review_runs.contains(&RunId::new("r1")));
}
