//! The scheduler drives queue reconciliation, gated on visibility.

use crate::prelude::*;
use std::time::Duration;
use usher_backend::BackendCall;
use usher_core::ExecutionState;
use usher_engine::PollingScheduler;

#[tokio::test]
async fn scheduler_settles_a_finished_run_without_manual_polling() {
    let w = world();
    w.run_plan("p1", "r1").await;
    w.backend.set_run_status("r1", "completed");
    w.backend.set_plan_tasks("p1", &["done", "done"]);

    let scheduler = PollingScheduler::new(w.queue.clone(), Duration::from_millis(5));
    scheduler.start();
    eventually("run settled", || {
        w.queue.items()[0].status == ExecutionState::Completed
    })
    .await;
    scheduler.stop();
}

#[tokio::test]
async fn hidden_console_stops_network_traffic() {
    let w = world();
    w.run_plan("p1", "r1").await;

    let scheduler = PollingScheduler::new(w.queue.clone(), Duration::from_millis(5));
    scheduler.set_visible(false);
    scheduler.start();

    w.backend.clear_calls();
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(w
        .backend
        .calls()
        .iter()
        .all(|c| !matches!(c, BackendCall::ListRuns | BackendCall::GetRun { .. })));

    // Returning to visibility reconciles immediately.
    w.backend.set_run_status("r1", "completed");
    scheduler.set_visible(true);
    eventually("catch-up poll", || {
        w.queue.items()[0].status == ExecutionState::Completed
    })
    .await;
    scheduler.stop();
}
