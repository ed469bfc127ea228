// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::AtomicUsize;

#[derive(Clone, Default)]
struct CountingTarget {
    polls: Arc<AtomicUsize>,
}

impl CountingTarget {
    fn count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PollTarget for CountingTarget {
    async fn poll(&self) {
        self.polls.fetch_add(1, Ordering::SeqCst);
    }
}

async fn wait_for(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

#[tokio::test]
async fn polls_on_a_cadence() {
    let target = CountingTarget::default();
    let scheduler = PollingScheduler::new(target.clone(), Duration::from_millis(5));
    scheduler.start();
    wait_for("repeated polls", || target.count() >= 3).await;
    scheduler.stop();
}

#[tokio::test]
async fn hidden_console_polls_nothing() {
    let target = CountingTarget::default();
    let scheduler = PollingScheduler::new(target.clone(), Duration::from_millis(5));
    scheduler.set_visible(false);
    scheduler.start();
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(target.count(), 0);
    scheduler.stop();
}

#[tokio::test]
async fn returning_to_visibility_polls_immediately() {
    let target = CountingTarget::default();
    // A period long enough that only the wake can explain a poll.
    let scheduler = PollingScheduler::new(target.clone(), Duration::from_secs(3600));
    scheduler.set_visible(false);
    scheduler.start();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(target.count(), 0);

    scheduler.set_visible(true);
    wait_for("poll after visibility restore", || target.count() >= 1).await;
    scheduler.stop();
}

#[tokio::test]
async fn trigger_forces_an_extra_pass() {
    let target = CountingTarget::default();
    let scheduler = PollingScheduler::new(target.clone(), Duration::from_secs(3600));
    scheduler.start();
    wait_for("initial poll", || target.count() == 1).await;

    scheduler.trigger();
    wait_for("triggered poll", || target.count() == 2).await;
    scheduler.stop();
}

#[tokio::test]
async fn stop_ends_the_cadence() {
    let target = CountingTarget::default();
    let scheduler = PollingScheduler::new(target.clone(), Duration::from_millis(5));
    scheduler.start();
    wait_for("first poll", || target.count() >= 1).await;

    scheduler.stop();
    wait_for("worker exit", || !scheduler.is_active()).await;
    let count = target.count();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(target.count(), count);
}

#[tokio::test]
async fn double_start_spawns_one_worker() {
    let target = CountingTarget::default();
    let scheduler = PollingScheduler::new(target.clone(), Duration::from_secs(3600));
    scheduler.start();
    scheduler.start();
    wait_for("initial poll", || target.count() >= 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(target.count(), 1);
    scheduler.stop();
}
