//! Shared harness for the behavioral specs.

use std::time::Duration;
use usher_backend::FakeBackend;
use usher_core::{Config, FakeClock, SequentialIdGen};
use usher_engine::{ChangeBus, EnqueueOrigin, ExecutionLock, ExecutionQueue};
use usher_storage::{KvStore, MemoryStore, StateStore};

pub type Lock<S> = ExecutionLock<FakeBackend, S, FakeClock>;
pub type Queue<S> = ExecutionQueue<FakeBackend, S, FakeClock, SequentialIdGen>;

/// The wired component stack every spec starts from.
pub struct World<S: KvStore> {
    pub backend: FakeBackend,
    pub kv: S,
    pub store: StateStore<S>,
    pub bus: ChangeBus,
    pub clock: FakeClock,
    pub lock: Lock<S>,
    pub queue: Queue<S>,
}

pub fn world() -> World<MemoryStore> {
    world_on(MemoryStore::new())
}

/// Wire the stack over an existing store, as a process restart would.
pub fn world_on<S: KvStore>(kv: S) -> World<S> {
    let backend = FakeBackend::new();
    world_with(backend, kv)
}

pub fn world_with<S: KvStore>(backend: FakeBackend, kv: S) -> World<S> {
    let store = StateStore::new(kv.clone());
    let bus = ChangeBus::new();
    let clock = FakeClock::new();
    let lock = ExecutionLock::new(backend.clone(), store.clone(), bus.clone(), clock.clone())
        .unwrap();
    let queue = ExecutionQueue::new(
        backend.clone(),
        store.clone(),
        lock.clone(),
        bus.clone(),
        clock.clone(),
        SequentialIdGen::new("item"),
        Config::default(),
    )
    .unwrap();
    World {
        backend,
        kv,
        store,
        bus,
        clock,
        lock,
        queue,
    }
}

impl<S: KvStore> World<S> {
    /// Enqueue a plan with no origin metadata.
    pub fn enqueue(&self, plan: &str) {
        self.queue
            .enqueue(&plan.into(), "plan text", EnqueueOrigin::default())
            .unwrap();
    }

    /// Enqueue and run a plan up to `running` with the given run id.
    pub async fn run_plan(&self, plan: &str, run: &str) {
        self.enqueue(plan);
        self.backend.set_confirm_run_id(Some(run));
        self.backend.set_run_status(run, "running");
        self.backend
            .set_run_list(vec![(run, Some(plan), Some("running"))]);
        self.queue.start_next_queued().await.unwrap();
    }
}

/// Poll a condition until it holds or the deadline passes.
pub async fn eventually(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}
