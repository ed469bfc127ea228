//! Behavioral specifications for the usher client engine.
//!
//! These tests wire the full component stack (lock, queue, stream,
//! scheduler) against the scriptable fake backend and an in-memory or
//! file-backed store, and verify observable behavior only.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// queue/
#[path = "specs/queue/lifecycle.rs"]
mod queue_lifecycle;
#[path = "specs/queue/recovery.rs"]
mod queue_recovery;

// lock/
#[path = "specs/lock/reviews.rs"]
mod lock_reviews;

// stream/
#[path = "specs/stream/reconnect.rs"]
mod stream_reconnect;

// persistence/
#[path = "specs/persistence/restart.rs"]
mod persistence_restart;

// scheduler/
#[path = "specs/scheduler/visibility.rs"]
mod scheduler_visibility;
