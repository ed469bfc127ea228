// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! usher-core: domain types and pure logic for the usher orchestration client

pub mod clock;
pub mod config;
pub mod event;
pub mod id;
pub mod item;
pub mod lock;
pub mod resolve;
pub mod status;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{Config, ConfigError};
pub use event::{extract_events, EventLevel, EventLog, RunEvent};
pub use id::{ChatId, IdGen, PlanId, QueueItemId, RunId, SequentialIdGen, UuidIdGen};
pub use item::QueueItem;
pub use lock::{LockState, StartDecision};
pub use resolve::{derive_status_from_tasks, normalize_backend_status, resolve_status};
pub use status::{ExecutionState, LockStatus, ReviewState, TaskState, UnifiedStatus};
