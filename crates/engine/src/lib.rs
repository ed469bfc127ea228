// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! usher-engine: the stateful orchestration components.
//!
//! [`ExecutionLock`] serializes plan execution, [`ExecutionQueue`] owns the
//! durable queue, [`EventStreamClient`] reconciles the push channel into a
//! deduplicated log, and [`PollingScheduler`] drives reconciliation on a
//! visibility-gated cadence. All components publish on the [`ChangeBus`] so
//! a console re-reads state instead of polling the stores.

pub mod bus;
pub mod error;
pub mod lock;
pub mod queue;
pub mod run_order;
pub mod scheduler;
pub mod stream;

pub use bus::{ChangeBus, StateChange};
pub use error::EngineError;
pub use lock::ExecutionLock;
pub use queue::{EnqueueOrigin, ExecutionQueue};
pub use run_order::RunOrder;
pub use scheduler::{PollTarget, PollingScheduler};
pub use stream::{EventStreamClient, StreamState};
