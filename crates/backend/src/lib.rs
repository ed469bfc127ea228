// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! usher-backend: remote execution backend port and HTTP/SSE implementation

pub mod api;
pub mod http;
pub mod sse;
pub mod wire;

pub use api::{
    BackendApi, BackendError, ConfirmOutcome, ConfirmRequest, PlanDetail, RunRecord, RunSummary,
};
pub use http::HttpBackend;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{BackendCall, FakeBackend};
