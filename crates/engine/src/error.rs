// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine components

use thiserror::Error;
use usher_backend::BackendError;
use usher_storage::StoreError;

/// Errors that can occur in the engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A guard rejected the operation synchronously; nothing reached the
    /// network.
    #[error("blocked: {reason}")]
    Blocked { reason: String },
    /// Confirm returned no run id and the run-list fallback found none.
    #[error("no run id for plan {plan_id}")]
    RunIdUnresolved { plan_id: String },
}
