// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! usher-storage: persisted client state behind a key-value port

pub mod file;
pub mod kv;
pub mod state;

pub use file::FileStore;
pub use kv::{KvStore, MemoryStore};
pub use state::{StateStore, StoreError};
