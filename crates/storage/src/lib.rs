// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! lazyaf-storage: the Persistence Gateway — typed access to
//! runs/steps/executions/workspaces/runners/debug-sessions with the
//! `claim_execution`/`update_if_status_in` primitives the rest of the
//! engine builds idempotency and crash recovery on top of.
//!
//! A single in-process table guarded by one lock, structured as a plain
//! `Arc<Mutex<MaterializedState>>` so every read and write goes through
//! one serialization point.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod gateway;
pub mod tables;

pub use gateway::{update_if_status_in, PersistenceGateway};
pub use tables::Tables;
