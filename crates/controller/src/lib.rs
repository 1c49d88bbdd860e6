// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sy-controller: dispatch coordination for runner processes.
//!
//! The controller keeps a registry of live runner connections, correlates
//! framed request/response pairs, and runs the trigger matchers that turn
//! declarative cron/HTTP trigger definitions into dispatches.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod env;
pub mod matchers;
pub mod registry;
pub mod source;
pub mod sync_loop;

pub use matchers::cron::CronMatcher;
pub use matchers::http::{HttpMatcher, PathMatcher, RequestInfo};
pub use registry::{DispatchError, Registry, RegistryConfig, RegistryEvent};
pub use source::{HandleOutcome, SourceError, TriggerBinding, TriggerSource, WorkerPool};
pub use sync_loop::{LifecycleError, LoopStatus, Reconcile, ReconcileLoop};
