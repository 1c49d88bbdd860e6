// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sy-core: shared types for the switchyard controller and runners.

pub mod clock;
pub mod counters;
pub mod id;
pub mod record;

pub use clock::{Clock, FakeClock, SystemClock};
pub use counters::{CounterKey, Counters, Outcome};
pub use id::{ActionId, CorrelationId, JobId, RunnerId, TriggerId};
pub use record::{ActionRecord, HttpRoute, JobRecord, TriggerRecord, TriggerRule};
