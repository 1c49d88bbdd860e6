// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger matchers: reconcile declarative trigger definitions into live
//! dispatch tables and route due schedules / matching requests into the
//! worker pool.

pub mod cron;
pub mod http;

#[cfg(test)]
pub(crate) mod test_fixtures;

use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::source::{TriggerBinding, TriggerSource};

const QUERY_ATTEMPTS: u32 = 3;
const QUERY_BACKOFF: Duration = Duration::from_millis(50);

/// Query the trigger source with bounded retry so a transient storage
/// failure skips one tick instead of crashing the loop.
pub(crate) async fn query_with_retry(source: &dyn TriggerSource) -> Option<Vec<TriggerBinding>> {
    for attempt in 1..=QUERY_ATTEMPTS {
        match source.query().await {
            Ok(bindings) => return Some(bindings),
            Err(e) => {
                warn!(attempt, "trigger query failed: {}", e);
                if attempt < QUERY_ATTEMPTS {
                    sleep(QUERY_BACKOFF).await;
                }
            }
        }
    }
    warn!("trigger query exhausted retries, skipping this tick");
    None
}
