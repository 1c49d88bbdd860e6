// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron trigger matcher.
//!
//! Each tick rebuilds the live dispatch table from the trigger source, then
//! fires every due entry. The next-fire time is recomputed *before* the
//! dispatch so a slow worker pool cannot cause duplicate fires.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cron::Schedule;
use parking_lot::Mutex;
use serde_json::json;
use sy_core::{Clock, CounterKey, Counters, Outcome, TriggerId, TriggerRule};
use tracing::{debug, warn};

use super::query_with_retry;
use crate::source::{TriggerBinding, TriggerSource, WorkerPool};
use crate::sync_loop::Reconcile;

/// Parse a cron expression, accepting the standard five-field form.
///
/// The `cron` crate wants a leading seconds field; five-field expressions
/// are normalized to fire at second zero.
fn parse_schedule(expr: &str) -> Result<Schedule, cron::error::Error> {
    let expr = expr.trim();
    if expr.split_whitespace().count() == 5 {
        Schedule::from_str(&format!("0 {expr}"))
    } else {
        Schedule::from_str(expr)
    }
}

/// Live dispatch entry: deep-copied snapshots plus precomputed schedule
/// state.
struct CronEntry {
    binding: TriggerBinding,
    schedule: Schedule,
    /// `None` once the schedule is exhausted.
    next_fire: Option<DateTime<Utc>>,
}

/// Keeps a live cron dispatch table in sync with the trigger source.
pub struct CronMatcher<C: Clock> {
    source: Arc<dyn TriggerSource>,
    pool: Arc<dyn WorkerPool>,
    clock: C,
    counters: Counters,
    entries: Mutex<HashMap<TriggerId, CronEntry>>,
}

impl<C: Clock> CronMatcher<C> {
    pub fn new(
        source: Arc<dyn TriggerSource>,
        pool: Arc<dyn WorkerPool>,
        clock: C,
        counters: Counters,
    ) -> Self {
        Self { source, pool, clock, counters, entries: Mutex::new(HashMap::new()) }
    }

    /// Number of live entries, for status reporting.
    pub fn live_entries(&self) -> usize {
        self.entries.lock().len()
    }

    /// Synchronize the live table: insert new triggers, drop stale ones.
    async fn reconcile(&self) {
        let Some(bindings) = query_with_retry(self.source.as_ref()).await else {
            return;
        };
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let mut live: HashSet<TriggerId> = HashSet::new();
        for binding in bindings {
            let TriggerRule::Cron { schedule } = &binding.trigger.rule else {
                continue;
            };
            live.insert(binding.trigger.id.clone());
            if entries.contains_key(&binding.trigger.id) {
                continue;
            }
            match parse_schedule(schedule) {
                Ok(parsed) => {
                    let next_fire = parsed.after(&now).next();
                    debug!(trigger = %binding.trigger.id, ?next_fire, "cron trigger added");
                    entries.insert(
                        binding.trigger.id.clone(),
                        CronEntry { binding, schedule: parsed, next_fire },
                    );
                }
                Err(e) => {
                    warn!(trigger = %binding.trigger.id, "invalid cron schedule: {}", e);
                }
            }
        }

        entries.retain(|id, _| live.contains(id));
    }

    /// Fire every due entry once, advancing its next-fire time first.
    async fn fire_due(&self) {
        let now = self.clock.now();
        let due: Vec<TriggerBinding> = {
            let mut entries = self.entries.lock();
            entries
                .values_mut()
                .filter(|entry| entry.next_fire.is_some_and(|at| at <= now))
                .map(|entry| {
                    entry.next_fire = entry.schedule.after(&now).next();
                    entry.binding.clone()
                })
                .collect()
        };

        for binding in due {
            let payload = json!({
                "triggerId": binding.trigger.id,
                "firedAt": now.to_rfc3339(),
            });
            let outcome = self
                .pool
                .send_handle_request(&binding.action, &binding.job, payload)
                .await;
            let result = if outcome.success {
                Outcome::Success
            } else {
                warn!(
                    trigger = %binding.trigger.id,
                    job = %binding.job.id,
                    "cron dispatch failed: {}",
                    outcome.error.as_deref().unwrap_or("unknown error"),
                );
                Outcome::Failure
            };
            self.counters.record(CounterKey {
                job_id: binding.job.id.clone(),
                job_version: binding.job.version,
                outcome: result,
            });
        }
    }
}

#[async_trait]
impl<C: Clock> Reconcile for CronMatcher<C> {
    async fn tick(&self) {
        self.reconcile().await;
        self.fire_due().await;
    }
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
