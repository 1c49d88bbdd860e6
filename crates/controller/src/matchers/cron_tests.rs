// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use sy_core::{FakeClock, JobId};

use super::super::test_fixtures::{arc_pool, arc_source, cron_binding, FakePool, FakeSource};
use super::*;
use crate::source::{HandleOutcome, SourceError};

struct World {
    source: Arc<FakeSource>,
    pool: Arc<FakePool>,
    clock: FakeClock,
    counters: Counters,
    matcher: CronMatcher<FakeClock>,
}

fn world(outcome: HandleOutcome) -> World {
    let source = Arc::new(FakeSource::default());
    let pool = Arc::new(FakePool::new(outcome));
    let clock = FakeClock::new();
    let counters = Counters::new();
    let matcher =
        CronMatcher::new(arc_source(&source), arc_pool(&pool), clock.clone(), counters.clone());
    World { source, pool, clock, counters, matcher }
}

fn key(outcome: Outcome) -> CounterKey {
    CounterKey { job_id: JobId::from_string("job-1"), job_version: 4, outcome }
}

#[tokio::test]
async fn adds_new_triggers_and_removes_stale_ones() {
    let w = world(HandleOutcome::ok());
    w.source.push(Ok(vec![cron_binding("trg-1", "* * * * *")]));
    w.matcher.tick().await;
    assert_eq!(w.matcher.live_entries(), 1);

    // Source record disappeared: entry is deleted on the next tick.
    w.source.push(Ok(vec![]));
    w.matcher.tick().await;
    assert_eq!(w.matcher.live_entries(), 0);
}

#[tokio::test]
async fn past_due_trigger_fires_once_per_tick_and_advances() {
    let w = world(HandleOutcome::ok());
    w.source.push(Ok(vec![cron_binding("trg-1", "* * * * *")]));
    w.matcher.tick().await;
    assert_eq!(w.pool.dispatch_count(), 0, "not due at insertion");

    // Move past the next minute boundary.
    w.clock.advance(Duration::from_secs(61));
    w.source.push(Ok(vec![cron_binding("trg-1", "* * * * *")]));
    w.matcher.tick().await;
    assert_eq!(w.pool.dispatch_count(), 1, "due entry fires exactly once");

    // Same tick time again: next-fire already advanced past now.
    w.source.push(Ok(vec![cron_binding("trg-1", "* * * * *")]));
    w.matcher.tick().await;
    assert_eq!(w.pool.dispatch_count(), 1);

    w.clock.advance(Duration::from_secs(61));
    w.source.push(Ok(vec![cron_binding("trg-1", "* * * * *")]));
    w.matcher.tick().await;
    assert_eq!(w.pool.dispatch_count(), 2);
    assert_eq!(w.counters.get(&key(Outcome::Success)), 2);
}

#[tokio::test]
async fn fire_payload_names_the_trigger() {
    let w = world(HandleOutcome::ok());
    w.source.push(Ok(vec![cron_binding("trg-1", "* * * * *")]));
    w.matcher.tick().await;
    w.clock.advance(Duration::from_secs(61));
    w.source.push(Ok(vec![cron_binding("trg-1", "* * * * *")]));
    w.matcher.tick().await;

    let payload = w.pool.last_payload().unwrap();
    assert_eq!(payload["triggerId"], "trg-1");
    assert!(payload["firedAt"].is_string());
}

#[tokio::test]
async fn dispatch_failure_is_counted_and_loop_survives() {
    let w = world(HandleOutcome::failed("pool said no"));
    w.source.push(Ok(vec![cron_binding("trg-1", "* * * * *")]));
    w.matcher.tick().await;

    w.clock.advance(Duration::from_secs(61));
    w.source.push(Ok(vec![cron_binding("trg-1", "* * * * *")]));
    w.matcher.tick().await;

    assert_eq!(w.counters.get(&key(Outcome::Failure)), 1);
    assert_eq!(w.counters.get(&key(Outcome::Success)), 0);

    // The matcher keeps ticking after a failure.
    w.clock.advance(Duration::from_secs(61));
    w.source.push(Ok(vec![cron_binding("trg-1", "* * * * *")]));
    w.matcher.tick().await;
    assert_eq!(w.counters.get(&key(Outcome::Failure)), 2);
}

#[tokio::test]
async fn invalid_schedule_is_skipped() {
    let w = world(HandleOutcome::ok());
    w.source.push(Ok(vec![cron_binding("trg-bad", "not a schedule")]));
    w.matcher.tick().await;
    assert_eq!(w.matcher.live_entries(), 0);
}

#[tokio::test]
async fn transient_query_failure_is_retried_within_a_tick() {
    let w = world(HandleOutcome::ok());
    w.source.push(Err(SourceError::Query("storage hiccup".into())));
    w.source.push(Err(SourceError::Query("storage hiccup".into())));
    w.source.push(Ok(vec![cron_binding("trg-1", "* * * * *")]));

    w.matcher.tick().await;
    assert_eq!(w.source.query_count(), 3);
    assert_eq!(w.matcher.live_entries(), 1);
}

#[tokio::test]
async fn exhausted_retries_skip_the_tick_without_clearing_entries() {
    let w = world(HandleOutcome::ok());
    w.source.push(Ok(vec![cron_binding("trg-1", "* * * * *")]));
    w.matcher.tick().await;
    assert_eq!(w.matcher.live_entries(), 1);

    for _ in 0..3 {
        w.source.push(Err(SourceError::Query("down".into())));
    }
    w.matcher.tick().await;
    // The live table is not a casualty of a failed poll.
    assert_eq!(w.matcher.live_entries(), 1);
}

#[test]
fn five_field_expressions_are_normalized() {
    assert!(parse_schedule("* * * * *").is_ok());
    assert!(parse_schedule("0 0 * * * *").is_ok());
    assert!(parse_schedule("nonsense").is_err());
}
