// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;
use sy_core::{HttpRoute, JobId};
use yare::parameterized;

use super::super::test_fixtures::{
    arc_pool, arc_source, http_binding, pattern_route, route, FakePool, FakeSource,
};
use super::*;
use crate::source::{HandleOutcome, SourceError};

struct World {
    source: Arc<FakeSource>,
    pool: Arc<FakePool>,
    counters: Counters,
    matcher: HttpMatcher,
}

fn world(outcome: HandleOutcome) -> World {
    let source = Arc::new(FakeSource::default());
    let pool = Arc::new(FakePool::new(outcome));
    let counters = Counters::new();
    let matcher = HttpMatcher::new(arc_source(&source), arc_pool(&pool), counters.clone());
    World { source, pool, counters, matcher }
}

fn get(path: &str) -> RequestInfo<'_> {
    RequestInfo { method: "GET", hostname: None, path }
}

#[tokio::test]
async fn literal_path_matches_exactly() {
    let w = world(HandleOutcome::ok());
    w.source.push(Ok(vec![http_binding("trg-a", route("/a"))]));
    w.matcher.tick().await;

    assert!(w.matcher.match_request(&get("/a")).is_some());
    assert!(w.matcher.match_request(&get("/a/b")).is_none());
    assert!(w.matcher.match_request(&get("/A")).is_none());
}

#[tokio::test]
async fn pattern_path_matches_whole_path() {
    let w = world(HandleOutcome::ok());
    w.source.push(Ok(vec![http_binding("trg-p", pattern_route("/a.*"))]));
    w.matcher.tick().await;

    assert!(w.matcher.match_request(&get("/a")).is_some());
    assert!(w.matcher.match_request(&get("/abc")).is_some());
    assert!(w.matcher.match_request(&get("/x/a")).is_none(), "pattern is anchored");
}

#[tokio::test]
async fn first_match_wins_in_insertion_order() {
    let w = world(HandleOutcome::ok());
    w.source.push(Ok(vec![
        http_binding("trg-literal", route("/a")),
        http_binding("trg-pattern", pattern_route("/a.*")),
    ]));
    w.matcher.tick().await;

    let matched = w.matcher.match_request(&get("/a")).unwrap();
    assert_eq!(matched.trigger.id, "trg-literal");

    // The pattern still catches what the literal does not.
    let matched = w.matcher.match_request(&get("/abc")).unwrap();
    assert_eq!(matched.trigger.id, "trg-pattern");
}

#[parameterized(
    wrong_method = { "DELETE", Some("api.example.com"), "/hook", false },
    method_case_insensitive = { "post", Some("api.example.com"), "/hook", true },
    wrong_host = { "POST", Some("other.example.com"), "/hook", false },
    missing_host = { "POST", None, "/hook", false },
    wrong_path = { "POST", Some("api.example.com"), "/nope", false },
)]
fn method_host_and_path_must_all_match(
    method: &str,
    hostname: Option<&str>,
    path: &str,
    expected: bool,
) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(async {
        let w = world(HandleOutcome::ok());
        w.source.push(Ok(vec![http_binding(
            "trg-h",
            HttpRoute {
                path: "/hook".into(),
                path_is_pattern: false,
                method: Some("POST".into()),
                hostname: Some("api.example.com".into()),
            },
        )]));
        w.matcher.tick().await;

        let request = RequestInfo { method, hostname, path };
        assert_eq!(w.matcher.match_request(&request).is_some(), expected);
    });
}

#[tokio::test]
async fn no_match_returns_none_for_fallthrough() {
    let w = world(HandleOutcome::ok());
    w.source.push(Ok(vec![http_binding("trg-a", route("/a"))]));
    w.matcher.tick().await;
    assert!(w.matcher.match_request(&get("/elsewhere")).is_none());
}

#[tokio::test]
async fn stale_entries_are_removed() {
    let w = world(HandleOutcome::ok());
    w.source.push(Ok(vec![http_binding("trg-a", route("/a"))]));
    w.matcher.tick().await;
    assert_eq!(w.matcher.live_entries(), 1);

    w.source.push(Ok(vec![]));
    w.matcher.tick().await;
    assert_eq!(w.matcher.live_entries(), 0);
    assert!(w.matcher.match_request(&get("/a")).is_none());
}

#[tokio::test]
async fn invalid_pattern_is_skipped() {
    let w = world(HandleOutcome::ok());
    w.source.push(Ok(vec![http_binding("trg-bad", pattern_route("/a[("))]));
    w.matcher.tick().await;
    assert_eq!(w.matcher.live_entries(), 0);
}

#[tokio::test]
async fn dispatch_returns_explicit_outcome_and_counts() {
    let w = world(HandleOutcome::failed("runner rejected"));
    w.source.push(Ok(vec![http_binding("trg-a", route("/a"))]));
    w.matcher.tick().await;

    let matched = w.matcher.match_request(&get("/a")).unwrap();
    let outcome = w.matcher.dispatch(&matched, json!({"body": "x"})).await;

    // A failed dispatch is distinguishable from "no trigger matched".
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("runner rejected"));
    let key = CounterKey {
        job_id: JobId::from_string("job-1"),
        job_version: 4,
        outcome: Outcome::Failure,
    };
    assert_eq!(w.counters.get(&key), 1);
    assert_eq!(w.pool.dispatch_count(), 1);
}

#[tokio::test]
async fn query_failure_keeps_existing_table() {
    let w = world(HandleOutcome::ok());
    w.source.push(Ok(vec![http_binding("trg-a", route("/a"))]));
    w.matcher.tick().await;

    for _ in 0..3 {
        w.source.push(Err(SourceError::Query("down".into())));
    }
    w.matcher.tick().await;
    assert!(w.matcher.match_request(&get("/a")).is_some());
}
