// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP trigger matcher.
//!
//! The live table preserves insertion order and is scanned synchronously by
//! the request path: first entry whose hostname (if configured), method (if
//! configured), and path all match wins. No match returns `None` so the
//! outer HTTP layer can fall through; a dispatch failure is a distinct,
//! explicit outcome.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::Value;
use sy_core::{CounterKey, Counters, Outcome, TriggerId, TriggerRule};
use tracing::{debug, warn};

use super::query_with_retry;
use crate::source::{HandleOutcome, TriggerBinding, TriggerSource, WorkerPool};
use crate::sync_loop::Reconcile;

/// Compiled path matcher: literal equality, or an anchored regular
/// expression when the configured path is marked as a pattern.
pub enum PathMatcher {
    Literal(String),
    Pattern(Regex),
}

impl PathMatcher {
    fn compile(path: &str, is_pattern: bool) -> Result<Self, regex::Error> {
        if is_pattern {
            // Anchored so a pattern matches the whole path, not a substring.
            Ok(Self::Pattern(Regex::new(&format!("^(?:{path})$"))?))
        } else {
            Ok(Self::Literal(path.to_string()))
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Literal(expected) => expected == path,
            Self::Pattern(regex) => regex.is_match(path),
        }
    }
}

/// One inbound request, as seen by the matcher.
#[derive(Debug, Clone)]
pub struct RequestInfo<'a> {
    pub method: &'a str,
    pub hostname: Option<&'a str>,
    pub path: &'a str,
}

struct HttpEntry {
    binding: TriggerBinding,
    matcher: PathMatcher,
    method: Option<String>,
    hostname: Option<String>,
}

impl HttpEntry {
    fn matches(&self, request: &RequestInfo<'_>) -> bool {
        if let Some(hostname) = &self.hostname {
            if request.hostname != Some(hostname.as_str()) {
                return false;
            }
        }
        if let Some(method) = &self.method {
            if !method.eq_ignore_ascii_case(request.method) {
                return false;
            }
        }
        self.matcher.matches(request.path)
    }
}

/// Keeps a live HTTP dispatch table in sync with the trigger source.
pub struct HttpMatcher {
    source: Arc<dyn TriggerSource>,
    pool: Arc<dyn WorkerPool>,
    counters: Counters,
    entries: Mutex<IndexMap<TriggerId, HttpEntry>>,
}

impl HttpMatcher {
    pub fn new(
        source: Arc<dyn TriggerSource>,
        pool: Arc<dyn WorkerPool>,
        counters: Counters,
    ) -> Self {
        Self { source, pool, counters, entries: Mutex::new(IndexMap::new()) }
    }

    pub fn live_entries(&self) -> usize {
        self.entries.lock().len()
    }

    /// Scan live entries in insertion order; first match wins. `None` means
    /// no trigger matched and the caller should fall through.
    ///
    /// Safe to call mid-tick: entries are inserted and removed atomically,
    /// never mutated in place.
    pub fn match_request(&self, request: &RequestInfo<'_>) -> Option<TriggerBinding> {
        let entries = self.entries.lock();
        entries
            .values()
            .find(|entry| entry.matches(request))
            .map(|entry| entry.binding.clone())
    }

    /// Hand a matched request to the worker pool and record the outcome.
    ///
    /// Returns the pool's explicit result so the HTTP layer can distinguish
    /// a failed dispatch from a fallthrough.
    pub async fn dispatch(&self, matched: &TriggerBinding, payload: Value) -> HandleOutcome {
        let outcome = self
            .pool
            .send_handle_request(&matched.action, &matched.job, payload)
            .await;
        let result = if outcome.success {
            Outcome::Success
        } else {
            warn!(
                trigger = %matched.trigger.id,
                job = %matched.job.id,
                "http dispatch failed: {}",
                outcome.error.as_deref().unwrap_or("unknown error"),
            );
            Outcome::Failure
        };
        self.counters.record(CounterKey {
            job_id: matched.job.id.clone(),
            job_version: matched.job.version,
            outcome: result,
        });
        outcome
    }

    /// Synchronize the live table: insert new triggers, drop stale ones.
    async fn reconcile(&self) {
        let Some(bindings) = query_with_retry(self.source.as_ref()).await else {
            return;
        };
        let mut entries = self.entries.lock();

        let mut live: HashSet<TriggerId> = HashSet::new();
        for binding in bindings {
            let TriggerRule::Http { route } = &binding.trigger.rule else {
                continue;
            };
            live.insert(binding.trigger.id.clone());
            if entries.contains_key(&binding.trigger.id) {
                continue;
            }
            match PathMatcher::compile(&route.path, route.path_is_pattern) {
                Ok(matcher) => {
                    debug!(trigger = %binding.trigger.id, path = %route.path, "http trigger added");
                    let entry = HttpEntry {
                        matcher,
                        method: route.method.clone(),
                        hostname: route.hostname.clone(),
                        binding,
                    };
                    entries.insert(entry.binding.trigger.id.clone(), entry);
                }
                Err(e) => {
                    warn!(trigger = %binding.trigger.id, "invalid path pattern: {}", e);
                }
            }
        }

        entries.retain(|id, _| live.contains(id));
    }
}

#[async_trait]
impl Reconcile for HttpMatcher {
    async fn tick(&self) {
        self.reconcile().await;
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
