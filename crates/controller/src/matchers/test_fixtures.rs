// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fakes for matcher tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use sy_core::{
    ActionId, ActionRecord, HttpRoute, JobId, JobRecord, RunnerId, TriggerId, TriggerRecord,
    TriggerRule,
};

use crate::source::{HandleOutcome, SourceError, TriggerBinding, TriggerSource, WorkerPool};

/// Programmable trigger source: pops one scripted result per query, then
/// answers empty.
#[derive(Default)]
pub(crate) struct FakeSource {
    results: Mutex<Vec<Result<Vec<TriggerBinding>, SourceError>>>,
    queries: AtomicU32,
}

impl FakeSource {
    pub(crate) fn push(&self, result: Result<Vec<TriggerBinding>, SourceError>) {
        self.results.lock().push(result);
    }

    pub(crate) fn query_count(&self) -> u32 {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TriggerSource for FakeSource {
    async fn query(&self) -> Result<Vec<TriggerBinding>, SourceError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let mut results = self.results.lock();
        if results.is_empty() {
            Ok(vec![])
        } else {
            results.remove(0)
        }
    }
}

/// Worker pool recording every dispatch.
pub(crate) struct FakePool {
    outcome: Mutex<HandleOutcome>,
    dispatched: Mutex<Vec<(ActionId, JobId, Value)>>,
}

impl FakePool {
    pub(crate) fn new(outcome: HandleOutcome) -> Self {
        Self { outcome: Mutex::new(outcome), dispatched: Mutex::new(Vec::new()) }
    }

    pub(crate) fn dispatch_count(&self) -> usize {
        self.dispatched.lock().len()
    }

    pub(crate) fn last_payload(&self) -> Option<Value> {
        self.dispatched.lock().last().map(|(_, _, p)| p.clone())
    }
}

#[async_trait]
impl WorkerPool for FakePool {
    async fn send_handle_request(
        &self,
        action: &ActionRecord,
        job: &JobRecord,
        payload: Value,
    ) -> HandleOutcome {
        self.dispatched.lock().push((action.id.clone(), job.id.clone(), payload));
        self.outcome.lock().clone()
    }

    async fn find_runners_by_job(&self, _job_id: &JobId) -> Vec<RunnerId> {
        vec![]
    }

    async fn find_runners_by_action(&self, _action_id: &ActionId) -> Vec<RunnerId> {
        vec![]
    }
}

fn with_rule(trigger_id: &str, rule: TriggerRule) -> TriggerBinding {
    TriggerBinding {
        trigger: TriggerRecord {
            id: TriggerId::from_string(trigger_id),
            job_id: JobId::from_string("job-1"),
            rule,
        },
        action: ActionRecord {
            id: ActionId::from_string("act-1"),
            job_id: JobId::from_string("job-1"),
            version: 4,
            name: "nightly".into(),
        },
        job: JobRecord {
            id: JobId::from_string("job-1"),
            name: "reports".into(),
            version: 4,
            enabled: true,
        },
    }
}

pub(crate) fn cron_binding(trigger_id: &str, schedule: &str) -> TriggerBinding {
    with_rule(trigger_id, TriggerRule::Cron { schedule: schedule.into() })
}

pub(crate) fn http_binding(trigger_id: &str, route: HttpRoute) -> TriggerBinding {
    with_rule(trigger_id, TriggerRule::Http { route })
}

pub(crate) fn route(path: &str) -> HttpRoute {
    HttpRoute { path: path.into(), path_is_pattern: false, method: None, hostname: None }
}

pub(crate) fn pattern_route(path: &str) -> HttpRoute {
    HttpRoute { path: path.into(), path_is_pattern: true, method: None, hostname: None }
}

pub(crate) fn arc_source(source: &Arc<FakeSource>) -> Arc<dyn TriggerSource> {
    Arc::clone(source) as Arc<dyn TriggerSource>
}

pub(crate) fn arc_pool(pool: &Arc<FakePool>) -> Arc<dyn WorkerPool> {
    Arc::clone(pool) as Arc<dyn WorkerPool>
}
