// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External collaborator interfaces: the declarative trigger/action/job
//! source and the worker pool. Both live outside this crate; the matchers
//! consume them behind trait objects.

use async_trait::async_trait;
use serde_json::Value;
use sy_core::{ActionId, ActionRecord, JobId, JobRecord, RunnerId, TriggerRecord};
use thiserror::Error;

/// One enabled trigger with its action and owning job, as returned by the
/// definition store.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerBinding {
    pub trigger: TriggerRecord,
    pub action: ActionRecord,
    pub job: JobRecord,
}

/// Errors from querying the definition store.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("trigger query failed: {0}")]
    Query(String),
}

/// Declarative trigger source.
///
/// `query` is pre-filtered: only triggers whose owning job is enabled and
/// whose authored version matches the job's live version are returned.
#[async_trait]
pub trait TriggerSource: Send + Sync + 'static {
    async fn query(&self) -> Result<Vec<TriggerBinding>, SourceError>;
}

/// Result of handing a payload to the worker pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandleOutcome {
    pub success: bool,
    pub error: Option<String>,
    /// Handler-provided HTTP response material (status, headers, body) for
    /// HTTP-triggered dispatches.
    pub http: Option<Value>,
}

impl HandleOutcome {
    pub fn ok() -> Self {
        Self { success: true, ..Self::default() }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()), http: None }
    }
}

/// The isolated worker-process pool (sizing and placement out of scope).
#[async_trait]
pub trait WorkerPool: Send + Sync + 'static {
    /// Route a payload to a runner executing `action` for `job`.
    async fn send_handle_request(
        &self,
        action: &ActionRecord,
        job: &JobRecord,
        payload: Value,
    ) -> HandleOutcome;

    async fn find_runners_by_job(&self, job_id: &JobId) -> Vec<RunnerId>;

    async fn find_runners_by_action(&self, action_id: &ActionId) -> Vec<RunnerId>;
}
