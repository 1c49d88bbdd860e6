// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshots of declarative job, action, and trigger definitions.
//!
//! These are deep copies taken from the external definition store at
//! reconciliation time. Matchers hold their own snapshot so a concurrent
//! definition edit can never mutate a live dispatch entry in place.

use serde::{Deserialize, Serialize};

use crate::id::{ActionId, JobId, TriggerId};

/// A job definition at a specific live version.
///
/// The trigger source only returns triggers whose owning job is enabled and
/// whose authored version matches this live version; the fields are carried
/// here for counter labels and dispatch context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub name: String,
    pub version: u64,
    pub enabled: bool,
}

/// A versioned handler bundle belonging to a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: ActionId,
    pub job_id: JobId,
    pub version: u64,
    pub name: String,
}

/// An HTTP route a trigger listens on.
///
/// `path` is a literal unless `path_is_pattern` is set, in which case it is
/// compiled into a regular expression by the HTTP matcher. `method` and
/// `hostname` are optional narrowing filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRoute {
    pub path: String,
    #[serde(default)]
    pub path_is_pattern: bool,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
}

/// What causes a trigger to fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerRule {
    /// Standard five-field cron expression, evaluated in UTC.
    Cron { schedule: String },
    /// Inbound HTTP request matching.
    Http { route: HttpRoute },
}

/// A trigger definition owned by a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRecord {
    pub id: TriggerId,
    pub job_id: JobId,
    pub rule: TriggerRule,
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
