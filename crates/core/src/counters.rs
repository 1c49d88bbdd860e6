// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Labeled dispatch-outcome counters shared between matchers and the
//! (out-of-scope) metrics exporter.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::id::JobId;

/// How a dispatch attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
}

/// Counter label set: job identity, live version, and outcome.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CounterKey {
    pub job_id: JobId,
    pub job_version: u64,
    pub outcome: Outcome,
}

/// Shared counter table. Cloning shares the underlying storage.
#[derive(Clone, Default)]
pub struct Counters {
    inner: Arc<Mutex<HashMap<CounterKey, u64>>>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the counter for `key` by one.
    pub fn record(&self, key: CounterKey) {
        *self.inner.lock().entry(key).or_insert(0) += 1;
    }

    /// Current value for `key` (zero when never recorded).
    pub fn get(&self, key: &CounterKey) -> u64 {
        self.inner.lock().get(key).copied().unwrap_or(0)
    }

    /// Snapshot of all counters, for export.
    pub fn snapshot(&self) -> Vec<(CounterKey, u64)> {
        self.inner.lock().iter().map(|(k, v)| (k.clone(), *v)).collect()
    }
}

#[cfg(test)]
#[path = "counters_tests.rs"]
mod tests;
