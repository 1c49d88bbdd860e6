// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic reconciliation-loop lifecycle primitive.
//!
//! Every background synchronizer (trigger matchers, expiry sweeps, telemetry
//! gauges) is driven by the same four-state machine:
//! `Neutral → Starting → Started → Stopping → Neutral`. Out-of-order calls
//! are contract violations and fail the call.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::debug;

/// Lifecycle state shared by reconcile loops and the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStatus {
    Neutral,
    Starting,
    Started,
    Stopping,
}

impl fmt::Display for LoopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopStatus::Neutral => "neutral",
            LoopStatus::Starting => "starting",
            LoopStatus::Started => "started",
            LoopStatus::Stopping => "stopping",
        };
        write!(f, "{name}")
    }
}

/// Lifecycle contract violations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("{op}() requires {expected} status, but the loop is {actual}")]
    InvalidTransition { op: &'static str, expected: LoopStatus, actual: LoopStatus },
}

/// One background synchronizer: a tick plus optional lifecycle hooks.
#[async_trait]
pub trait Reconcile: Send + Sync + 'static {
    /// One reconciliation pass. Never overlaps with itself on one loop.
    async fn tick(&self);

    /// Runs after the status moves to `Starting`, before the loop begins.
    async fn on_starting(&self) {}
    /// Runs once the loop is confirmed running and status is `Started`.
    async fn on_started(&self) {}
    /// Runs after the status moves to `Stopping`, before draining.
    async fn on_stopping(&self) {}
    /// Runs once the loop has fully drained and status is back to `Neutral`.
    async fn on_stopped(&self) {}
}

/// Polling loop driving one [`Reconcile`] implementation.
pub struct ReconcileLoop<R> {
    reconciler: Arc<R>,
    interval: Duration,
    status: Arc<Mutex<LoopStatus>>,
    running: watch::Sender<bool>,
}

impl<R: Reconcile> ReconcileLoop<R> {
    pub fn new(reconciler: Arc<R>, interval: Duration) -> Self {
        let (running, _) = watch::channel(false);
        Self { reconciler, interval, status: Arc::new(Mutex::new(LoopStatus::Neutral)), running }
    }

    pub fn status(&self) -> LoopStatus {
        *self.status.lock()
    }

    /// Begin ticking. Fails unless the loop is `Neutral`.
    pub async fn start(&self) -> Result<(), LifecycleError> {
        transition(&self.status, "start", LoopStatus::Neutral, LoopStatus::Starting)?;
        self.reconciler.on_starting().await;

        let reconciler = Arc::clone(&self.reconciler);
        let status = Arc::clone(&self.status);
        let interval = self.interval;
        let running = self.running.clone();
        let mut confirm = self.running.subscribe();

        tokio::spawn(async move {
            let _ = running.send(true);
            loop {
                let current = *status.lock();
                if !matches!(current, LoopStatus::Starting | LoopStatus::Started) {
                    break;
                }
                reconciler.tick().await;
                sleep(interval).await;
            }
            debug!("reconcile loop drained");
            let _ = running.send(false);
        });

        // Wait until the loop reports itself running.
        while !*confirm.borrow_and_update() {
            if confirm.changed().await.is_err() {
                break;
            }
        }
        *self.status.lock() = LoopStatus::Started;
        self.reconciler.on_started().await;
        Ok(())
    }

    /// Drain and stop. Fails unless the loop is `Started`.
    ///
    /// Completes only after any in-progress iteration finishes; iterations
    /// are never interrupted.
    pub async fn stop(&self) -> Result<(), LifecycleError> {
        transition(&self.status, "stop", LoopStatus::Started, LoopStatus::Stopping)?;
        self.reconciler.on_stopping().await;

        let mut confirm = self.running.subscribe();
        while *confirm.borrow_and_update() {
            if confirm.changed().await.is_err() {
                break;
            }
        }
        *self.status.lock() = LoopStatus::Neutral;
        self.reconciler.on_stopped().await;
        Ok(())
    }
}

/// Guarded state transition shared by the loop and the registry lifecycle.
pub(crate) fn transition(
    status: &Mutex<LoopStatus>,
    op: &'static str,
    expected: LoopStatus,
    next: LoopStatus,
) -> Result<(), LifecycleError> {
    let mut current = status.lock();
    if *current != expected {
        return Err(LifecycleError::InvalidTransition { op, expected, actual: *current });
    }
    *current = next;
    Ok(())
}

#[cfg(test)]
#[path = "sync_loop_tests.rs"]
mod tests;
