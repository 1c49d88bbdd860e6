// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection registry: live runner connections and request/response
//! correlation.
//!
//! Records are created as `Registered` placeholders before the runner
//! process exists (eliminating the bookkeeping/startup race), transition to
//! `Connected` exactly once when the `init` frame arrives, and are destroyed
//! when the socket closes. Every dispatch mints a fresh correlation id and
//! parks a oneshot resolver; responses resolve in any order.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use sy_core::{CorrelationId, RunnerId};
use sy_wire::{decode, FrameReader, FrameWriter, Message, WriteError};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::env;
use crate::sync_loop::{transition, LifecycleError, LoopStatus};

/// Dispatch failures, always surfaced to the caller.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("runner {0} was never registered")]
    UnknownRunner(RunnerId),

    #[error("runner {0} never connected")]
    NeverConnected(RunnerId),

    #[error("write to runner failed: {0}")]
    Write(#[from] WriteError),

    #[error("dispatch deadline exceeded")]
    DeadlineExceeded,

    #[error("runner disconnected before responding")]
    Disconnected,
}

/// Typed observability events, replacing silent console logging so tests
/// can assert on discarded responses directly.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    RunnerConnected { id: RunnerId },
    RunnerDisconnected { id: RunnerId },
    /// An `init` claimed an unknown or already-connected id; its socket was
    /// destroyed.
    InitRejected { id: RunnerId },
    /// A `handleResponse` arrived with no pending entry (late or orphaned).
    ResponseDiscarded { correlation_id: CorrelationId },
}

/// Timing knobs; defaults come from the environment.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub dispatch_timeout: std::time::Duration,
    pub connect_poll_interval: std::time::Duration,
    pub connect_max_polls: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout: env::dispatch_timeout(),
            connect_poll_interval: env::connect_poll_interval(),
            connect_max_polls: env::connect_max_polls(),
        }
    }
}

/// Client connection record: `Registered` before the process exists,
/// `Connected` once its `init` arrives.
enum ClientState {
    Registered,
    Connected { writer: FrameWriter },
}

struct Pending {
    resolver: oneshot::Sender<Value>,
    runner: RunnerId,
}

/// Server-side table of live runner connections.
pub struct Registry {
    config: RegistryConfig,
    connections: Mutex<HashMap<RunnerId, ClientState>>,
    pending: Mutex<HashMap<CorrelationId, Pending>>,
    status: Mutex<LoopStatus>,
    cancel: Mutex<Option<CancellationToken>>,
    accepting: watch::Sender<bool>,
    events: Mutex<Vec<mpsc::UnboundedSender<RegistryEvent>>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl Registry {
    pub fn new(config: RegistryConfig) -> Self {
        let (accepting, _) = watch::channel(false);
        Self {
            config,
            connections: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            status: Mutex::new(LoopStatus::Neutral),
            cancel: Mutex::new(None),
            accepting,
            events: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe to registry observability events.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<RegistryEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events.lock().push(tx);
        rx
    }

    fn emit(&self, event: RegistryEvent) {
        self.events.lock().retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Insert a `Registered` placeholder before the runner process is
    /// spawned. Idempotent for an id that is not yet connected.
    pub fn register_expected_client(&self, id: RunnerId) {
        let mut connections = self.connections.lock();
        connections.entry(id).or_insert(ClientState::Registered);
    }

    pub fn status(&self) -> LoopStatus {
        *self.status.lock()
    }

    /// Begin accepting runner connections. Fails unless `Neutral`.
    pub async fn start(self: &Arc<Self>, listener: TcpListener) -> Result<(), LifecycleError> {
        transition(&self.status, "start", LoopStatus::Neutral, LoopStatus::Starting)?;

        let cancel = CancellationToken::new();
        *self.cancel.lock() = Some(cancel.clone());
        let accepting = self.accepting.clone();
        let mut confirm = self.accepting.subscribe();
        let registry = Arc::clone(self);

        tokio::spawn(async move {
            let _ = accepting.send(true);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    result = listener.accept() => match result {
                        Ok((stream, addr)) => {
                            debug!(%addr, "runner connection accepted");
                            let registry = Arc::clone(&registry);
                            tokio::spawn(async move {
                                registry.handle_connection(stream).await;
                            });
                        }
                        Err(e) => error!("accept error: {}", e),
                    },
                }
            }
            let _ = accepting.send(false);
        });

        while !*confirm.borrow_and_update() {
            if confirm.changed().await.is_err() {
                break;
            }
        }
        *self.status.lock() = LoopStatus::Started;
        Ok(())
    }

    /// Stop accepting connections. Fails unless `Started`. Existing runner
    /// connections stay open; shutting runners down is the pool's concern.
    pub async fn stop(&self) -> Result<(), LifecycleError> {
        transition(&self.status, "stop", LoopStatus::Started, LoopStatus::Stopping)?;
        if let Some(cancel) = self.cancel.lock().take() {
            cancel.cancel();
        }
        let mut confirm = self.accepting.subscribe();
        while *confirm.borrow_and_update() {
            if confirm.changed().await.is_err() {
                break;
            }
        }
        *self.status.lock() = LoopStatus::Neutral;
        Ok(())
    }

    /// Send a framed `handle` to `runner_id` and await the correlated
    /// response.
    pub async fn dispatch(
        &self,
        runner_id: &RunnerId,
        payload: Value,
    ) -> Result<Value, DispatchError> {
        let writer = self.await_connected(runner_id).await?;

        let correlation_id = CorrelationId::new();
        let (resolver, response) = oneshot::channel();
        self.pending.lock().insert(
            correlation_id.clone(),
            Pending { resolver, runner: runner_id.clone() },
        );

        let message = Message::Handle { correlation_id: correlation_id.clone(), payload };
        if let Err(e) = writer.send_message(&message).await {
            self.pending.lock().remove(&correlation_id);
            return Err(e.into());
        }

        match timeout(self.config.dispatch_timeout, response).await {
            Ok(Ok(value)) => Ok(value),
            // Resolver dropped: the connection closed and purged its pending
            // entries.
            Ok(Err(_)) => Err(DispatchError::Disconnected),
            Err(_) => {
                self.pending.lock().remove(&correlation_id);
                Err(DispatchError::DeadlineExceeded)
            }
        }
    }

    /// Request graceful shutdown of a connected runner.
    pub async fn send_shutdown(&self, runner_id: &RunnerId) -> Result<(), DispatchError> {
        let writer = self.await_connected(runner_id).await?;
        writer.send_message(&Message::Shutdown).await?;
        Ok(())
    }

    /// Bounded backoff poll waiting for a `Registered` record to connect.
    async fn await_connected(&self, id: &RunnerId) -> Result<FrameWriter, DispatchError> {
        for _ in 0..=self.config.connect_max_polls {
            {
                let connections = self.connections.lock();
                match connections.get(id) {
                    None => return Err(DispatchError::UnknownRunner(id.clone())),
                    Some(ClientState::Connected { writer }) => return Ok(writer.clone()),
                    Some(ClientState::Registered) => {}
                }
            }
            sleep(self.config.connect_poll_interval).await;
        }
        Err(DispatchError::NeverConnected(id.clone()))
    }

    /// Drive one runner connection until it closes.
    ///
    /// Registration and response handling both run on this task, so the
    /// connection and pending maps are never mutated concurrently for one
    /// socket.
    pub async fn handle_connection<S>(self: Arc<Self>, stream: S)
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let writer = FrameWriter::spawn(write_half);
        let mut reader = FrameReader::new(read_half);
        let mut claimed: Option<RunnerId> = None;

        loop {
            match reader.next_frame().await {
                Ok(Some(payload)) => match decode(&payload) {
                    Ok(Message::Init { id }) => {
                        if !self.try_claim(&id, &writer) {
                            // Breaking out destroys the offending socket.
                            // The connection already holding this id is not
                            // touched.
                            self.emit(RegistryEvent::InitRejected { id });
                            break;
                        }
                        claimed = Some(id);
                    }
                    Ok(Message::HandleResponse { correlation_id, payload }) => {
                        self.resolve(correlation_id, payload);
                    }
                    Ok(other) => {
                        warn!(?other, "unexpected message on controller connection");
                    }
                    Err(e) => {
                        // Protocol errors stay contained at the connection.
                        warn!("protocol error: {}", e);
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    debug!("connection read error: {}", e);
                    break;
                }
            }
        }

        if let Some(id) = claimed {
            self.connections.lock().remove(&id);
            self.purge_pending(&id);
            info!(runner = %id, "runner disconnected");
            self.emit(RegistryEvent::RunnerDisconnected { id });
        }
    }

    /// Transition `Registered → Connected`, at most once per id.
    fn try_claim(&self, id: &RunnerId, writer: &FrameWriter) -> bool {
        let mut connections = self.connections.lock();
        match connections.get(id) {
            Some(ClientState::Registered) => {
                connections
                    .insert(id.clone(), ClientState::Connected { writer: writer.clone() });
                info!(runner = %id, "runner connected");
                self.emit(RegistryEvent::RunnerConnected { id: id.clone() });
                true
            }
            Some(ClientState::Connected { .. }) => {
                warn!(runner = %id, "init for already-connected id, destroying socket");
                false
            }
            None => {
                warn!(runner = %id, "init for unknown id, destroying socket");
                false
            }
        }
    }

    /// Resolve a pending dispatch; an id with no entry is logged and
    /// discarded, never an error.
    fn resolve(&self, correlation_id: CorrelationId, payload: Value) {
        let entry = self.pending.lock().remove(&correlation_id);
        match entry {
            Some(pending) => {
                // Receiver gone means the dispatch already timed out.
                let _ = pending.resolver.send(payload);
            }
            None => {
                warn!(%correlation_id, "discarding response with no pending request");
                self.emit(RegistryEvent::ResponseDiscarded { correlation_id });
            }
        }
    }

    /// Fail-fast cleanup: drop every pending resolver owned by a
    /// disconnected runner so its dispatches error instead of hanging.
    fn purge_pending(&self, runner: &RunnerId) {
        let mut pending = self.pending.lock();
        let before = pending.len();
        pending.retain(|_, entry| entry.runner != *runner);
        let purged = before - pending.len();
        if purged > 0 {
            warn!(runner = %runner, purged, "purged pending dispatches on disconnect");
        }
    }

    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
