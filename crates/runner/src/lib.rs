// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sy-runner: runner-side process protocol.
//!
//! A runner connects to the controller, claims its pre-registered id with an
//! `init` frame, and then executes `handle` invocations concurrently. On
//! `shutdown` it drains: accepted work completes, new work is dropped, and
//! the socket closes only once nothing is in flight.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use sy_core::{CorrelationId, RunnerId};
use sy_wire::{decode, FrameError, FrameReader, FrameWriter, Message, WriteError};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// User-supplied handler code, invoked once per `handle` frame.
///
/// Invocations run concurrently; the runner never waits for an earlier
/// invocation before starting the next one.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, payload: Value) -> Value;
}

/// Drain behavior after a `shutdown` frame.
#[derive(Debug, Clone)]
pub struct DrainConfig {
    /// How often to re-check the in-flight counter.
    pub poll_interval: Duration,
    /// Give up after this many polls with work still in flight.
    pub max_polls: u32,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self { poll_interval: Duration::from_millis(50), max_polls: 100 }
    }
}

/// Errors from running the runner protocol.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("connect error: {0}")]
    Connect(#[from] std::io::Error),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("drain timed out with {remaining} invocations in flight")]
    DrainTimeout { remaining: usize },
}

/// Runner-side protocol driver.
pub struct Runner<H> {
    id: RunnerId,
    handler: Arc<H>,
    drain: DrainConfig,
}

impl<H: Handler> Runner<H> {
    pub fn new(id: RunnerId, handler: H) -> Self {
        Self { id, handler: Arc::new(handler), drain: DrainConfig::default() }
    }

    pub fn with_drain(mut self, drain: DrainConfig) -> Self {
        self.drain = drain;
        self
    }

    /// Connect to the controller over TCP and run until drained or closed.
    pub async fn run_tcp(self, host: &str, port: u16) -> Result<(), RunnerError> {
        let stream = TcpStream::connect((host, port)).await?;
        let (reader, writer) = stream.into_split();
        self.run(reader, writer).await
    }

    /// Run the protocol over an already-established byte stream.
    pub async fn run<R, W>(self, reader: R, writer: W) -> Result<(), RunnerError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let writer = FrameWriter::spawn(writer);
        writer.send_message(&Message::Init { id: self.id.clone() }).await?;

        let mut reader = FrameReader::new(reader);
        let in_flight = Arc::new(Mutex::new(0usize));

        loop {
            let Some(payload) = reader.next_frame().await? else {
                info!(runner = %self.id, "controller closed the connection");
                return Ok(());
            };
            match decode(&payload) {
                Ok(Message::Handle { correlation_id, payload }) => {
                    self.spawn_invocation(correlation_id, payload, &writer, &in_flight);
                }
                Ok(Message::Shutdown) => break,
                Ok(other) => {
                    warn!(runner = %self.id, ?other, "unexpected message on runner connection");
                }
                Err(e) => {
                    // Protocol errors are contained: log and keep reading.
                    warn!(runner = %self.id, "protocol error: {}", e);
                }
            }
        }

        info!(runner = %self.id, "shutdown received, draining in-flight invocations");
        self.drain(&mut reader, &in_flight).await
    }

    /// Start one concurrent handler invocation.
    ///
    /// The counter is bumped before spawning so a `shutdown` arriving on the
    /// next frame observes the invocation as in flight.
    fn spawn_invocation(
        &self,
        correlation_id: CorrelationId,
        payload: Value,
        writer: &FrameWriter,
        in_flight: &Arc<Mutex<usize>>,
    ) {
        *in_flight.lock() += 1;
        let handler = Arc::clone(&self.handler);
        let writer = writer.clone();
        let in_flight = Arc::clone(in_flight);
        let runner_id = self.id.clone();
        tokio::spawn(async move {
            let result = handler.handle(payload).await;
            let response = Message::HandleResponse { correlation_id, payload: result };
            if let Err(e) = writer.send_message(&response).await {
                warn!(runner = %runner_id, "failed to send handle response: {}", e);
            }
            *in_flight.lock() -= 1;
        });
    }

    /// Poll until the in-flight counter reaches zero, bounded by `max_polls`.
    ///
    /// Keeps reading the socket so late `handle` frames are drained off the
    /// wire and dropped rather than left to back-pressure the controller.
    async fn drain<R>(
        &self,
        reader: &mut FrameReader<R>,
        in_flight: &Arc<Mutex<usize>>,
    ) -> Result<(), RunnerError>
    where
        R: AsyncRead + Unpin,
    {
        let mut polls = 0u32;
        let mut reader_open = true;
        loop {
            if *in_flight.lock() == 0 {
                info!(runner = %self.id, "drain complete");
                return Ok(());
            }
            if polls >= self.drain.max_polls {
                return Err(RunnerError::DrainTimeout { remaining: *in_flight.lock() });
            }
            if reader_open {
                tokio::select! {
                    _ = sleep(self.drain.poll_interval) => polls += 1,
                    frame = reader.next_frame() => match frame {
                        Ok(Some(payload)) => {
                            if let Ok(Message::Handle { correlation_id, .. }) = decode(&payload) {
                                debug!(runner = %self.id, %correlation_id, "dropping handle during drain");
                            }
                        }
                        Ok(None) | Err(_) => reader_open = false,
                    },
                }
            } else {
                sleep(self.drain.poll_interval).await;
                polls += 1;
            }
        }
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
