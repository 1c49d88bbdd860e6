// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered frame writes over one connection.
//!
//! Concurrent senders enqueue frames on a channel drained by a single writer
//! task, so frames reach the peer strictly in submission order and a flush in
//! progress never interleaves with frames enqueued mid-flush.

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::frame::{encode_frame, FrameError};
use crate::message::{encode, Message, ProtocolError};

const WRITE_QUEUE_DEPTH: usize = 64;

/// Errors from submitting a frame for writing.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("connection closed")]
    Closed,

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Handle for submitting frames to one connection's writer task.
///
/// Cloning shares the queue; submission order across clones is the order the
/// `send` futures complete their enqueue.
#[derive(Clone)]
pub struct FrameWriter {
    tx: mpsc::Sender<Vec<u8>>,
}

impl FrameWriter {
    /// Spawn the writer task for `writer` and return the submission handle.
    ///
    /// The task exits when every handle is dropped or the peer goes away;
    /// trailing write failures are logged, not surfaced, since the read side
    /// observes the close.
    pub fn spawn<W>(mut writer: W) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(WRITE_QUEUE_DEPTH);
        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Err(e) = writer.write_all(&frame).await {
                    debug!("frame write failed: {}", e);
                    break;
                }
                if let Err(e) = writer.flush().await {
                    debug!("frame flush failed: {}", e);
                    break;
                }
            }
        });
        Self { tx }
    }

    /// Queue one payload for transmission as a single frame.
    pub async fn send(&self, payload: Vec<u8>) -> Result<(), WriteError> {
        let frame = encode_frame(&payload)?;
        self.tx.send(frame).await.map_err(|_| WriteError::Closed)
    }

    /// Encode and queue one protocol message.
    pub async fn send_message(&self, message: &Message) -> Result<(), WriteError> {
        let payload = encode(message)?;
        self.send(payload).await
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
