// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol messages exchanged between the controller and a runner.
//!
//! Each message is carried as one frame with a JSON text payload, tagged by
//! a `type` field.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sy_core::{CorrelationId, RunnerId};
use thiserror::Error;

/// Runner process protocol messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Message {
    /// Runner → controller, sent once on connect to claim a pre-registered id.
    Init { id: RunnerId },

    /// Controller → runner, invoke the handler.
    #[serde(rename_all = "camelCase")]
    Handle { correlation_id: CorrelationId, payload: Value },

    /// Runner → controller, the handler's result.
    #[serde(rename_all = "camelCase")]
    HandleResponse { correlation_id: CorrelationId, payload: Value },

    /// Controller → runner, request graceful stop.
    Shutdown,
}

/// Errors from message encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Serialize a message to its frame payload bytes.
pub fn encode(message: &Message) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(message)?)
}

/// Deserialize one frame payload into a message.
pub fn decode(payload: &[u8]) -> Result<Message, ProtocolError> {
    Ok(serde_json::from_slice(payload)?)
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
