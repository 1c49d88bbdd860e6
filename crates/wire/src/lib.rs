// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sy-wire: controller/runner wire protocol.
//!
//! Wire format: 4-byte magic marker + 6-byte little-endian length prefix +
//! JSON payload, repeated indefinitely over the connection lifetime.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod frame;
mod message;
mod writer;

pub use frame::{encode_frame, FrameDecoder, FrameError, FrameReader, HEADER_LEN, MAGIC};
pub use message::{decode, encode, Message, ProtocolError};
pub use writer::{FrameWriter, WriteError};
