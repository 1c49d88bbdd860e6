// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Binary framing: `MAGIC(4) || LENGTH(6, little-endian) || PAYLOAD`.
//!
//! The codec is payload-type-agnostic. There is no checksum and no version
//! field; the transport is a trusted private link. The decoder scans for the
//! magic marker, so desynchronized leading garbage is skipped rather than
//! poisoning the connection.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Frame start marker.
pub const MAGIC: [u8; 4] = *b"SYF\x01";

/// Bytes in the length field.
const LENGTH_LEN: usize = 6;

/// Full header size: magic + length.
pub const HEADER_LEN: usize = MAGIC.len() + LENGTH_LEN;

/// Largest length representable in the 6-byte field.
const MAX_PAYLOAD_LEN: u64 = (1 << 48) - 1;

/// Errors from frame encoding or framed reads.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("payload of {0} bytes exceeds the 6-byte length field")]
    Oversize(usize),

    #[error("read error: {0}")]
    Io(#[from] std::io::Error),
}

/// Encode one payload as a frame: header followed by the payload bytes.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    let len = payload.len() as u64;
    if len > MAX_PAYLOAD_LEN {
        return Err(FrameError::Oversize(payload.len()));
    }
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&MAGIC);
    frame.extend_from_slice(&len.to_le_bytes()[..LENGTH_LEN]);
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Streaming decoder over an accumulating receive buffer.
///
/// Feed raw reads with [`extend`](Self::extend) and drain complete payloads
/// with [`next_frame`](Self::next_frame). Frames split across any number of
/// reads, and multiple frames within one read, both decode identically to a
/// single unsplit read. Truncated trailing bytes at disconnect are simply
/// never emitted.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append newly received bytes to the receive buffer.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next complete payload, if one is fully buffered.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        // Resynchronize on the next magic occurrence, discarding garbage.
        match find_magic(&self.buf) {
            Some(0) => {}
            Some(pos) => {
                self.buf.drain(..pos);
            }
            None => {
                // Keep a partial-magic tail; everything before it is garbage.
                let keep = self.buf.len().min(MAGIC.len() - 1);
                self.buf.drain(..self.buf.len() - keep);
                return None;
            }
        }

        if self.buf.len() < HEADER_LEN {
            return None;
        }
        let mut len_bytes = [0u8; 8];
        len_bytes[..LENGTH_LEN].copy_from_slice(&self.buf[MAGIC.len()..HEADER_LEN]);
        let len = u64::from_le_bytes(len_bytes) as usize;

        if self.buf.len() < HEADER_LEN + len {
            return None;
        }
        let payload = self.buf[HEADER_LEN..HEADER_LEN + len].to_vec();
        self.buf.drain(..HEADER_LEN + len);
        Some(payload)
    }
}

/// Offset of the first magic occurrence, if any.
fn find_magic(buf: &[u8]) -> Option<usize> {
    if buf.len() < MAGIC.len() {
        return None;
    }
    buf.windows(MAGIC.len()).position(|w| w == MAGIC)
}

/// Framed reads over a raw byte stream.
pub struct FrameReader<R> {
    reader: R,
    decoder: FrameDecoder,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, decoder: FrameDecoder::new() }
    }

    /// Read until one complete payload is available. Returns `None` at EOF.
    pub async fn next_frame(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        loop {
            if let Some(payload) = self.decoder.next_frame() {
                return Ok(Some(payload));
            }
            let mut chunk = [0u8; 4096];
            let n = self.reader.read(&mut chunk).await?;
            if n == 0 {
                return Ok(None);
            }
            self.decoder.extend(&chunk[..n]);
        }
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
