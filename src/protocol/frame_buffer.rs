//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements the reader state machine for length-prefixed messages:
//! - `AwaitingLength`: Need at least 8 bytes
//! - `AwaitingPayload`: Prefix parsed, need N more payload bytes
//!
//! # Example
//!
//! ```
//! use ramwire::protocol::{build_message, FrameBuffer};
//!
//! let mut buffer = FrameBuffer::new();
//!
//! // Data arrives in chunks from the socket
//! let message = build_message(br#"{"frame":1,"cells":[]}"#);
//! let (first, rest) = message.split_at(5);
//!
//! assert!(buffer.push(first).unwrap().is_empty());
//! let payloads = buffer.push(rest).unwrap();
//! assert_eq!(payloads.len(), 1);
//! ```

use bytes::{Bytes, BytesMut};

use super::wire_format::{decode_length_prefix, DEFAULT_MAX_PAYLOAD_SIZE, LENGTH_PREFIX_SIZE};
use crate::error::{RamwireError, Result};

/// Default initial buffer capacity (64 KB).
const DEFAULT_CAPACITY: usize = 64 * 1024;

/// State machine for message parsing.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for a complete length prefix (need 8 bytes).
    AwaitingLength,
    /// Prefix parsed, waiting for payload bytes.
    AwaitingPayload { remaining: usize },
}

/// Buffer for accumulating incoming bytes and extracting complete payloads.
///
/// All data is stored in a single `BytesMut` buffer to minimize allocations.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed payload size.
    max_payload_size: u64,
}

impl FrameBuffer {
    /// Create a new frame buffer with default settings.
    ///
    /// Default capacity: 64KB, max payload: 64MB.
    pub fn new() -> Self {
        Self::with_capacity_and_max_payload(DEFAULT_CAPACITY, DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Create a new frame buffer with custom max payload size.
    pub fn with_max_payload(max_payload_size: u64) -> Self {
        Self::with_capacity_and_max_payload(DEFAULT_CAPACITY, max_payload_size)
    }

    /// Create a new frame buffer with custom capacity and max payload.
    pub fn with_capacity_and_max_payload(capacity: usize, max_payload_size: u64) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            state: State::AwaitingLength,
            max_payload_size,
        }
    }

    /// Push data into the buffer and extract all complete payloads.
    ///
    /// Returns payloads in arrival order. If data is fragmented, the partial
    /// message is buffered internally for the next push.
    ///
    /// # Errors
    ///
    /// Returns [`RamwireError::PayloadTooLarge`] if a prefix declares more
    /// than the configured maximum. The buffer must not be reused afterwards.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        self.buffer.extend_from_slice(data);

        let mut payloads = Vec::new();
        while let Some(payload) = self.try_extract_one()? {
            payloads.push(payload);
        }

        Ok(payloads)
    }

    /// Signal that the peer closed the stream.
    ///
    /// EOF on a message boundary is a clean close. EOF part way through a
    /// prefix or payload is a short read.
    pub fn finish(&self) -> Result<()> {
        match self.state {
            State::AwaitingLength if self.buffer.is_empty() => Ok(()),
            State::AwaitingLength => Err(RamwireError::ShortRead {
                expected: LENGTH_PREFIX_SIZE,
                received: self.buffer.len(),
            }),
            State::AwaitingPayload { remaining } => Err(RamwireError::ShortRead {
                expected: remaining,
                received: self.buffer.len(),
            }),
        }
    }

    /// Try to extract a single payload from the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(payload))` if a complete message was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` if the declared length is over the limit
    fn try_extract_one(&mut self) -> Result<Option<Bytes>> {
        loop {
            match self.state {
                State::AwaitingLength => {
                    let Some(declared) = decode_length_prefix(&self.buffer) else {
                        return Ok(None);
                    };

                    if declared > self.max_payload_size {
                        return Err(RamwireError::PayloadTooLarge {
                            size: declared,
                            max: self.max_payload_size,
                        });
                    }
                    let remaining =
                        usize::try_from(declared).map_err(|_| RamwireError::PayloadTooLarge {
                            size: declared,
                            max: self.max_payload_size,
                        })?;

                    let _ = self.buffer.split_to(LENGTH_PREFIX_SIZE);
                    self.state = State::AwaitingPayload { remaining };
                }

                State::AwaitingPayload { remaining } => {
                    // The buffer grows as payload bytes arrive, never from
                    // the declared length alone
                    if self.buffer.len() < remaining {
                        return Ok(None);
                    }

                    let payload = self.buffer.split_to(remaining).freeze();
                    self.state = State::AwaitingLength;
                    return Ok(Some(payload));
                }
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::AwaitingLength;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match self.state {
            State::AwaitingLength => "AwaitingLength",
            State::AwaitingPayload { .. } => "AwaitingPayload",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
