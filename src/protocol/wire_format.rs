//! Wire format encoding and decoding.
//!
//! Every message on the emulator socket is:
//! ```text
//! ┌──────────────────┬───────────────────────────┐
//! │ Length           │ Payload                   │
//! │ 8 bytes          │ `Length` bytes            │
//! │ uint64 native    │ encoded RamFrame          │
//! └──────────────────┴───────────────────────────┘
//! ```
//!
//! The length is in the host's native byte order: the emulator and the
//! listener always run on the same machine. There is no delimiter; the next
//! length prefix starts right after the payload.

use crate::codec::PayloadFormat;
use crate::error::Result;
use crate::frame::RamFrame;

/// Length prefix size in bytes (fixed, exactly 8).
pub const LENGTH_PREFIX_SIZE: usize = 8;

/// Default maximum payload size (64 MB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u64 = 64 * 1024 * 1024;

/// Encode a payload length as a native-endian prefix.
///
/// # Example
///
/// ```
/// use ramwire::protocol::{decode_length_prefix, encode_length_prefix};
///
/// let prefix = encode_length_prefix(100);
/// assert_eq!(prefix.len(), 8);
/// assert_eq!(decode_length_prefix(&prefix), Some(100));
/// ```
#[inline]
pub fn encode_length_prefix(len: u64) -> [u8; LENGTH_PREFIX_SIZE] {
    len.to_ne_bytes()
}

/// Decode a native-endian length prefix.
///
/// Returns `None` if the buffer is shorter than [`LENGTH_PREFIX_SIZE`].
#[inline]
pub fn decode_length_prefix(buf: &[u8]) -> Option<u64> {
    let prefix: [u8; LENGTH_PREFIX_SIZE] = buf.get(..LENGTH_PREFIX_SIZE)?.try_into().ok()?;
    Some(u64::from_ne_bytes(prefix))
}

/// Build a complete message (prefix + payload) as a single byte vector.
pub fn build_message(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.extend_from_slice(&encode_length_prefix(payload.len() as u64));
    buf.extend_from_slice(payload);
    buf
}

/// Encode a frame with `format` and wrap it in a length prefix.
///
/// This is what an emulator-side client writes for each frame.
pub fn encode_message(frame: &RamFrame, format: PayloadFormat) -> Result<Vec<u8>> {
    let payload = format.encode_frame(frame)?;
    Ok(build_message(&payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_is_native_endian() {
        let prefix = encode_length_prefix(0x0102_0304_0506_0708);
        assert_eq!(prefix, 0x0102_0304_0506_0708u64.to_ne_bytes());
    }

    #[test]
    fn test_decode_short_buffer() {
        assert_eq!(decode_length_prefix(&[0u8; 7]), None);
        assert_eq!(decode_length_prefix(&[]), None);
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut buf = encode_length_prefix(42).to_vec();
        buf.extend_from_slice(b"payload");
        assert_eq!(decode_length_prefix(&buf), Some(42));
    }

    #[test]
    fn test_build_message() {
        let bytes = build_message(b"hello");

        assert_eq!(bytes.len(), LENGTH_PREFIX_SIZE + 5);
        assert_eq!(decode_length_prefix(&bytes), Some(5));
        assert_eq!(&bytes[LENGTH_PREFIX_SIZE..], b"hello");
    }

    #[test]
    fn test_build_message_empty_payload() {
        let bytes = build_message(b"");
        assert_eq!(bytes.len(), LENGTH_PREFIX_SIZE);
        assert_eq!(decode_length_prefix(&bytes), Some(0));
    }

    #[test]
    fn test_encode_message_json() {
        let frame = RamFrame::from_pairs(1, [(2, 3)]);
        let bytes = encode_message(&frame, PayloadFormat::Json).unwrap();

        let payload = &bytes[LENGTH_PREFIX_SIZE..];
        assert_eq!(decode_length_prefix(&bytes), Some(payload.len() as u64));
        assert_eq!(PayloadFormat::Json.decode_frame(payload).unwrap(), frame);
    }
}
