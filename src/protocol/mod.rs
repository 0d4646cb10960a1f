//! Protocol module - wire format and framing.
//!
//! This module implements the framing used on the emulator socket:
//! - 8-byte native-endian length prefix encoding/decoding
//! - Frame buffer for accumulating partial reads into complete payloads

mod frame_buffer;
mod wire_format;

pub use frame_buffer::FrameBuffer;
pub use wire_format::{
    build_message, decode_length_prefix, encode_length_prefix, encode_message,
    DEFAULT_MAX_PAYLOAD_SIZE, LENGTH_PREFIX_SIZE,
};
