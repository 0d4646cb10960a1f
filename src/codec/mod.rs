//! Codec module - payload encoding for RAM frames.
//!
//! This module provides codecs for the bytes that follow each length prefix:
//!
//! - [`JsonCodec`] - JSON using `serde_json` (default, matches the emulator-side Lua/Python clients)
//! - [`MsgPackCodec`] - MessagePack using `rmp-serde` (to_vec_named, struct-as-map)
//! - [`PayloadFormat`] - runtime selection between the two, with [`RamFrame`](crate::RamFrame)
//!   decode errors reported as `MalformedFrame`
//!
//! # Design
//!
//! The codecs are marker structs with static methods rather than trait objects.
//! [`PayloadFormat`] is the only runtime switch and is fixed per listener.
//!
//! # Example
//!
//! ```
//! use ramwire::codec::PayloadFormat;
//! use ramwire::RamFrame;
//!
//! let frame = RamFrame::from_pairs(10, [(0xD164, 25)]);
//! let bytes = PayloadFormat::Json.encode_frame(&frame).unwrap();
//! assert_eq!(PayloadFormat::Json.decode_frame(&bytes).unwrap(), frame);
//! ```

mod format;
mod json;
mod msgpack;

pub use format::PayloadFormat;
pub use json::JsonCodec;
pub use msgpack::MsgPackCodec;
