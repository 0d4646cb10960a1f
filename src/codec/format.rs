//! Payload format selection.

use std::fmt;
use std::str::FromStr;

use super::{JsonCodec, MsgPackCodec};
use crate::error::{RamwireError, Result};
use crate::frame::RamFrame;

/// Encoding of the bytes following each length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadFormat {
    /// UTF-8 JSON object.
    #[default]
    Json,
    /// MessagePack map with named fields.
    MsgPack,
}

impl PayloadFormat {
    /// Decode a payload into a [`RamFrame`].
    ///
    /// # Errors
    ///
    /// Returns [`RamwireError::MalformedFrame`] if the payload is not valid
    /// structured data or is missing `frame` / `cells`.
    pub fn decode_frame(self, payload: &[u8]) -> Result<RamFrame> {
        let decoded = match self {
            Self::Json => JsonCodec::decode(payload),
            Self::MsgPack => MsgPackCodec::decode(payload),
        };
        decoded.map_err(|e| RamwireError::MalformedFrame(e.to_string()))
    }

    /// Encode a [`RamFrame`] into payload bytes.
    ///
    /// A `RamFrame` only holds integers, so neither backend can reject it;
    /// the `Result` mirrors the codec signatures.
    pub fn encode_frame(self, frame: &RamFrame) -> Result<Vec<u8>> {
        match self {
            Self::Json => JsonCodec::encode(frame),
            Self::MsgPack => MsgPackCodec::encode(frame),
        }
    }

    /// Short lowercase name, as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::MsgPack => "msgpack",
        }
    }
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayloadFormat {
    type Err = RamwireError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "msgpack" | "messagepack" => Ok(Self::MsgPack),
            other => Err(RamwireError::Config(format!(
                "unknown payload format '{}'",
                other
            ))),
        }
    }
}
