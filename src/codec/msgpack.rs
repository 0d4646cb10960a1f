//! MsgPack codec using `rmp-serde`.
//!
//! **Always use `to_vec_named`, never `to_vec`.**
//!
//! - `to_vec` serializes structs as arrays (positional)
//! - `to_vec_named` serializes structs as maps (with field names)
//! - Emulator-side scripts build plain maps (`{frame=..., cells=...}`), so
//!   positional arrays would not decode on either side
//!
//! # Example
//!
//! ```
//! use ramwire::codec::MsgPackCodec;
//! use ramwire::RamFrame;
//!
//! let frame = RamFrame::from_pairs(42, [(1, 2)]);
//! let encoded = MsgPackCodec::encode(&frame).unwrap();
//! let decoded: RamFrame = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, frame);
//! ```

use crate::error::Result;

/// MessagePack codec for structured data.
///
/// Uses `rmp_serde::to_vec_named` so structs are serialized as maps
/// (with field names) rather than arrays (positional).
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes cannot be deserialized to type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
