//! JSON codec using `serde_json`.
//!
//! The emulator-side clients serialize frames with their host language's JSON
//! library, so this is the default payload format.

use crate::error::Result;

/// JSON codec for structured data.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a value to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    /// Decode JSON bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not valid UTF-8 JSON for type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{MemoryCell, RamFrame};

    #[test]
    fn test_encode_decode_frame() {
        let frame = RamFrame::from_pairs(10, [(123, 456), (234, 567)]);

        let encoded = JsonCodec::encode(&frame).unwrap();
        let decoded: RamFrame = JsonCodec::decode(&encoded).unwrap();

        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_wire_shape() {
        let cell = MemoryCell::new(1, 2);
        let encoded = JsonCodec::encode(&cell).unwrap();
        assert_eq!(encoded, br#"{"location":1,"value":2}"#);
    }

    #[test]
    fn test_decode_error_on_invalid_data() {
        let result: Result<RamFrame> = JsonCodec::decode(b"{\"frame\": ");
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_error_on_missing_field() {
        let result: Result<RamFrame> = JsonCodec::decode(br#"{"frame": 3}"#);
        assert!(result.is_err());
    }
}
