//! Key encodings and the CBOR value codec.
//!
//! Key encodings are part of the persisted layout: changing one reorders
//! iteration and breaks replay against existing state.

use serde::{de::DeserializeOwned, Serialize};

use crate::{Result, StoreError};

/// Order-preserving byte encoding for collection keys.
pub trait KeyCodec: Sized {
    /// Append the encoded key to `buf`.
    fn encode_key(&self, buf: &mut Vec<u8>);

    /// Decode a key from exactly `bytes`.
    fn decode_key(bytes: &[u8]) -> std::result::Result<Self, String>;
}

/// Strings are stored as raw UTF-8. Only valid as the final key component.
impl KeyCodec for String {
    fn encode_key(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.as_bytes());
    }

    fn decode_key(bytes: &[u8]) -> std::result::Result<Self, String> {
        String::from_utf8(bytes.to_vec()).map_err(|e| format!("non-UTF-8 string key: {e}"))
    }
}

const SIGN_BIT: u64 = 1 << 63;

/// Big-endian with the sign bit flipped, so byte order equals numeric order.
impl KeyCodec for i64 {
    fn encode_key(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&((*self as u64) ^ SIGN_BIT).to_be_bytes());
    }

    fn decode_key(bytes: &[u8]) -> std::result::Result<Self, String> {
        let raw: [u8; 8] = bytes
            .try_into()
            .map_err(|_| format!("i64 key must be 8 bytes, got {}", bytes.len()))?;
        Ok((u64::from_be_bytes(raw) ^ SIGN_BIT) as i64)
    }
}

/// Serialize a stored value to CBOR bytes.
///
/// # Errors
///
/// Returns [`StoreError::Codec`] if the value cannot be serialized.
pub fn encode_value<T: Serialize>(collection: &'static str, value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| StoreError::Codec {
        collection,
        detail: format!("CBOR serialization failed: {e}"),
    })?;
    Ok(buf)
}

/// Deserialize a stored value from CBOR bytes.
///
/// # Errors
///
/// Returns [`StoreError::Codec`] if the bytes do not decode into `T`.
pub fn decode_value<T: DeserializeOwned>(collection: &'static str, data: &[u8]) -> Result<T> {
    ciborium::from_reader(data).map_err(|e| StoreError::Codec {
        collection,
        detail: format!("CBOR deserialization failed: {e}"),
    })
}
