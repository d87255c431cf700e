//! Codec trait and the JSON implementation.
//!
//! A codec converts between Rust types and the bytes inside one frame.
//! The dispatcher and the client stub don't care how messages are
//! serialized — they go through the [`Codec`] trait, so a compact binary
//! codec could be swapped in later without touching either side.
//!
//! [`JsonCodec`] is the deployed format: every peer in the fleet speaks
//! UTF-8 JSON documents, which keeps messages inspectable in logs and
//! trivially producible from a web front end.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because the codec is shared by every
/// connection task the server spawns.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into the payload bytes of one frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes one frame's payload bytes back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed or
    /// don't match the expected message shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON via `serde_json`.
///
/// Compact encoding only: `serde_json::to_vec` never emits a raw newline
/// byte (newlines inside strings are escaped as `\n`), which is what
/// makes [`Framing::Newline`](crate::Framing) sound.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
