//! Error types for the protocol layer.
//!
//! Each crate in Fleetwire defines its own error enum. A `ProtocolError`
//! always means the bytes or the message were wrong — never the socket
//! (that's `TransportError` in the transport crate) and never the
//! application logic (handlers report failures in-band).

/// Errors that can occur while encoding, decoding, or framing messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a message into bytes).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing discriminator,
    /// or a document that doesn't match the expected message shape.
    ///
    /// Per the framing contract, a receiver that hits this must close
    /// the connection rather than try to resynchronize.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The message is invalid at the protocol level even though it
    /// (de)serialized fine — e.g. a payload that embeds the frame
    /// delimiter, or a request with an unknown method string.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A frame announced (or grew to) a length beyond the configured
    /// maximum. Treated like any other malformed frame: fatal to the
    /// connection, no resynchronization.
    #[error("frame of {len} bytes exceeds the {max}-byte limit")]
    FrameTooLarge { len: usize, max: usize },
}
