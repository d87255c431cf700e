//! Unified error type for the Fleetwire meta crate.

use fleetwire_protocol::ProtocolError;
use fleetwire_transport::TransportError;

/// Top-level error that wraps the crate-specific errors a server or
/// dispatcher can hit.
///
/// The `#[from]` attributes generate the `From` impls, so `?` inside
/// the server converts sub-crate errors automatically. Handler failures
/// never appear here — they are converted to in-band error responses by
/// the dispatcher and are not errors of the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum FleetwireError {
    /// A transport-level failure (bind, accept, send, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level failure (encode, decode, framing).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: FleetwireError = TransportError::Closed.into();
        assert!(matches!(err, FleetwireError::Transport(_)));
        assert!(err.to_string().contains("closed"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: FleetwireError = ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, FleetwireError::Protocol(_)));
    }
}
