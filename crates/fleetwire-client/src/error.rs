use fleetwire_protocol::ProtocolError;
use fleetwire_transport::TransportError;

/// Errors a remote call can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server closed the connection before a complete response
    /// frame arrived. A call never hangs on a half-written response
    /// and never fabricates a default value — it fails with this.
    #[error("connection closed before a response arrived")]
    Closed,

    /// A socket-level failure (connect, send, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The request could not be encoded, or the response bytes could
    /// not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
