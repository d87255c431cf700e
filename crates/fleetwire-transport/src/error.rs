use fleetwire_protocol::ProtocolError;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer closed the stream in the middle of a frame.
    ///
    /// Distinct from a clean close (which `recv_frame` reports as
    /// `Ok(None)`) and from a malformed frame ([`Self::Frame`]).
    #[error("connection closed mid-frame")]
    Closed,

    /// Binding the listen address failed.
    #[error("bind failed: {0}")]
    Bind(#[source] std::io::Error),

    /// Accepting an incoming connection failed.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// Connecting to a remote peer failed.
    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),

    /// Writing a frame failed.
    #[error("send failed: {0}")]
    Send(#[source] std::io::Error),

    /// Reading from the stream failed.
    #[error("receive failed: {0}")]
    Recv(#[source] std::io::Error),

    /// The bytes on the stream violated the framing rule. The
    /// connection cannot be trusted afterwards and must be dropped.
    #[error(transparent)]
    Frame(#[from] ProtocolError),
}
