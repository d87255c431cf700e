//! Transport layer for Fleetwire: plain TCP, one socket per client.
//!
//! Provides the [`Listener`] and [`FramedConnection`] traits that the
//! server and client stub are written against, plus the TCP
//! implementations ([`FramedTcpListener`], [`FramedTcpStream`]). The
//! traits exist as a seam: integration tests and in-process harnesses
//! can substitute a loopback implementation without a real socket.
//!
//! A connection here is *framed*: `send_frame`/`recv_frame` move whole
//! message payloads, with the boundary rule delegated to
//! [`fleetwire_protocol::Framing`]. Partial reads and writes never leak
//! out of this layer.

#![allow(async_fn_in_trait)]

mod error;
mod tcp;

pub use error::TransportError;
pub use tcp::{FramedTcpListener, FramedTcpStream};

use std::fmt;

/// Opaque identifier for a connection, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts incoming framed connections.
pub trait Listener: Send + 'static {
    /// The connection type produced by this listener.
    type Conn: FramedConnection;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Conn, TransportError>;

    /// Returns the local address the listener is bound to.
    fn local_addr(&self) -> std::io::Result<std::net::SocketAddr>;
}

/// A connection that moves whole message payloads.
///
/// Connections take `&mut self`: each one is exclusively owned by a
/// single task (the session loop on the server, the stub on the
/// client), so there is nothing to lock.
pub trait FramedConnection: Send + 'static {
    /// Frames and sends one payload, looping internally until every
    /// byte is written.
    async fn send_frame(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    /// Receives the next complete frame's payload.
    ///
    /// Returns `Ok(None)` when the peer closed cleanly between frames.
    /// A close in the middle of a frame is [`TransportError::Closed`];
    /// bytes that violate the framing rule are
    /// [`TransportError::Frame`].
    async fn recv_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Closes the connection.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1), "web");
        map.insert(ConnectionId::new(2), "scooter");
        assert_eq!(map[&ConnectionId::new(2)], "scooter");
    }
}
