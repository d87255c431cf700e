//! Client stub for Fleetwire servers.
//!
//! Two calling styles, matching how the fleet actually talks:
//!
//! - [`Client::call`] — one-shot: connect, send one request, read one
//!   response, hang up. This is how the backend reaches a field device
//!   for a single command.
//! - [`Connection`] — a socket kept open across a user session, with
//!   strict one-request/one-response pairing per [`send`](Connection::send).
//!   This is how a web front end talks to the authoritative backend,
//!   because the connection *is* the login state: dropping it drops the
//!   authorization the server granted.
//!
//! The stub performs no retries; retry policy belongs to the caller.

mod error;

pub use error::ClientError;

use fleetwire_protocol::{Codec, Framing, JsonCodec, Request, Response};
use fleetwire_transport::{FramedConnection, FramedTcpStream};

/// A one-shot caller: each [`call`](Self::call) uses a fresh connection.
///
/// Because every call starts a new session on the server, one-shot
/// calls only make sense for actions callable in the server's initial
/// role. For anything behind a login, hold a [`Connection`].
#[derive(Debug, Clone)]
pub struct Client {
    addr: String,
    framing: Framing,
}

impl Client {
    /// A client for the server at `addr` (host:port), using the
    /// default framing.
    pub fn new(addr: impl Into<String>) -> Self {
        Client {
            addr: addr.into(),
            framing: Framing::default(),
        }
    }

    /// Overrides the framing rule. Must match the server's.
    pub fn framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Connects, sends `request`, and returns the response.
    ///
    /// # Errors
    /// - [`ClientError::Closed`] if the server hangs up before a full
    ///   response frame arrives.
    /// - [`ClientError::Transport`] / [`ClientError::Protocol`] for
    ///   socket and encoding failures.
    pub async fn call(&self, request: &Request) -> Result<Response, ClientError> {
        let mut conn = Connection::open(&self.addr, self.framing).await?;
        let response = conn.send(request).await?;
        conn.close().await;
        Ok(response)
    }
}

/// A persistent connection to one server.
///
/// Requests are strictly paired: [`send`](Self::send) writes one frame
/// and blocks until exactly one response frame comes back, so responses
/// can never arrive out of order from this side.
pub struct Connection {
    conn: FramedTcpStream,
    codec: JsonCodec,
}

impl Connection {
    /// Opens a connection to the server at `addr`.
    pub async fn open(addr: &str, framing: Framing) -> Result<Self, ClientError> {
        let conn = FramedTcpStream::connect(addr, framing).await?;
        Ok(Connection {
            conn,
            codec: JsonCodec,
        })
    }

    /// Sends one request and waits for its response.
    ///
    /// # Errors
    /// [`ClientError::Closed`] if the peer closes before the response —
    /// whether cleanly between frames or mid-frame.
    pub async fn send(&mut self, request: &Request) -> Result<Response, ClientError> {
        let bytes = self.codec.encode(request)?;
        self.conn.send_frame(&bytes).await?;
        match self.conn.recv_frame().await {
            Ok(Some(frame)) => Ok(self.codec.decode(&frame)?),
            // Clean close and mid-frame close are the same thing to a
            // caller still owed a response.
            Ok(None) => Err(ClientError::Closed),
            Err(fleetwire_transport::TransportError::Closed) => Err(ClientError::Closed),
            Err(e) => Err(e.into()),
        }
    }

    /// Closes the connection. Errors are ignored — the session on the
    /// other side dies with the socket either way.
    pub async fn close(mut self) {
        if let Err(e) = self.conn.close().await {
            tracing::debug!(error = %e, "close failed");
        }
    }
}
