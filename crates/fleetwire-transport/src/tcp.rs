//! TCP implementations of [`Listener`] and [`FramedConnection`].

use std::sync::atomic::{AtomicU64, Ordering};

use fleetwire_protocol::{DEFAULT_MAX_FRAME_LEN, FrameDecoder, Framing, encode_frame};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

use crate::{ConnectionId, FramedConnection, Listener, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Size of the read buffer handed to the kernel per `read` call.
const READ_CHUNK: usize = 8 * 1024;

/// A TCP [`Listener`] producing framed connections.
pub struct FramedTcpListener {
    listener: TcpListener,
    framing: Framing,
    max_frame_len: usize,
}

impl FramedTcpListener {
    /// Binds the given address. Every accepted connection inherits the
    /// listener's framing rule and frame-length cap.
    pub async fn bind(
        addr: impl ToSocketAddrs,
        framing: Framing,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await.map_err(TransportError::Bind)?;
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, ?framing, "listening");
        }
        Ok(FramedTcpListener {
            listener,
            framing,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        })
    }

    /// Overrides the per-frame length cap for accepted connections.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }
}

impl Listener for FramedTcpListener {
    type Conn = FramedTcpStream;

    async fn accept(&mut self) -> Result<FramedTcpStream, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Accept)?;
        let conn = FramedTcpStream::new(stream, self.framing, self.max_frame_len);
        tracing::debug!(id = %conn.id(), %peer, "accepted connection");
        Ok(conn)
    }

    fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }
}

/// A single framed TCP connection.
///
/// Buffers incoming bytes through a [`FrameDecoder`], so `recv_frame`
/// tolerates the network delivering a frame in arbitrarily small
/// pieces — or several frames in one piece.
pub struct FramedTcpStream {
    id: ConnectionId,
    stream: TcpStream,
    decoder: FrameDecoder,
    framing: Framing,
    max_frame_len: usize,
}

impl FramedTcpStream {
    fn new(stream: TcpStream, framing: Framing, max_frame_len: usize) -> Self {
        FramedTcpStream {
            id: ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)),
            stream,
            decoder: FrameDecoder::with_max_len(framing, max_frame_len),
            framing,
            max_frame_len,
        }
    }

    /// Connects to a remote listener. Used by the client stub; the
    /// framing rule must match the server's.
    pub async fn connect(
        addr: impl ToSocketAddrs,
        framing: Framing,
    ) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(TransportError::Connect)?;
        let conn = Self::new(stream, framing, DEFAULT_MAX_FRAME_LEN);
        tracing::debug!(id = %conn.id(), "connected");
        Ok(conn)
    }

    /// Overrides the per-frame length cap.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self.decoder = FrameDecoder::with_max_len(self.framing, max_frame_len);
        self
    }
}

impl FramedConnection for FramedTcpStream {
    async fn send_frame(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let frame = encode_frame(self.framing, payload, self.max_frame_len)?;
        // write_all loops on partial writes until the frame is out.
        self.stream
            .write_all(&frame)
            .await
            .map_err(TransportError::Send)?;
        self.stream.flush().await.map_err(TransportError::Send)
    }

    async fn recv_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            if let Some(frame) = self.decoder.try_frame()? {
                return Ok(Some(frame));
            }
            let mut buf = [0u8; READ_CHUNK];
            let n = self
                .stream
                .read(&mut buf)
                .await
                .map_err(TransportError::Recv)?;
            if n == 0 {
                // EOF. Clean only if no frame was in flight.
                return if self.decoder.is_empty() {
                    Ok(None)
                } else {
                    Err(TransportError::Closed)
                };
            }
            self.decoder.push(&buf[..n]);
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.stream.shutdown().await.map_err(TransportError::Send)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
