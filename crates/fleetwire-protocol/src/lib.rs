//! Wire protocol for Fleetwire.
//!
//! This crate defines the "language" spoken between the front ends, the
//! field devices, and the authoritative backend:
//!
//! - **Types** ([`Request`], [`Response`], [`ActionKey`], [`Role`]) — the
//!   messages that travel on the wire and the labels that gate them.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how a message becomes
//!   bytes and comes back.
//! - **Framing** ([`Framing`], [`FrameDecoder`], [`encode_frame`]) — how a
//!   receiver finds the boundary between one message and the next on a
//!   byte stream.
//! - **Errors** ([`ProtocolError`]) — what can go wrong in between.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and session
//! (authorization state). It knows nothing about sockets or roles being
//! checked — it only turns messages into framed bytes and back.
//!
//! ```text
//! Transport (bytes) → Protocol (Request/Response) → Session (role guard)
//! ```
//!
//! Framing is deliberately kept free of I/O: [`FrameDecoder`] is fed
//! bytes in whatever chunks the network delivers and yields complete
//! frames, which makes the boundary logic testable without a socket.

mod codec;
mod error;
mod frame;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use frame::{DEFAULT_MAX_FRAME_LEN, FrameDecoder, Framing, encode_frame};
pub use types::{ActionKey, Method, Params, Request, Response, Role, UNAUTHORISED};
