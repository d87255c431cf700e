//! Session types: what the server remembers about one connection.

use std::fmt;

use fleetwire_protocol::Role;

/// A unique identifier for a session, for logging and correlation.
///
/// Sessions map one-to-one onto connections, so in practice this
/// carries the connection's numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Creates a `SessionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sess-{}", self.0)
    }
}

/// The per-connection session.
///
/// Holds the one piece of mutable protocol-layer state: the current
/// authorization role. Owned exclusively by the connection's task —
/// no other task can see it, so no locking is involved. Destroyed with
/// the connection; a reconnecting peer gets a fresh session back at the
/// initial role.
#[derive(Debug)]
pub struct Session {
    /// Identifier, stable for the life of the connection.
    pub id: SessionId,
    /// Current authorization role, read before every dispatch.
    ///
    /// Only the dispatcher writes this, and only by applying the
    /// transition an action declared at registration.
    pub role: Role,
}

impl Session {
    /// A fresh session in the given initial role.
    pub fn new(id: SessionId, initial_role: Role) -> Self {
        Session {
            id,
            role: initial_role,
        }
    }

    /// Snapshot handed to handlers.
    pub fn context(&self) -> SessionContext {
        SessionContext {
            id: self.id,
            role: self.role,
        }
    }
}

/// Read-only snapshot of a session, passed by value to handlers.
///
/// Handlers see who is calling and as what role, but cannot mutate the
/// session — role changes go through the declared
/// [`Transition`](crate::Transition) instead.
#[derive(Debug, Clone, Copy)]
pub struct SessionContext {
    /// The session's identifier.
    pub id: SessionId,
    /// The session's role at the moment of dispatch.
    pub role: Role,
}
