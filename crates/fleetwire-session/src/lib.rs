//! Session and authorization layer for Fleetwire.
//!
//! This crate owns the two pieces of state the protocol layer carries:
//!
//! - **Sessions** ([`Session`]) — one per accepted connection, holding
//!   the connection's current [`Role`](fleetwire_protocol::Role). Born
//!   at accept in the server's initial role, dead at disconnect, never
//!   persisted or resumed.
//! - **The action registry** ([`ActionRegistry`]) — the process-wide
//!   table mapping an action key to its handler, the roles allowed to
//!   call it, and the declared role [`Transition`] applied when it
//!   succeeds. Built once at startup, read-only while the server runs.
//!
//! Handlers never touch the session directly: they receive a by-value
//! [`SessionContext`] and return a [`Reply`]. Role changes happen only
//! through the transition declared at registration, which keeps every
//! possible state change visible in one place instead of buried in
//! handler bodies.

mod error;
mod registry;
mod session;

pub use error::HandlerError;
pub use registry::{ActionDescriptor, ActionRegistry, HandlerResult, Reply, Transition};
pub use session::{Session, SessionContext, SessionId};
