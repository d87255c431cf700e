//! # Fleetwire
//!
//! A small TCP request/response protocol layer: framed JSON messages,
//! a registry of role-gated actions, per-connection authorization
//! state, and a task-per-connection server.
//!
//! A front end or field device sends one framed [`Request`] naming an
//! action; the server checks the action's role guard against the
//! connection's session, runs the handler, and writes back exactly one
//! [`Response`]. Logging in is just an action whose declared transition
//! promotes the session's role — there is no separate auth protocol.
//!
//! [`Request`]: fleetwire_protocol::Request
//! [`Response`]: fleetwire_protocol::Response
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use fleetwire::prelude::*;
//!
//! # async fn run() -> Result<(), fleetwire::FleetwireError> {
//! let mut registry = ActionRegistry::new();
//! registry.register("login", &[Role::Start], Transition::FromHandler, |_ctx, _params| async move {
//!     // ... verify credentials against the user store ...
//!     Ok(Reply::empty().with_role(Role::Customer))
//! });
//!
//! ServerBuilder::new()
//!     .bind("0.0.0.0:63000")
//!     .build(registry)
//!     .await?
//!     .run()
//!     .await
//! # }
//! ```

mod dispatcher;
mod error;
mod server;

pub use error::FleetwireError;
pub use server::{Server, ServerBuilder, ServerConfig, UnknownActionPolicy};

/// The commonly needed names in one import.
pub mod prelude {
    pub use fleetwire_protocol::{
        ActionKey, Framing, Method, Params, Request, Response, Role, UNAUTHORISED,
    };
    pub use fleetwire_session::{
        ActionRegistry, HandlerError, HandlerResult, Reply, SessionContext, Transition,
    };

    pub use crate::{FleetwireError, Server, ServerBuilder, ServerConfig, UnknownActionPolicy};
}
