//! `Server` builder and accept loop.
//!
//! This ties the layers together: transport (framed TCP) → protocol
//! (JSON requests/responses) → session (roles and the action registry).

use std::sync::Arc;
use std::time::Duration;

use fleetwire_protocol::{Codec, DEFAULT_MAX_FRAME_LEN, Framing, JsonCodec, Role};
use fleetwire_session::ActionRegistry;
use fleetwire_transport::{FramedTcpListener, Listener};

use crate::FleetwireError;
use crate::dispatcher::run_session;

/// What to do with a request naming an action nobody registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownActionPolicy {
    /// Reply with `{"error": "unknown action: ..."}` and keep the
    /// connection open. The default.
    #[default]
    Respond,
    /// Silently drop the connection, as the original deployment did.
    /// Only for peers that depend on that behavior.
    Disconnect,
}

/// Server behavior knobs.
///
/// The defaults reproduce the deployed system: newline framing,
/// sessions starting unauthenticated, no timeouts. The timeouts exist
/// so an operator can bound abandoned connections and runaway handlers
/// without code changes.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Framing rule shared with every peer of this server.
    pub framing: Framing,
    /// The role every session starts in.
    pub initial_role: Role,
    /// Policy for requests naming an unregistered action.
    pub unknown_action: UnknownActionPolicy,
    /// Close sessions that stay silent this long. `None` waits forever.
    pub idle_timeout: Option<Duration>,
    /// Fail handlers that run this long with an in-band error.
    /// `None` lets them run forever; the connection's own task is the
    /// only thing they can hold up either way.
    pub handler_timeout: Option<Duration>,
    /// Per-frame payload cap.
    pub max_frame_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            framing: Framing::default(),
            initial_role: Role::Start,
            unknown_action: UnknownActionPolicy::default(),
            idle_timeout: None,
            handler_timeout: None,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// Shared server state, one `Arc` handed to every connection task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: ActionRegistry,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and binding a [`Server`].
///
/// # Example
///
/// ```rust,no_run
/// use fleetwire::prelude::*;
///
/// # async fn run() -> Result<(), fleetwire::FleetwireError> {
/// let mut registry = ActionRegistry::new();
/// registry.register("ping", &Role::ALL, Transition::Stay, |_ctx, _params| async {
///     Ok(Reply::empty())
/// });
///
/// let server = ServerBuilder::new()
///     .bind("0.0.0.0:63000")
///     .build(registry)
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ServerBuilder {
    bind_addr: String,
    config: ServerConfig,
}

impl ServerBuilder {
    /// A builder with default settings, bound to localhost.
    pub fn new() -> Self {
        ServerBuilder {
            bind_addr: "127.0.0.1:63000".to_string(),
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the framing rule.
    pub fn framing(mut self, framing: Framing) -> Self {
        self.config.framing = framing;
        self
    }

    /// Sets the role new sessions start in.
    pub fn initial_role(mut self, role: Role) -> Self {
        self.config.initial_role = role;
        self
    }

    /// Sets the unknown-action policy.
    pub fn unknown_action(mut self, policy: UnknownActionPolicy) -> Self {
        self.config.unknown_action = policy;
        self
    }

    /// Closes sessions with no traffic for `timeout`.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = Some(timeout);
        self
    }

    /// Bounds each handler invocation to `timeout`.
    pub fn handler_timeout(mut self, timeout: Duration) -> Self {
        self.config.handler_timeout = Some(timeout);
        self
    }

    /// Sets the per-frame payload cap.
    pub fn max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.config.max_frame_len = max_frame_len;
        self
    }

    /// Binds the listener and produces a server ready to run.
    ///
    /// Takes the registry by value: registration is over once the
    /// server exists, which is what makes lock-free dispatch sound.
    pub async fn build(
        self,
        registry: ActionRegistry,
    ) -> Result<Server<JsonCodec>, FleetwireError> {
        let listener = FramedTcpListener::bind(&self.bind_addr, self.config.framing)
            .await?
            .with_max_frame_len(self.config.max_frame_len);

        let state = Arc::new(ServerState {
            registry,
            codec: JsonCodec,
            config: self.config,
        });

        Ok(Server { listener, state })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Fleetwire server. Call [`run()`](Self::run) to start
/// accepting connections.
pub struct Server<C: Codec> {
    listener: FramedTcpListener,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Server<C> {
    /// Creates a new builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop.
    ///
    /// Each accepted connection gets a fresh session in the configured
    /// initial role and its own task, so a slow peer or handler only
    /// ever delays its own connection. Runs until the process stops;
    /// dropping the future stops accepting while live connection tasks
    /// finish independently.
    pub async fn run(mut self) -> Result<(), FleetwireError> {
        tracing::info!("fleetwire server running");

        loop {
            match self.listener.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = run_session(conn, state).await {
                            tracing::debug!(error = %e, "session ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
