//! The action registry: which actions exist, who may call them, and
//! what happens to the session when they succeed.
//!
//! The registry is built once during startup — before the server
//! accepts its first connection — and handed to the server by value.
//! It is an explicit object, not a module-level global, so a test can
//! build a small registry in isolation and the server's dependency on
//! it is visible in its constructor. After startup it is only read.
//!
//! # Concurrency note
//!
//! `ActionRegistry` is a plain `HashMap` with no interior locking.
//! That is safe because registration finishes before dispatch begins;
//! the server wraps the finished registry in an `Arc` and every
//! connection task reads it immutably.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use fleetwire_protocol::{ActionKey, Params, Role};
use futures_util::future::BoxFuture;

use crate::{HandlerError, SessionContext};

/// What a handler resolves to.
pub type HandlerResult = Result<Reply, HandlerError>;

/// A boxed handler future, `'static` because handlers receive their
/// session context by value.
type BoxHandler =
    Box<dyn Fn(SessionContext, Params) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// A handler's success value: the response payload, plus (for actions
/// registered with [`Transition::FromHandler`]) the role the session
/// should adopt.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// The named-value payload returned to the caller.
    pub body: Params,
    /// The role offered by the handler. Honoured only when the action
    /// declared [`Transition::FromHandler`]; otherwise ignored with a
    /// warning.
    pub role: Option<Role>,
}

impl Reply {
    /// A reply with the given payload and no role change.
    pub fn new(body: Params) -> Self {
        Reply { body, role: None }
    }

    /// A reply with an empty payload (`{}` on the wire).
    pub fn empty() -> Self {
        Reply::new(Params::new())
    }

    /// Attaches the role the session should adopt. Meaningful only for
    /// actions registered with [`Transition::FromHandler`].
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// The role change an action performs, declared at registration.
///
/// Declaring transitions up front — instead of letting handler bodies
/// assign the session state ad hoc — means the complete state machine
/// can be read off the registration calls, and an action can never move
/// a session to a role nobody declared.
///
/// Transitions apply only when the handler succeeds. Any failure
/// (error reply, handler timeout) leaves the role untouched: a failed
/// login keeps the connection unauthenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The session keeps its current role. The default for almost
    /// every action.
    Stay,
    /// On success the session adopts this fixed role (e.g. a logout
    /// action returning to the initial role).
    To(Role),
    /// On success the session adopts the role carried in the handler's
    /// [`Reply`]. Needed when the target role is data-dependent — a
    /// login lands on whatever role the stored user record says.
    FromHandler,
}

impl Transition {
    /// Resolves the session's next role from a successful reply.
    pub fn resolve(self, current: Role, offered: Option<Role>) -> Role {
        if let Some(offered) = offered {
            // A handler may only steer the role if the action declared it.
            if !matches!(self, Transition::FromHandler) {
                tracing::warn!(
                    transition = ?self,
                    %offered,
                    "handler offered a role but the action does not declare FromHandler; ignoring"
                );
            }
        }
        match self {
            Transition::Stay => current,
            Transition::To(role) => role,
            Transition::FromHandler => offered.unwrap_or(current),
        }
    }
}

// ---------------------------------------------------------------------------
// ActionDescriptor
// ---------------------------------------------------------------------------

/// One registered action: its key, its role guard, its declared
/// transition, and the handler itself. Immutable once registered.
pub struct ActionDescriptor {
    key: ActionKey,
    allowed_roles: Vec<Role>,
    transition: Transition,
    handler: BoxHandler,
}

impl ActionDescriptor {
    /// The key this action is registered under.
    pub fn key(&self) -> &ActionKey {
        &self.key
    }

    /// The roles allowed to call this action.
    pub fn allowed_roles(&self) -> &[Role] {
        &self.allowed_roles
    }

    /// True if a session in `role` may call this action.
    pub fn allows(&self, role: Role) -> bool {
        self.allowed_roles.contains(&role)
    }

    /// The declared transition applied on success.
    pub fn transition(&self) -> Transition {
        self.transition
    }

    /// Invokes the handler. The guard is the dispatcher's job — this
    /// method does not re-check it.
    pub fn call(&self, ctx: SessionContext, params: Params) -> BoxFuture<'static, HandlerResult> {
        (self.handler)(ctx, params)
    }
}

impl fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("key", &self.key)
            .field("allowed_roles", &self.allowed_roles)
            .field("transition", &self.transition)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ActionRegistry
// ---------------------------------------------------------------------------

/// The table of every action a server can dispatch.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: HashMap<ActionKey, ActionDescriptor>,
}

impl ActionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action under `key`, callable from `allowed_roles`,
    /// applying `transition` when the handler succeeds.
    ///
    /// Registering the same key twice replaces the earlier descriptor
    /// (last registration wins, as the deployed system behaves) — but
    /// it is almost certainly a wiring mistake, so it is logged at warn
    /// level. An empty `allowed_roles` slice makes the action
    /// unreachable and is also warned about.
    pub fn register<H, Fut>(
        &mut self,
        key: impl Into<ActionKey>,
        allowed_roles: &[Role],
        transition: Transition,
        handler: H,
    ) where
        H: Fn(SessionContext, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let key = key.into();
        if allowed_roles.is_empty() {
            tracing::warn!(action = %key, "registered with an empty role set; it can never run");
        }
        let handler: BoxHandler = Box::new(move |ctx, params| -> BoxFuture<'static, HandlerResult> {
            Box::pin(handler(ctx, params))
        });
        let descriptor = ActionDescriptor {
            key: key.clone(),
            allowed_roles: allowed_roles.to_vec(),
            transition,
            handler,
        };
        if self.actions.insert(key.clone(), descriptor).is_some() {
            tracing::warn!(action = %key, "replaced an existing registration");
        }
    }

    /// Looks up the descriptor for `key`. `None` for unknown actions —
    /// never a panic; the dispatcher decides what an unknown action
    /// means for the connection.
    pub fn lookup(&self, key: &ActionKey) -> Option<&ActionDescriptor> {
        self.actions.get(key)
    }

    /// Number of registered actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// True if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionId;
    use fleetwire_protocol::Method;
    use serde_json::json;

    fn ctx(role: Role) -> SessionContext {
        SessionContext {
            id: SessionId::new(1),
            role,
        }
    }

    fn body(value: serde_json::Value) -> Params {
        value.as_object().expect("object").clone()
    }

    #[tokio::test]
    async fn test_register_and_call() {
        let mut registry = ActionRegistry::new();
        registry.register("hello", &[Role::Start], Transition::Stay, |_ctx, _params| async {
            Ok(Reply::new(body(json!({"greeting": "Hello!"}))))
        });

        let descriptor = registry.lookup(&ActionKey::name("hello")).expect("registered");
        assert!(descriptor.allows(Role::Start));
        assert!(!descriptor.allows(Role::Customer));

        let reply = descriptor.call(ctx(Role::Start), Params::new()).await.unwrap();
        assert_eq!(reply.body["greeting"], "Hello!");
    }

    #[test]
    fn test_lookup_unknown_key_is_none() {
        let registry = ActionRegistry::new();
        assert!(registry.lookup(&ActionKey::name("nope")).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_name_and_route_keys_do_not_collide() {
        let mut registry = ActionRegistry::new();
        registry.register("location", &[Role::Start], Transition::Stay, |_, _| async {
            Ok(Reply::empty())
        });
        registry.register(
            (Method::Get, "/location"),
            &[Role::Start],
            Transition::Stay,
            |_, _| async { Ok(Reply::empty()) },
        );
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let mut registry = ActionRegistry::new();
        registry.register("greet", &[Role::Start], Transition::Stay, |_, _| async {
            Ok(Reply::new(body(json!({"v": 1}))))
        });
        registry.register("greet", &[Role::Start], Transition::Stay, |_, _| async {
            Ok(Reply::new(body(json!({"v": 2}))))
        });

        assert_eq!(registry.len(), 1);
        let reply = registry
            .lookup(&ActionKey::name("greet"))
            .unwrap()
            .call(ctx(Role::Start), Params::new())
            .await
            .unwrap();
        assert_eq!(reply.body["v"], 2);
    }

    #[tokio::test]
    async fn test_handler_receives_params_and_context() {
        let mut registry = ActionRegistry::new();
        registry.register("echo-role", &Role::ALL, Transition::Stay, |ctx, params| async move {
            let mut out = Params::new();
            out.insert("role".into(), json!(ctx.role.as_str()));
            out.insert("got".into(), json!(params.len()));
            Ok(Reply::new(out))
        });

        let params = body(json!({"a": 1, "b": 2}));
        let reply = registry
            .lookup(&ActionKey::name("echo-role"))
            .unwrap()
            .call(ctx(Role::Engineer), params)
            .await
            .unwrap();
        assert_eq!(reply.body["role"], "engineer");
        assert_eq!(reply.body["got"], 2);
    }

    #[test]
    fn test_transition_resolution() {
        // Stay keeps the current role.
        assert_eq!(Transition::Stay.resolve(Role::Customer, None), Role::Customer);
        // To moves to the declared role.
        assert_eq!(Transition::To(Role::Start).resolve(Role::Admin, None), Role::Start);
        // FromHandler adopts the offered role, or stays without one.
        assert_eq!(
            Transition::FromHandler.resolve(Role::Start, Some(Role::Engineer)),
            Role::Engineer
        );
        assert_eq!(Transition::FromHandler.resolve(Role::Start, None), Role::Start);
    }

    #[test]
    fn test_undeclared_role_offer_is_ignored() {
        // A handler offering a role under Stay/To does not get to steer.
        assert_eq!(
            Transition::Stay.resolve(Role::Start, Some(Role::Admin)),
            Role::Start
        );
        assert_eq!(
            Transition::To(Role::Customer).resolve(Role::Start, Some(Role::Admin)),
            Role::Customer
        );
    }
}
