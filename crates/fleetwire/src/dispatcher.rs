//! Per-connection dispatch loop: the protocol's state machine.
//!
//! Each accepted connection gets its own Tokio task running
//! [`run_session`]. The loop is strictly half-duplex: one request in,
//! one response out, in order, until the peer goes away.
//!
//! Per message:
//!   1. Receive one frame — clean close ends the session; a broken
//!      frame ends it without a reply (the channel can't be trusted to
//!      deliver one).
//!   2. Decode the request; undecodable documents are treated like
//!      broken frames.
//!   3. Look up the action — unknown keys follow the configured
//!      [`UnknownActionPolicy`].
//!   4. Check the role guard — refusals get `{"error": "Unauthorised"}`
//!      and the loop continues; the handler is never entered.
//!   5. Run the handler; apply its declared transition on success;
//!      encode and send exactly one response.
//!
//! Only steps 1–3 can end the session. A failing handler produces an
//! error response and the connection lives on.

use std::sync::Arc;

use fleetwire_protocol::{Codec, Request, Response, UNAUTHORISED};
use fleetwire_session::{HandlerError, Session, SessionId};
use fleetwire_transport::FramedConnection;

use crate::server::{ServerState, UnknownActionPolicy};
use crate::FleetwireError;

/// Drives one connection from accept to close.
///
/// Returns `Ok(())` for every way a session can end normally (peer
/// hung up, idle timeout, protocol violation by the peer); `Err` only
/// for local failures writing a response the peer was owed.
pub(crate) async fn run_session<Conn, C>(
    mut conn: Conn,
    state: Arc<ServerState<C>>,
) -> Result<(), FleetwireError>
where
    Conn: FramedConnection,
    C: Codec,
{
    let mut session = Session::new(
        SessionId::new(conn.id().into_inner()),
        state.config.initial_role,
    );
    tracing::debug!(session = %session.id, role = %session.role, "session started");

    loop {
        // --- Step 1: one frame ---
        let received = match state.config.idle_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, conn.recv_frame()).await {
                Ok(received) => received,
                Err(_) => {
                    tracing::info!(session = %session.id, "idle timeout; ending session");
                    return Ok(());
                }
            },
            None => conn.recv_frame().await,
        };
        let frame = match received {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::debug!(session = %session.id, "peer closed cleanly");
                return Ok(());
            }
            Err(e) => {
                // Truncated or malformed frame, or a socket error. No
                // response is owed to a peer we can no longer frame with.
                tracing::debug!(session = %session.id, error = %e, "receive failed; ending session");
                return Ok(());
            }
        };

        // --- Step 2: decode ---
        let request: Request = match state.codec.decode(&frame) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(session = %session.id, error = %e, "undecodable request; ending session");
                return Ok(());
            }
        };

        // --- Step 3: lookup ---
        let Some(descriptor) = state.registry.lookup(&request.action) else {
            match state.config.unknown_action {
                UnknownActionPolicy::Respond => {
                    tracing::warn!(session = %session.id, action = %request.action, "unknown action");
                    let response = Response::error(format!("unknown action: {}", request.action));
                    respond(&mut conn, &state.codec, &response).await?;
                    continue;
                }
                UnknownActionPolicy::Disconnect => {
                    tracing::warn!(
                        session = %session.id,
                        action = %request.action,
                        "unknown action; disconnecting"
                    );
                    return Ok(());
                }
            }
        };

        // --- Step 4: role guard ---
        if !descriptor.allows(session.role) {
            tracing::debug!(
                session = %session.id,
                action = %request.action,
                role = %session.role,
                "refused by role guard"
            );
            respond(&mut conn, &state.codec, &Response::error(UNAUTHORISED)).await?;
            continue;
        }

        // --- Step 5: handler, transition, response ---
        let call = descriptor.call(session.context(), request.params);
        let outcome = match state.config.handler_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, call).await {
                Ok(outcome) => outcome,
                Err(_) => Err(HandlerError::new("handler timed out")),
            },
            None => call.await,
        };

        let response = match outcome {
            Ok(reply) => {
                let next = descriptor.transition().resolve(session.role, reply.role);
                if next != session.role {
                    tracing::info!(
                        session = %session.id,
                        action = %request.action,
                        from = %session.role,
                        to = %next,
                        "role transition"
                    );
                    session.role = next;
                }
                Response::Ok(reply.body)
            }
            Err(e) => {
                tracing::debug!(
                    session = %session.id,
                    action = %request.action,
                    error = %e,
                    "handler failed"
                );
                Response::error(e.to_string())
            }
        };

        respond(&mut conn, &state.codec, &response).await?;
    }
}

/// Encodes and writes one response frame.
async fn respond<Conn, C>(
    conn: &mut Conn,
    codec: &C,
    response: &Response,
) -> Result<(), FleetwireError>
where
    Conn: FramedConnection,
    C: Codec,
{
    let bytes = codec.encode(response)?;
    conn.send_frame(&bytes).await?;
    Ok(())
}
