//! Error type for action handlers.

/// A failure produced by an action handler.
///
/// Handlers signal failure by returning this explicitly — there is no
/// catch-all wrapper turning panics into responses. The message is
/// surfaced verbatim to the remote caller as `{"error": <message>}`,
/// so it should be phrased for the front end, not for the server log.
///
/// Business failures ("email already registered", "scooter not found")
/// and infrastructure failures inside a handler are deliberately the
/// same type: the protocol layer does not distinguish them.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    /// A handler error with the given caller-facing message.
    pub fn new(message: impl Into<String>) -> Self {
        HandlerError(message.into())
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        HandlerError(message.to_string())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        HandlerError(message)
    }
}
