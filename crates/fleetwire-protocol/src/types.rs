//! Core message types for Fleetwire's wire format.
//!
//! Everything here travels on the wire between independently deployed
//! processes, so the serialized shapes are part of the compatibility
//! contract and must not drift:
//!
//! - a name-keyed request is a flat object: `{"name": "login", ...}`
//!   where every field other than `"name"` is a parameter;
//! - a route-keyed request nests its parameters:
//!   `{"method": "GET", "uri": "/location", "params": {...}}`;
//! - a success response is any object without an `"error"` field, a
//!   failure is `{"error": "<message>"}`.
//!
//! In Rust these conventions are represented by proper tagged types
//! ([`ActionKey`], [`Response`]); the legacy shapes survive only inside
//! the manual `Serialize`/`Deserialize` impls.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::ProtocolError;

/// The open-ended named-parameter map carried by requests and success
/// responses.
pub type Params = Map<String, Value>;

/// The exact error message returned when an action is called from a role
/// that isn't allowed to call it. Front ends match on this string.
pub const UNAUTHORISED: &str = "Unauthorised";

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// A connection's authorization level.
///
/// One label from a small closed set. Every accepted connection begins in
/// the server's configured initial role (normally [`Role::Start`]) and
/// may be promoted by an action with a declared transition — for example
/// a successful `login` moves the connection to the logged-in user's
/// role. The role dies with the connection; reconnecting starts over.
///
/// Lowercase on the wire (`"start"`, `"customer"`, ...) to match what
/// the deployed front ends send in registration requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Fresh connection, nobody authenticated yet.
    Start,
    /// A logged-in customer.
    Customer,
    /// A logged-in field engineer.
    Engineer,
    /// A logged-in administrator.
    Admin,
}

impl Role {
    /// Every role, for registering an action callable from anywhere.
    pub const ALL: [Role; 4] = [Role::Start, Role::Customer, Role::Engineer, Role::Admin];

    /// The wire label for this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Start => "start",
            Role::Customer => "customer",
            Role::Engineer => "engineer",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Role::Start),
            "customer" => Ok(Role::Customer),
            "engineer" => Ok(Role::Engineer),
            "admin" => Ok(Role::Admin),
            other => Err(ProtocolError::InvalidMessage(format!("unknown role: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Method / ActionKey
// ---------------------------------------------------------------------------

/// The HTTP-like verb used by route-keyed requests.
///
/// The set is closed and deliberately not real HTTP — `UPDATE`, not
/// `PUT`/`PATCH` — because that is what the deployed devices send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Update,
    Delete,
}

impl Method {
    /// The wire spelling of this verb.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Update => "UPDATE",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "UPDATE" => Ok(Method::Update),
            "DELETE" => Ok(Method::Delete),
            other => Err(ProtocolError::InvalidMessage(format!("unknown method: {other}"))),
        }
    }
}

/// The discriminator that names which action a request wants.
///
/// Two conventions exist in the fleet and both must keep working:
/// a single action name (the backend style, e.g. `"make-booking"`),
/// or a verb plus a route (the device style, e.g. `GET /location`).
/// The registry keys descriptors by this type, so the two namespaces
/// can coexist on one server without colliding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKey {
    /// Single-name style: `{"name": "login", ...}`.
    Name(String),
    /// Verb+route style: `{"method": "GET", "uri": "/location", ...}`.
    Route { method: Method, route: String },
}

impl ActionKey {
    /// A name-keyed action.
    pub fn name(name: impl Into<String>) -> Self {
        ActionKey::Name(name.into())
    }

    /// A route-keyed action.
    pub fn route(method: Method, route: impl Into<String>) -> Self {
        ActionKey::Route {
            method,
            route: route.into(),
        }
    }
}

impl From<&str> for ActionKey {
    fn from(name: &str) -> Self {
        ActionKey::name(name)
    }
}

impl From<(Method, &str)> for ActionKey {
    fn from((method, route): (Method, &str)) -> Self {
        ActionKey::route(method, route)
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKey::Name(name) => f.write_str(name),
            ActionKey::Route { method, route } => write!(f, "{method} {route}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// One request message: an action discriminator plus named parameters.
///
/// Exactly one `Request` travels per logical call. The serialized shape
/// depends on the discriminator style — see the module docs. For the
/// name-keyed style the parameter names `"name"`, `"method"` and `"uri"`
/// are reserved by the envelope and must not be used as parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Which action this request is for.
    pub action: ActionKey,
    /// The open-ended parameter map.
    pub params: Params,
}

impl Request {
    /// A parameterless name-keyed request. Add parameters with
    /// [`with_param`](Self::with_param).
    pub fn named(name: impl Into<String>) -> Self {
        Request {
            action: ActionKey::name(name),
            params: Params::new(),
        }
    }

    /// A parameterless route-keyed request.
    pub fn route(method: Method, route: impl Into<String>) -> Self {
        Request {
            action: ActionKey::route(method, route),
            params: Params::new(),
        }
    }

    /// Adds one named parameter (builder style).
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

impl Serialize for Request {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = Map::new();
        match &self.action {
            ActionKey::Name(name) => {
                map.insert("name".to_string(), Value::String(name.clone()));
                for (key, value) in &self.params {
                    map.insert(key.clone(), value.clone());
                }
            }
            ActionKey::Route { method, route } => {
                map.insert("method".to_string(), Value::String(method.to_string()));
                map.insert("uri".to_string(), Value::String(route.clone()));
                // The deployed devices omit "params" when there are none.
                if !self.params.is_empty() {
                    map.insert("params".to_string(), Value::Object(self.params.clone()));
                }
            }
        }
        Value::Object(map).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Request {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let Value::Object(mut map) = value else {
            return Err(D::Error::custom("request must be a JSON object"));
        };

        // Route style wins if a "method" field is present; this mirrors
        // how the device servers route before looking at anything else.
        if let Some(method) = map.remove("method") {
            let Value::String(method) = method else {
                return Err(D::Error::custom("\"method\" must be a string"));
            };
            let method = method.parse::<Method>().map_err(D::Error::custom)?;
            let route = match map.remove("uri") {
                Some(Value::String(uri)) => uri,
                Some(_) => return Err(D::Error::custom("\"uri\" must be a string")),
                // Devices may omit the uri; it defaults to the root route.
                None => "/".to_string(),
            };
            let params = match map.remove("params") {
                Some(Value::Object(params)) => params,
                Some(_) => return Err(D::Error::custom("\"params\" must be an object")),
                None => Params::new(),
            };
            return Ok(Request {
                action: ActionKey::Route { method, route },
                params,
            });
        }

        match map.remove("name") {
            Some(Value::String(name)) => Ok(Request {
                action: ActionKey::Name(name),
                params: map,
            }),
            Some(_) => Err(D::Error::custom("\"name\" must be a string")),
            None => Err(D::Error::custom(
                "request needs a \"name\" or a \"method\"/\"uri\" pair",
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// One response message: either a success payload or an error.
///
/// The wire has no envelope tag — a failure is recognized by the
/// presence of an `"error"` field, everything else is success. In Rust
/// the two outcomes are an explicit tagged union and the legacy
/// convention lives only in the (de)serialization below.
///
/// The price of wire compatibility: a success payload whose own data
/// contains a string under the key `"error"` cannot be represented — it
/// would decode as a failure on the far end. [`Response::ok`] rejects
/// such payloads in debug builds.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Success, with an arbitrary named-value payload.
    Ok(Params),
    /// Failure, with a human-readable message.
    Err {
        /// What went wrong, surfaced verbatim to the caller.
        message: String,
    },
}

impl Response {
    /// A success response with the given payload.
    pub fn ok(body: Params) -> Self {
        debug_assert!(
            !matches!(body.get("error"), Some(Value::String(_))),
            "success payloads must not carry an \"error\" string field"
        );
        Response::Ok(body)
    }

    /// A success response with an empty payload (`{}` on the wire).
    pub fn empty() -> Self {
        Response::Ok(Params::new())
    }

    /// An error response with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Response::Err {
            message: message.into(),
        }
    }

    /// True for the error variant.
    pub fn is_err(&self) -> bool {
        matches!(self, Response::Err { .. })
    }

    /// The error message, if this is the error variant.
    pub fn err_message(&self) -> Option<&str> {
        match self {
            Response::Err { message } => Some(message),
            Response::Ok(_) => None,
        }
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Response::Ok(body) => Value::Object(body.clone()).serialize(serializer),
            Response::Err { message } => {
                let mut map = Map::new();
                map.insert("error".to_string(), Value::String(message.clone()));
                Value::Object(map).serialize(serializer)
            }
        }
    }
}

impl<'de> Deserialize<'de> for Response {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let Value::Object(map) = value else {
            return Err(D::Error::custom("response must be a JSON object"));
        };
        // Some peers put extra fields (an "errorCode") next to "error";
        // only the message survives the decode.
        match map.get("error") {
            Some(Value::String(message)) => Ok(Response::Err {
                message: message.clone(),
            }),
            Some(other) => Ok(Response::Err {
                message: other.to_string(),
            }),
            None => Ok(Response::Ok(map)),
        }
    }
}
