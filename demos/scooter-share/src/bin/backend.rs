//! The scooter-share authoritative backend.
//!
//! Registers the account, booking, and repair actions over an
//! in-memory store and serves them with Fleetwire. Web front ends hold
//! a persistent connection: `login` promotes their session to the
//! stored user's role, and everything behind the role guards becomes
//! callable on that same connection.
//!
//! The store stands in for the real persistence layer — the protocol
//! neither knows nor cares what a handler talks to.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{Arc, Mutex};

use fleetwire::prelude::*;
use rand::Rng;
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct User {
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    role: Role,
}

impl User {
    fn as_json(&self) -> Value {
        json!({
            "email": self.email,
            "first_name": self.first_name,
            "last_name": self.last_name,
            "role": self.role.as_str(),
        })
    }
}

#[derive(Debug, Clone)]
struct Scooter {
    id: u64,
    latitude: f64,
    longitude: f64,
    available: bool,
}

impl Scooter {
    fn as_json(&self) -> Value {
        json!({
            "id": self.id,
            "latitude": self.latitude,
            "longitude": self.longitude,
            "available": self.available,
        })
    }
}

#[derive(Debug, Clone)]
struct Booking {
    reference: String,
    email: String,
    scooter_id: u64,
    start_time: String,
    end_time: String,
}

impl Booking {
    fn as_json(&self) -> Value {
        json!({
            "reference": self.reference,
            "scooter_id": self.scooter_id,
            "start_time": self.start_time,
            "end_time": self.end_time,
        })
    }
}

#[derive(Debug, Clone)]
struct Repair {
    id: u64,
    scooter_id: u64,
    report: String,
    fixed: bool,
}

/// Everything the handlers read and mutate, behind one coarse lock.
/// Contention is per-request and requests are short; the real system
/// pushes this down into a database.
#[derive(Debug, Default)]
struct Store {
    users: Mutex<HashMap<String, User>>,
    scooters: Mutex<HashMap<u64, Scooter>>,
    bookings: Mutex<Vec<Booking>>,
    repairs: Mutex<Vec<Repair>>,
}

/// Demo stand-in for a stored credential digest. Production systems
/// store a real KDF output; the protocol layer only ever compares.
fn hash_password(password: &str) -> String {
    let mut hasher = DefaultHasher::new();
    password.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

fn booking_reference() -> String {
    let bytes: [u8; 4] = rand::rng().random();
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("bk-{hex}")
}

fn seed(store: &Store) {
    let mut users = store.users.lock().expect("store lock poisoned");
    for (email, password, first, last, role) in [
        ("customer1@example.com", "password", "Cass", "Rider", Role::Customer),
        ("engineer1@example.com", "password", "Edda", "Wrench", Role::Engineer),
        ("admin@example.com", "password", "Ada", "Root", Role::Admin),
    ] {
        users.insert(
            email.to_string(),
            User {
                email: email.to_string(),
                password_hash: hash_password(password),
                first_name: first.to_string(),
                last_name: last.to_string(),
                role,
            },
        );
    }
    drop(users);

    let mut scooters = store.scooters.lock().expect("store lock poisoned");
    for (id, latitude, longitude, available) in [
        (1, 57.7089, 11.9746, true),
        (2, 57.6898, 11.9745, true),
        (3, 57.7005, 11.9530, false),
    ] {
        scooters.insert(id, Scooter { id, latitude, longitude, available });
    }
    drop(scooters);

    store.repairs.lock().expect("store lock poisoned").push(Repair {
        id: 1,
        scooter_id: 3,
        report: "brake lever loose".to_string(),
        fixed: false,
    });
}

// ---------------------------------------------------------------------------
// Parameter helpers
// ---------------------------------------------------------------------------

fn str_param(params: &Params, key: &str) -> Result<String, HandlerError> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| HandlerError::new(format!("missing parameter: {key}")))
}

fn u64_param(params: &Params, key: &str) -> Result<u64, HandlerError> {
    params
        .get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| HandlerError::new(format!("missing parameter: {key}")))
}

fn body(value: Value) -> Params {
    value.as_object().expect("object literal").clone()
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

fn build_registry(store: Arc<Store>) -> ActionRegistry {
    let mut registry = ActionRegistry::new();

    let users = Arc::clone(&store);
    registry.register(
        "register",
        &[Role::Start],
        Transition::FromHandler,
        move |_ctx, params| {
            let store = Arc::clone(&users);
            async move {
                let role: Role = str_param(&params, "role")?
                    .parse()
                    .map_err(|_| HandlerError::new("role must be either customer or engineer"))?;
                if !matches!(role, Role::Customer | Role::Engineer) {
                    return Err(HandlerError::new("role must be either customer or engineer"));
                }
                let email = str_param(&params, "email")?;
                let user = User {
                    email: email.clone(),
                    password_hash: hash_password(&str_param(&params, "password")?),
                    first_name: str_param(&params, "first_name")?,
                    last_name: str_param(&params, "last_name")?,
                    role,
                };
                let mut table = store.users.lock().expect("store lock poisoned");
                if table.contains_key(&email) {
                    return Err(HandlerError::new("email already registered"));
                }
                let reply = Reply::new(body(json!({"user": user.as_json()}))).with_role(role);
                table.insert(email, user);
                Ok(reply)
            }
        },
    );

    let users = Arc::clone(&store);
    registry.register(
        "login",
        &[Role::Start],
        Transition::FromHandler,
        move |_ctx, params| {
            let store = Arc::clone(&users);
            async move {
                let email = str_param(&params, "email")?;
                let password = str_param(&params, "password")?;
                let table = store.users.lock().expect("store lock poisoned");
                match table.get(&email) {
                    Some(user) if user.password_hash == hash_password(&password) => {
                        Ok(Reply::new(body(json!({"user": user.as_json()}))).with_role(user.role))
                    }
                    _ => Err(HandlerError::new("Login info is incorrect.")),
                }
            }
        },
    );

    let fleet = Arc::clone(&store);
    registry.register(
        "customer-homepage",
        &[Role::Customer],
        Transition::Stay,
        move |_ctx, params| {
            let store = Arc::clone(&fleet);
            async move {
                let email = str_param(&params, "email")?;
                let scooters: Vec<Value> = store
                    .scooters
                    .lock()
                    .expect("store lock poisoned")
                    .values()
                    .filter(|s| s.available)
                    .map(Scooter::as_json)
                    .collect();
                let bookings: Vec<Value> = store
                    .bookings
                    .lock()
                    .expect("store lock poisoned")
                    .iter()
                    .filter(|b| b.email == email)
                    .map(Booking::as_json)
                    .collect();
                Ok(Reply::new(body(json!({"scooters": scooters, "bookings": bookings}))))
            }
        },
    );

    let fleet = Arc::clone(&store);
    registry.register(
        "make-booking",
        &[Role::Start],
        Transition::Stay,
        move |_ctx, params| {
            let store = Arc::clone(&fleet);
            async move {
                let data = params
                    .get("data")
                    .and_then(Value::as_object)
                    .ok_or_else(|| HandlerError::new("missing parameter: data"))?;
                let email = str_param(data, "email")?;
                let scooter_id = u64_param(data, "scooter_id")?;

                let mut scooters = store.scooters.lock().expect("store lock poisoned");
                let scooter = scooters
                    .get_mut(&scooter_id)
                    .ok_or_else(|| HandlerError::new("scooter not found"))?;
                if !scooter.available {
                    return Err(HandlerError::new("scooter is not available"));
                }
                scooter.available = false;

                let booking = Booking {
                    reference: booking_reference(),
                    email,
                    scooter_id,
                    start_time: str_param(data, "start_time")?,
                    end_time: str_param(data, "end_time")?,
                };
                let reference = booking.reference.clone();
                store.bookings.lock().expect("store lock poisoned").push(booking);
                Ok(Reply::new(body(json!({"reference": reference}))))
            }
        },
    );

    let fleet = Arc::clone(&store);
    registry.register(
        "locations",
        &[Role::Engineer],
        Transition::Stay,
        move |_ctx, _params| {
            let store = Arc::clone(&fleet);
            async move {
                let repairs = store.repairs.lock().expect("store lock poisoned");
                let scooters = store.scooters.lock().expect("store lock poisoned");
                let awaiting: Vec<Value> = repairs
                    .iter()
                    .filter(|r| !r.fixed)
                    .filter_map(|r| {
                        scooters.get(&r.scooter_id).map(|s| {
                            json!({
                                "repair_id": r.id,
                                "report": r.report,
                                "scooter": s.as_json(),
                            })
                        })
                    })
                    .collect();
                Ok(Reply::new(body(json!({"data": awaiting}))))
            }
        },
    );

    let fleet = Arc::clone(&store);
    registry.register(
        "repair-fixed",
        &[Role::Engineer],
        Transition::Stay,
        move |_ctx, params| {
            let store = Arc::clone(&fleet);
            async move {
                let scooter_id = u64_param(&params, "scooter_id")?;
                let repair_id = u64_param(&params, "repair_id")?;

                let mut repairs = store.repairs.lock().expect("store lock poisoned");
                let repair = repairs
                    .iter_mut()
                    .find(|r| r.id == repair_id && r.scooter_id == scooter_id)
                    .ok_or_else(|| HandlerError::new("repair not found"))?;
                repair.fixed = true;

                let mut scooters = store.scooters.lock().expect("store lock poisoned");
                let scooter = scooters
                    .get_mut(&scooter_id)
                    .ok_or_else(|| HandlerError::new("scooter not found"))?;
                scooter.available = true;

                Ok(Reply::new(body(json!({"message": "scooter back in service"}))))
            }
        },
    );

    registry
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let addr =
        std::env::var("SCOOTER_SHARE_ADDR").unwrap_or_else(|_| "127.0.0.1:63000".to_string());

    let store = Arc::new(Store::default());
    seed(&store);
    let registry = build_registry(store);

    let server = ServerBuilder::new().bind(&addr).build(registry).await?;
    tracing::info!(%addr, "scooter-share backend ready");
    server.run().await?;
    Ok(())
}
