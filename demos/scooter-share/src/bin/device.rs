//! A field-device (scooter) server.
//!
//! Devices speak the verb+route convention over length-prefixed frames:
//! the backend connects, issues one command (`GET /location`,
//! `POST /lock`, `POST /unlock`), reads the response, and hangs up.
//! There is no login on this channel — every action is callable from
//! the initial role; the device trusts its private network segment.

use std::sync::{Arc, Mutex};

use fleetwire::prelude::*;
use serde_json::json;

#[derive(Debug)]
struct DeviceState {
    scooter_id: u64,
    latitude: f64,
    longitude: f64,
    locked: bool,
}

fn build_registry(state: Arc<Mutex<DeviceState>>) -> ActionRegistry {
    let mut registry = ActionRegistry::new();

    let device = Arc::clone(&state);
    registry.register(
        (Method::Get, "/location"),
        &[Role::Start],
        Transition::Stay,
        move |_ctx, _params| {
            let device = Arc::clone(&device);
            async move {
                let state = device.lock().expect("device state poisoned");
                let mut body = Params::new();
                body.insert("scooter_id".into(), json!(state.scooter_id));
                body.insert("latitude".into(), json!(state.latitude));
                body.insert("longitude".into(), json!(state.longitude));
                body.insert("locked".into(), json!(state.locked));
                Ok(Reply::new(body))
            }
        },
    );

    let device = Arc::clone(&state);
    registry.register(
        (Method::Post, "/lock"),
        &[Role::Start],
        Transition::Stay,
        move |_ctx, _params| {
            let device = Arc::clone(&device);
            async move {
                let mut state = device.lock().expect("device state poisoned");
                if state.locked {
                    return Err(HandlerError::new("already locked"));
                }
                state.locked = true;
                tracing::info!(scooter_id = state.scooter_id, "locked");
                Ok(Reply::empty())
            }
        },
    );

    let device = Arc::clone(&state);
    registry.register(
        (Method::Post, "/unlock"),
        &[Role::Start],
        Transition::Stay,
        move |_ctx, _params| {
            let device = Arc::clone(&device);
            async move {
                let mut state = device.lock().expect("device state poisoned");
                if !state.locked {
                    return Err(HandlerError::new("already unlocked"));
                }
                state.locked = false;
                tracing::info!(scooter_id = state.scooter_id, "unlocked");
                Ok(Reply::empty())
            }
        },
    );

    registry
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let addr =
        std::env::var("SCOOTER_DEVICE_ADDR").unwrap_or_else(|_| "127.0.0.1:63001".to_string());
    let scooter_id: u64 = std::env::var("SCOOTER_ID")
        .ok()
        .and_then(|id| id.parse().ok())
        .unwrap_or(1);

    let state = Arc::new(Mutex::new(DeviceState {
        scooter_id,
        latitude: 57.7089,
        longitude: 11.9746,
        locked: true,
    }));

    let server = ServerBuilder::new()
        .bind(&addr)
        .framing(Framing::LengthPrefixed)
        .build(build_registry(state))
        .await?;
    tracing::info!(%addr, scooter_id, "scooter device ready");
    server.run().await?;
    Ok(())
}
