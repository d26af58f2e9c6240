#![allow(dead_code)]

use axum::body::Body;
use axum::routing::RouterIntoService;
use backoffice::app::{AppState, build_router};
use backoffice::clock::FixedClock;
use backoffice::store::BackOfficeStore;
use backoffice::store::memory::InMemoryStore;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

pub type App = RouterIntoService<Body, ()>;

/// Router over a fresh in-memory store, with handles to the store (for
/// registering references) and the clock (for simulating days).
pub struct TestApp {
    pub app: App,
    pub store: Arc<InMemoryStore>,
    pub clock: FixedClock,
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0).unwrap()
}

pub fn test_app(verify_references: bool) -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let clock = FixedClock::new(at(16, 9));
    let state = AppState {
        service_name: "backoffice".to_string(),
        api_version: "v1".to_string(),
        store: store.clone(),
        clock: Arc::new(clock.clone()),
        verify_references,
    };
    TestApp {
        app: build_router(state).into_service(),
        store,
        clock,
    }
}

pub fn app_with_store(store: Arc<dyn BackOfficeStore + Send + Sync>) -> App {
    let state = AppState {
        service_name: "backoffice".to_string(),
        api_version: "v1".to_string(),
        store,
        clock: Arc::new(FixedClock::new(at(16, 9))),
        verify_references: true,
    };
    build_router(state).into_service()
}

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

/// True when `key` looks like `PREFIX-YYYYMMDD-NNNN`.
pub fn is_business_key(prefix: &str, key: &str) -> bool {
    let parts: Vec<&str> = key.split('-').collect();
    parts.len() == 3
        && parts[0] == prefix
        && parts[1].len() == 8
        && parts[2].len() == 4
        && parts[1..].iter().all(|part| part.bytes().all(|b| b.is_ascii_digit()))
}
