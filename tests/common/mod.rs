#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use std::sync::Arc;
use std::sync::Once;
use tracklet::http::{AppState, build_router};
use tracklet::model::Role;
use tracklet::storage::{SqliteStorage, StorageHandle};

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        tracklet::logging::init_test_logging();
    });
}

/// Identity of the seeded admin account (Ada Lovelace).
pub const ADMIN: (i64, &str) = (1, "admin");
/// Identity of the seeded regular account (Grace Hopper).
pub const MEMBER: (i64, &str) = (2, "user");

pub fn test_db() -> SqliteStorage {
    init_test_logging();
    SqliteStorage::open_memory().expect("Failed to create test database")
}

/// In-memory database with the two standard accounts inserted.
pub fn seeded_db() -> SqliteStorage {
    let mut storage = test_db();
    seed_users(&mut storage);
    storage
}

pub fn seed_users(storage: &mut SqliteStorage) {
    storage
        .insert_user("Ada", "Lovelace", "ada@example.com", Role::Admin)
        .expect("seed admin");
    storage
        .insert_user("Grace", "Hopper", "grace@example.com", Role::User)
        .expect("seed member");
}

/// Full application router over a seeded in-memory database.
pub fn test_app() -> Router {
    let storage = seeded_db();
    let state = Arc::new(AppState {
        storage: StorageHandle::new(storage),
    });
    build_router(state)
}

/// Build a request carrying the given identity headers.
///
/// `identity` is `(user id, role)`; `None` sends no identity at all.
pub fn request(
    method: &str,
    uri: &str,
    identity: Option<(i64, &str)>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = identity {
        builder = builder
            .header("x-tracklet-user", id.to_string())
            .header("x-tracklet-role", role);
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .expect("build request"),
        None => builder.body(Body::empty()).expect("build request"),
    }
}

pub async fn body_json(body: Body) -> serde_json::Value {
    let bytes = body.collect().await.expect("read body").to_bytes();
    serde_json::from_slice(&bytes).expect("parse body as JSON")
}
