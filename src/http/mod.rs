//! HTTP surface: routes, handlers, response shapes, and the server
//! entry point.

pub mod api;
pub mod server;
pub mod views;

pub use api::{AppState, SharedState};
pub use server::{build_router, start_server};
