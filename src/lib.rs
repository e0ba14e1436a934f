//! tracklet: a small issue tracking service (`SQLite` + JSON HTTP API).
//!
//! Issues carry a title, description, and priority, and move from open
//! to closed exactly once. Authenticated users read and discuss;
//! admins edit issues and manage accounts. All state lives in a single
//! `SQLite` database served over a JSON API.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod model;
pub mod service;
pub mod storage;
pub mod validation;

pub use error::{Result, TrackletError};
