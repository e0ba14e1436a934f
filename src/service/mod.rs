//! Business operations over storage: authorization, validation, and
//! lifecycle rules live here. The HTTP layer stays a thin adapter.

pub mod issues;
pub mod users;
