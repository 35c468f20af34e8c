//! mkp-daemon library target.
//!
//! Exposes the router, state and backends for integration tests.
//! The binary `main.rs` depends on this library target.

pub mod api_types;
pub mod backend;
pub mod error;
pub mod routes;
pub mod state;
