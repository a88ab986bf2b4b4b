//! regidb - a runtime-typed, versioned record registry
//!
//! Operators declare record types at runtime. Each registered type becomes a
//! schema-enforced collection, and every stored object carries an append-only
//! history of its past states.

pub mod cache;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod rest_api;
pub mod schema;
pub mod store;

pub use error::{Error, Result};
