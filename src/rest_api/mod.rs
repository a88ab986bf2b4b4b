//! HTTP adapter over the type registry and object store.

pub mod dto;
pub mod errors;
pub mod server;

pub use errors::{RestError, RestResult};
pub use server::{router, AppState};
