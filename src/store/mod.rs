//! Versioned object store.

pub mod model;
pub mod repository;

pub use model::{HistoryRecord, Instance, NewInstance};
pub use repository::ObjectStore;
