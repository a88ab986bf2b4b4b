//! Field model and schema compiler.
//!
//! A record type declares an ordered list of typed fields; `compile` turns
//! that list into a [`ValidationContract`] enforced by the storage engine at
//! write time, plus the list of required field names.

pub mod contract;
pub mod errors;
pub mod types;

pub use contract::{compile, PropertyType, ValidationContract};
pub use errors::{SchemaError, SchemaResult};
pub use types::{FieldSpec, FieldType};
