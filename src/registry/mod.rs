//! Type registry and collection provisioning.

pub mod model;
pub mod provision;
pub mod repository;

pub use model::{TypeDefinition, TypePatch};
pub use provision::METADATA_COLLECTION;
pub use repository::TypeRegistry;
