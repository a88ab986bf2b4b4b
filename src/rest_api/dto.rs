//! Request / response DTOs.

use serde::{Deserialize, Serialize};

use crate::engine::ObjectId;
use crate::registry::TypeDefinition;
use crate::schema::FieldSpec;
use crate::store::Instance;

/// Body of `POST /register_type/`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTypeRequest {
    /// Human-readable name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Immutable identifier
    pub slug: String,
    /// Declared fields
    pub fields: Vec<FieldSpec>,
    /// Unique-field names
    #[serde(default)]
    pub unique_fields: Vec<String>,
    /// Notify-field names
    #[serde(default)]
    pub notify_fields: Vec<String>,
}

impl From<CreateTypeRequest> for TypeDefinition {
    fn from(req: CreateTypeRequest) -> Self {
        Self {
            id: ObjectId::new(),
            name: req.name,
            description: req.description,
            slug: req.slug,
            fields: req.fields,
            unique_fields: req.unique_fields,
            notify_fields: req.notify_fields,
        }
    }
}

/// A stored type definition on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct TypeResponse {
    /// Stored identifier
    pub id: ObjectId,
    /// Human-readable name
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Immutable identifier
    pub slug: String,
    /// Declared fields
    pub fields: Vec<FieldSpec>,
    /// Unique-field names
    pub unique_fields: Vec<String>,
    /// Notify-field names
    pub notify_fields: Vec<String>,
}

impl From<TypeDefinition> for TypeResponse {
    fn from(def: TypeDefinition) -> Self {
        Self {
            id: def.id,
            name: def.name,
            description: def.description,
            slug: def.slug,
            fields: def.fields,
            unique_fields: def.unique_fields,
            notify_fields: def.notify_fields,
        }
    }
}

/// List wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct ListResponse<T: Serialize> {
    pub data: Vec<T>,
    pub count: usize,
}

impl<T: Serialize> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        let count = data.len();
        Self { data, count }
    }
}

/// Single record wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct SingleResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> SingleResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Delete outcome.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// Query parameters for instance listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    /// Matches skipped from the start
    #[serde(default)]
    pub skip: usize,
    /// Maximum matches returned
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Query parameters for single-instance reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetQuery {
    /// Include the history log in the projection
    #[serde(default)]
    pub include_history: bool,
}

/// An instance on the wire (history included only when requested).
pub type InstanceResponse = Instance;
