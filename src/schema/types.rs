//! Field type definitions.
//!
//! Supported declared types:
//! - int: 32-bit signed integer
//! - bool: Boolean
//! - float: 64-bit floating point
//! - str: UTF-8 string
//! - list_of_int / list_of_bool / list_of_float / list_of_str: homogeneous arrays

use serde::{Deserialize, Serialize};

/// Supported field types.
///
/// The set is closed: an unrecognized wire name is rejected at
/// deserialization and never reaches the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// 32-bit signed integer
    Int,
    /// Boolean
    Bool,
    /// 64-bit floating point
    Float,
    /// UTF-8 string
    Str,
    /// Array of 32-bit integers
    ListOfInt,
    /// Array of booleans
    ListOfBool,
    /// Array of 64-bit floats
    ListOfFloat,
    /// Array of strings
    ListOfStr,
}

impl FieldType {
    /// Returns the wire name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Int => "int",
            FieldType::Bool => "bool",
            FieldType::Float => "float",
            FieldType::Str => "str",
            FieldType::ListOfInt => "list_of_int",
            FieldType::ListOfBool => "list_of_bool",
            FieldType::ListOfFloat => "list_of_float",
            FieldType::ListOfStr => "list_of_str",
        }
    }

    /// Whether values of this type are string-typed (scalar or array).
    ///
    /// Text-typed keys are grouped contiguously inside composite indexes.
    pub fn is_text(&self) -> bool {
        matches!(self, FieldType::Str | FieldType::ListOfStr)
    }
}

/// One declared field of a record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name, unique within its type
    pub name: String,
    /// Declared type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether the field may be omitted
    #[serde(default)]
    pub optional: bool,
}

impl FieldSpec {
    /// Create a required field.
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            optional: false,
        }
    }

    /// Create an optional field.
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            optional: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_names() {
        let spec: FieldSpec =
            serde_json::from_value(json!({"name": "tags", "type": "list_of_str"})).unwrap();
        assert_eq!(spec.field_type, FieldType::ListOfStr);
        assert!(!spec.optional);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result: Result<FieldSpec, _> =
            serde_json::from_value(json!({"name": "x", "type": "decimal"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_text_detection() {
        assert!(FieldType::Str.is_text());
        assert!(FieldType::ListOfStr.is_text());
        assert!(!FieldType::Int.is_text());
        assert!(!FieldType::ListOfFloat.is_text());
    }
}
