//! Schema compilation and the table-driven write-time validator.
//!
//! `compile` turns an ordered field list into a structural validation
//! contract plus the list of required field names. The contract is what a
//! collection enforces at strict level: every insert and every post-update
//! document image must satisfy it.

use std::collections::BTreeMap;

use serde_json::Value;

use super::errors::{SchemaError, SchemaResult};
use super::types::{FieldSpec, FieldType};
use crate::engine::Document;

/// Structural type of one contract property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyType {
    /// Document identifier (string form)
    Id,
    /// Boolean
    Bool,
    /// 32-bit signed integer
    Int,
    /// 64-bit float (integers are acceptable float values)
    Double,
    /// UTF-8 string
    Str,
    /// Homogeneous array of a scalar property type
    Array(Box<PropertyType>),
    /// Array with no element constraint (the history log)
    UnstructuredArray,
}

impl PropertyType {
    fn expected_name(&self) -> &'static str {
        match self {
            PropertyType::Id => "object id",
            PropertyType::Bool => "bool",
            PropertyType::Int => "int",
            PropertyType::Double => "float",
            PropertyType::Str => "str",
            PropertyType::Array(_) => "array",
            PropertyType::UnstructuredArray => "array",
        }
    }
}

impl From<FieldType> for PropertyType {
    fn from(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Int => PropertyType::Int,
            FieldType::Bool => PropertyType::Bool,
            FieldType::Float => PropertyType::Double,
            FieldType::Str => PropertyType::Str,
            FieldType::ListOfInt => PropertyType::Array(Box::new(PropertyType::Int)),
            FieldType::ListOfBool => PropertyType::Array(Box::new(PropertyType::Bool)),
            FieldType::ListOfFloat => PropertyType::Array(Box::new(PropertyType::Double)),
            FieldType::ListOfStr => PropertyType::Array(Box::new(PropertyType::Str)),
        }
    }
}

/// Compiled structural validation contract.
///
/// Undeclared properties are always rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationContract {
    properties: BTreeMap<String, PropertyType>,
    required: Vec<String>,
}

/// Compiles an ordered field list into its contract and required-field list.
///
/// Four implicit properties are always injected regardless of the declared
/// fields: `_id`, `notify_fields`, `is_deactivated`, and `history`.
/// Deterministic: the same field list always yields the same contract.
pub fn compile(fields: &[FieldSpec]) -> (ValidationContract, Vec<String>) {
    let mut properties = BTreeMap::new();
    for field in fields {
        properties.insert(field.name.clone(), PropertyType::from(field.field_type));
    }
    properties.insert("_id".to_string(), PropertyType::Id);
    properties.insert(
        "notify_fields".to_string(),
        PropertyType::Array(Box::new(PropertyType::Str)),
    );
    properties.insert("is_deactivated".to_string(), PropertyType::Bool);
    properties.insert("history".to_string(), PropertyType::UnstructuredArray);

    let required: Vec<String> = fields
        .iter()
        .filter(|field| !field.optional)
        .map(|field| field.name.clone())
        .collect();

    (
        ValidationContract {
            properties,
            required: required.clone(),
        },
        required,
    )
}

impl ValidationContract {
    /// Validates a full document image against the contract.
    pub fn validate(&self, doc: &Document) -> SchemaResult<()> {
        for key in doc.keys() {
            if !self.properties.contains_key(key) {
                return Err(SchemaError::UnknownField { field: key.clone() });
            }
        }

        for field in &self.required {
            if !doc.contains_key(field) {
                return Err(SchemaError::MissingRequired {
                    field: field.clone(),
                });
            }
        }

        for (name, property) in &self.properties {
            if let Some(value) = doc.get(name) {
                validate_value(value, property, name)?;
            }
        }

        Ok(())
    }
}

/// Validates one value against one property type.
fn validate_value(value: &Value, property: &PropertyType, path: &str) -> SchemaResult<()> {
    if value.is_null() {
        return Err(SchemaError::NullValue {
            field: path.to_string(),
        });
    }

    match property {
        PropertyType::Id | PropertyType::Str => {
            if !value.is_string() {
                return Err(type_mismatch(property, value, path));
            }
        }
        PropertyType::Bool => {
            if !value.is_boolean() {
                return Err(type_mismatch(property, value, path));
            }
        }
        PropertyType::Int => {
            let Some(i) = value.as_i64() else {
                return Err(type_mismatch(property, value, path));
            };
            if i32::try_from(i).is_err() {
                return Err(SchemaError::IntOutOfRange {
                    field: path.to_string(),
                });
            }
        }
        PropertyType::Double => {
            // Integers are acceptable float values.
            if !value.is_number() {
                return Err(type_mismatch(property, value, path));
            }
        }
        PropertyType::Array(element) => {
            let Some(items) = value.as_array() else {
                return Err(type_mismatch(property, value, path));
            };
            for (i, item) in items.iter().enumerate() {
                validate_value(item, element, &format!("{path}[{i}]"))?;
            }
        }
        PropertyType::UnstructuredArray => {
            if !value.is_array() {
                return Err(type_mismatch(property, value, path));
            }
        }
    }

    Ok(())
}

fn type_mismatch(property: &PropertyType, value: &Value, path: &str) -> SchemaError {
    SchemaError::TypeMismatch {
        field: path.to_string(),
        expected: property.expected_name(),
        actual: json_type_name(value),
    }
}

/// Returns the JSON type name for error messages.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "int"
            } else {
                "float"
            }
        }
        Value::String(_) => "str",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::required("login", FieldType::Str),
            FieldSpec::required("uid", FieldType::Int),
            FieldSpec::optional("score", FieldType::Float),
            FieldSpec::optional("groups", FieldType::ListOfStr),
        ]
    }

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_compile_is_deterministic() {
        let fields = sample_fields();
        let (first, required_a) = compile(&fields);
        let (second, required_b) = compile(&fields);
        assert_eq!(first, second);
        assert_eq!(required_a, required_b);
    }

    #[test]
    fn test_required_excludes_optional_fields() {
        let (_, required) = compile(&sample_fields());
        assert_eq!(required, vec!["login".to_string(), "uid".to_string()]);
    }

    #[test]
    fn test_implicit_properties_accepted() {
        let (contract, _) = compile(&sample_fields());
        let full = doc(json!({
            "_id": "abc",
            "login": "alice",
            "uid": 7,
            "notify_fields": ["login"],
            "is_deactivated": false,
            "history": [{"anything": true}]
        }));
        contract.validate(&full).unwrap();
    }

    #[test]
    fn test_implicit_properties_injected_without_fields() {
        let (contract, required) = compile(&[]);
        assert!(required.is_empty());
        let minimal = doc(json!({
            "_id": "abc",
            "notify_fields": [],
            "is_deactivated": false,
            "history": []
        }));
        contract.validate(&minimal).unwrap();
    }

    #[test]
    fn test_missing_required_rejected() {
        let (contract, _) = compile(&sample_fields());
        let missing = doc(json!({"_id": "abc", "login": "alice"}));
        assert!(matches!(
            contract.validate(&missing),
            Err(SchemaError::MissingRequired { field }) if field == "uid"
        ));
    }

    #[test]
    fn test_undeclared_field_rejected() {
        let (contract, _) = compile(&sample_fields());
        let extra = doc(json!({"_id": "abc", "login": "a", "uid": 1, "surprise": 1}));
        assert!(matches!(
            contract.validate(&extra),
            Err(SchemaError::UnknownField { field }) if field == "surprise"
        ));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let (contract, _) = compile(&sample_fields());
        let wrong = doc(json!({"_id": "abc", "login": 42, "uid": 1}));
        assert!(matches!(
            contract.validate(&wrong),
            Err(SchemaError::TypeMismatch { field, .. }) if field == "login"
        ));
    }

    #[test]
    fn test_int_must_fit_32_bits() {
        let (contract, _) = compile(&sample_fields());
        let too_big = doc(json!({"_id": "abc", "login": "a", "uid": 5_000_000_000i64}));
        assert!(matches!(
            contract.validate(&too_big),
            Err(SchemaError::IntOutOfRange { field }) if field == "uid"
        ));
    }

    #[test]
    fn test_float_accepts_integers() {
        let (contract, _) = compile(&sample_fields());
        let with_int_score = doc(json!({"_id": "abc", "login": "a", "uid": 1, "score": 10}));
        contract.validate(&with_int_score).unwrap();
    }

    #[test]
    fn test_array_element_type_enforced() {
        let (contract, _) = compile(&sample_fields());
        let bad_elem = doc(json!({
            "_id": "abc", "login": "a", "uid": 1, "groups": ["ops", 3]
        }));
        assert!(matches!(
            contract.validate(&bad_elem),
            Err(SchemaError::TypeMismatch { field, .. }) if field == "groups[1]"
        ));
    }

    #[test]
    fn test_null_rejected() {
        let (contract, _) = compile(&sample_fields());
        let with_null = doc(json!({"_id": "abc", "login": null, "uid": 1}));
        assert!(matches!(
            contract.validate(&with_null),
            Err(SchemaError::NullValue { field }) if field == "login"
        ));
    }
}
