//! Type definition model and its invariants.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::engine::{Document, ObjectId};
use crate::error::{Error, Result};
use crate::schema::FieldSpec;

static SLUG_PATTERN: OnceLock<Regex> = OnceLock::new();

fn slug_pattern() -> &'static Regex {
    SLUG_PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9_]{1,32}$").unwrap_or_else(|_| unreachable!("static pattern"))
    })
}

/// Declarative description of a record type.
///
/// The slug is globally unique, immutable after creation, and doubles as the
/// name of the type's physical collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDefinition {
    /// Stored identifier
    #[serde(rename = "_id", default)]
    pub id: ObjectId,
    /// Human-readable name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Immutable identifier, `^[a-z0-9_]{1,32}$`
    pub slug: String,
    /// Ordered declared fields, names unique
    pub fields: Vec<FieldSpec>,
    /// Fields whose combined value must be unique across instances
    #[serde(default)]
    pub unique_fields: Vec<String>,
    /// Fields flagged for downstream notification
    #[serde(default)]
    pub notify_fields: Vec<String>,
}

impl TypeDefinition {
    /// Checks every cross-field invariant:
    /// slug pattern, field-name uniqueness, and that `unique_fields` and
    /// `notify_fields` only reference declared fields.
    pub fn validate(&self) -> Result<()> {
        if !slug_pattern().is_match(&self.slug) {
            return Err(Error::validation(format!(
                "invalid slug '{}': must match ^[a-z0-9_]{{1,32}}$",
                self.slug
            )));
        }

        let mut names = BTreeSet::new();
        for field in &self.fields {
            if !names.insert(field.name.as_str()) {
                return Err(Error::validation(format!(
                    "duplicate field name '{}'",
                    field.name
                )));
            }
        }

        for (list, label) in [
            (&self.unique_fields, "unique_fields"),
            (&self.notify_fields, "notify_fields"),
        ] {
            let unknown: Vec<&str> = list
                .iter()
                .map(String::as_str)
                .filter(|name| !names.contains(name))
                .collect();
            if !unknown.is_empty() {
                return Err(Error::validation(format!(
                    "{label} references unknown fields: {}",
                    unknown.join(", ")
                )));
            }
        }

        Ok(())
    }

    /// Looks up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Serializes into a stored document.
    pub fn to_document(&self) -> Result<Document> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) => Err(Error::validation(
                "type definition did not serialize to a document",
            )),
            Err(err) => Err(Error::validation(format!(
                "type definition serialization failed: {err}"
            ))),
        }
    }

    /// Deserializes from a stored document.
    pub fn from_document(doc: Document) -> Result<Self> {
        serde_json::from_value(serde_json::Value::Object(doc))
            .map_err(|err| Error::validation(format!("malformed type definition: {err}")))
    }
}

/// Partial update of a type definition.
///
/// The slug is immutable and `unique_fields` changes would require an index
/// rebuild, so neither is patchable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TypePatch {
    /// New name, if supplied
    pub name: Option<String>,
    /// New description, if supplied
    pub description: Option<String>,
    /// New notify-field list, if supplied
    pub notify_fields: Option<Vec<String>>,
    /// New field list, if supplied
    pub fields: Option<Vec<FieldSpec>>,
}

impl TypePatch {
    /// Merges the patch over an existing definition into a full candidate.
    pub fn apply(&self, existing: &TypeDefinition) -> TypeDefinition {
        let mut candidate = existing.clone();
        if let Some(name) = &self.name {
            candidate.name = name.clone();
        }
        if let Some(description) = &self.description {
            candidate.description = Some(description.clone());
        }
        if let Some(notify_fields) = &self.notify_fields {
            candidate.notify_fields = notify_fields.clone();
        }
        if let Some(fields) = &self.fields {
            candidate.fields = fields.clone();
        }
        candidate
    }

    /// Whether the patch changes the declared field list.
    pub fn touches_fields(&self) -> bool {
        self.fields.is_some()
    }

    /// The `$set` document covering only supplied entries.
    pub fn to_set_document(&self) -> Document {
        let mut set = Document::new();
        if let Some(name) = &self.name {
            set.insert("name".to_string(), name.clone().into());
        }
        if let Some(description) = &self.description {
            set.insert("description".to_string(), description.clone().into());
        }
        if let Some(notify_fields) = &self.notify_fields {
            set.insert(
                "notify_fields".to_string(),
                serde_json::to_value(notify_fields).unwrap_or_default(),
            );
        }
        if let Some(fields) = &self.fields {
            set.insert(
                "fields".to_string(),
                serde_json::to_value(fields).unwrap_or_default(),
            );
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;

    fn definition() -> TypeDefinition {
        TypeDefinition {
            id: ObjectId::new(),
            name: "AD User".to_string(),
            description: Some("Directory accounts".to_string()),
            slug: "ad_user".to_string(),
            fields: vec![
                FieldSpec::required("login", FieldType::Str),
                FieldSpec::required("uid", FieldType::Int),
                FieldSpec::optional("title", FieldType::Str),
            ],
            unique_fields: vec!["login".to_string(), "uid".to_string()],
            notify_fields: vec!["title".to_string()],
        }
    }

    #[test]
    fn test_valid_definition_passes() {
        definition().validate().unwrap();
    }

    #[test]
    fn test_slug_pattern_enforced() {
        for bad in ["", "Has-Caps", "with-dash", "x".repeat(33).as_str()] {
            let mut def = definition();
            def.slug = bad.to_string();
            assert!(def.validate().is_err(), "slug '{bad}' should be rejected");
        }
    }

    #[test]
    fn test_duplicate_field_names_rejected() {
        let mut def = definition();
        def.fields.push(FieldSpec::required("login", FieldType::Int));
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_unique_fields_must_be_declared() {
        let mut def = definition();
        def.unique_fields.push("ghost".to_string());
        let err = def.validate().unwrap_err();
        assert!(err.to_string().contains("unique_fields"));
    }

    #[test]
    fn test_notify_fields_must_be_declared() {
        let mut def = definition();
        def.notify_fields.push("ghost".to_string());
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_patch_merge_revalidates_whole_candidate() {
        // Narrowing `fields` invalidates previously-valid unique_fields.
        let def = definition();
        let patch = TypePatch {
            fields: Some(vec![FieldSpec::required("login", FieldType::Str)]),
            ..Default::default()
        };
        let candidate = patch.apply(&def);
        assert!(candidate.validate().is_err());
    }

    #[test]
    fn test_patch_set_document_covers_supplied_keys_only() {
        let patch = TypePatch {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        let set = patch.to_set_document();
        assert_eq!(set.len(), 1);
        assert!(set.contains_key("name"));
    }

    #[test]
    fn test_document_roundtrip() {
        let def = definition();
        let restored = TypeDefinition::from_document(def.to_document().unwrap()).unwrap();
        assert_eq!(def, restored);
    }
}
