//! Instance and history record models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::{Document, ObjectId};
use crate::error::{Error, Result};

/// One immutable snapshot of an instance's state at a point in time.
///
/// Records are only ever appended to an instance's history; they are never
/// mutated or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Unique record identifier
    pub history_id: ObjectId,
    /// Creation timestamp, immutable
    pub history_datetime: DateTime<Utc>,
    /// Notify fields as of this moment
    #[serde(default)]
    pub notify_fields: Vec<String>,
    /// Deactivation flag as of this moment
    #[serde(default)]
    pub is_deactivated: bool,
    /// Full user-field snapshot as of this moment
    #[serde(flatten)]
    pub fields: Document,
}

impl HistoryRecord {
    /// Builds a snapshot with a fresh id and timestamp.
    pub fn snapshot(
        fields: Document,
        notify_fields: Vec<String>,
        is_deactivated: bool,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            history_id: ObjectId::new(),
            history_datetime: at,
            notify_fields,
            is_deactivated,
            fields,
        }
    }

    /// Serializes into the embedded array-element form.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// A stored instance of a registered type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// Stored identifier
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Fields flagged for downstream notification
    #[serde(default)]
    pub notify_fields: Vec<String>,
    /// Soft-deactivation flag
    #[serde(default)]
    pub is_deactivated: bool,
    /// Append-only history log; excluded from most external projections
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryRecord>,
    /// Declared user fields
    #[serde(flatten)]
    pub fields: Document,
}

impl Instance {
    /// Deserializes from a stored document.
    pub fn from_document(doc: Document) -> Result<Self> {
        serde_json::from_value(serde_json::Value::Object(doc))
            .map_err(|err| Error::validation(format!("malformed instance document: {err}")))
    }
}

/// Input for instance creation.
///
/// `notify_fields` defaults to the owning type's list when omitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewInstance {
    /// Caller-supplied notify fields, if any
    #[serde(default)]
    pub notify_fields: Option<Vec<String>>,
    /// Initial deactivation state
    #[serde(default)]
    pub is_deactivated: bool,
    /// Declared user fields
    #[serde(flatten)]
    pub fields: Document,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_instance_splits_reserved_keys() {
        let new: NewInstance = serde_json::from_value(json!({
            "login": "alice",
            "uid": 7,
            "notify_fields": ["login"]
        }))
        .unwrap();
        assert_eq!(new.notify_fields, Some(vec!["login".to_string()]));
        assert_eq!(new.fields.len(), 2);
        assert!(!new.is_deactivated);
    }

    #[test]
    fn test_instance_document_roundtrip() {
        let doc = json!({
            "_id": "0123456789abcdef0123456789abcdef",
            "login": "alice",
            "notify_fields": ["login"],
            "is_deactivated": false,
            "history": [{
                "history_id": "fedcba9876543210fedcba9876543210",
                "history_datetime": "2024-05-01T10:00:00Z",
                "notify_fields": ["login"],
                "is_deactivated": false,
                "login": "alice"
            }]
        });
        let instance = Instance::from_document(doc.as_object().cloned().unwrap()).unwrap();
        assert_eq!(instance.fields["login"], json!("alice"));
        assert_eq!(instance.history.len(), 1);
        assert_eq!(instance.history[0].fields["login"], json!("alice"));
    }

    #[test]
    fn test_history_excluded_from_serialization_when_empty() {
        let instance = Instance {
            id: ObjectId::new(),
            notify_fields: vec![],
            is_deactivated: false,
            history: vec![],
            fields: Document::new(),
        };
        let value = serde_json::to_value(&instance).unwrap();
        assert!(value.get("history").is_none());
    }
}
