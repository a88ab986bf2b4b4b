//! Versioned object store: instance CRUD for registered types.
//!
//! Every mutation appends exactly one immutable [`HistoryRecord`] to the
//! instance's history log; history length is monotonically non-decreasing.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use super::model::{HistoryRecord, Instance, NewInstance};
use crate::engine::{
    document_id, Cursor, Document, EngineError, FindOptions, ObjectId, StorageEngine, ID_FIELD,
};
use crate::error::{map_write_error, Error, Result};
use crate::registry::TypeRegistry;

/// Fields callers may not write directly.
const RESERVED_FIELDS: [&str; 2] = [ID_FIELD, "history"];

/// Store for instances of registered types. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    engine: StorageEngine,
    registry: Arc<TypeRegistry>,
}

impl ObjectStore {
    /// Creates a store over the engine, consulting the registry for type
    /// metadata.
    pub fn new(engine: StorageEngine, registry: Arc<TypeRegistry>) -> Self {
        Self { engine, registry }
    }

    /// Inserts an instance into a type's collection.
    ///
    /// When the caller omits `notify_fields`, the owning type's list is
    /// defaulted in via the metadata cache. The stored document carries one
    /// history record snapshotting the initial state. A duplicate
    /// unique-field combination is rejected by the collection's unique
    /// index and surfaces as a conflict.
    pub fn insert_one(&self, slug: &str, new: NewInstance) -> Result<Instance> {
        reject_reserved(&new.fields)?;

        let notify_fields = match new.notify_fields {
            Some(fields) => fields,
            None => self.registry.cached_field_lists(slug)?.notify_fields,
        };

        let record = HistoryRecord::snapshot(
            new.fields.clone(),
            notify_fields.clone(),
            new.is_deactivated,
            Utc::now(),
        );

        let mut doc = new.fields;
        doc.insert(
            "notify_fields".to_string(),
            serde_json::to_value(&notify_fields).unwrap_or_default(),
        );
        doc.insert("is_deactivated".to_string(), Value::Bool(new.is_deactivated));
        doc.insert("history".to_string(), Value::Array(vec![record.to_value()]));

        let id = self
            .engine
            .insert_one(slug, doc)
            .map_err(|err| map_store_error(slug, err))?;

        debug!(slug = %slug, object_id = %id, "instance inserted");
        self.require_by_id(slug, &id, &["history"])
    }

    /// Direct lookup by id, with optional field exclusion (`history` is the
    /// usual candidate for lightweight reads).
    pub fn find_one_by_id(
        &self,
        slug: &str,
        id: &ObjectId,
        exclude: &[&str],
    ) -> Result<Option<Instance>> {
        let doc = self
            .engine
            .find_one(slug, &id_filter(id), exclude)
            .map_err(|err| map_store_error(slug, err))?;
        doc.map(Instance::from_document).transpose()
    }

    /// Matching instances as a finite, non-restartable sequence.
    ///
    /// A stored document that no longer deserializes is skipped with a
    /// warning rather than aborting the whole listing.
    pub fn find(
        &self,
        slug: &str,
        filter: &Document,
        options: &FindOptions,
    ) -> Result<impl Iterator<Item = Instance>> {
        let cursor: Cursor = self
            .engine
            .find(slug, filter, options)
            .map_err(|err| map_store_error(slug, err))?;
        let slug = slug.to_string();
        Ok(cursor.filter_map(move |doc| {
            let object_id = document_id(&doc).map(str::to_string);
            match Instance::from_document(doc) {
                Ok(instance) => Some(instance),
                Err(err) => {
                    warn!(slug = %slug, object_id = ?object_id, error = %err, "skipping malformed stored document");
                    None
                }
            }
        }))
    }

    /// Applies a patch to an instance's user fields, appending one history
    /// record snapshotting the post-update state.
    ///
    /// Fields listed in the owning type's `unique_fields` may not be
    /// patched; that check always reads current type metadata, never the
    /// cache. The `$set` and `$push` are applied as one atomic step, but
    /// the preceding read is not part of it: two concurrent updates can
    /// both read the same prior state, and the later writer's field values
    /// win. History is additive and never loses a record. This relaxed
    /// guarantee is deliberate and mirrors the engine's capabilities.
    pub fn update_one(&self, slug: &str, id: &ObjectId, patch: Document) -> Result<Instance> {
        reject_reserved(&patch)?;

        let existing = self.require_by_id(slug, id, &["history"])?;

        // Fresh metadata, not the cache: a stale unique-field list could
        // silently permit or forbid the wrong updates.
        let def = self
            .registry
            .find_by_slug(slug)?
            .ok_or_else(|| Error::not_found(format!("register type '{slug}' not found")))?;
        if patch.keys().any(|key| def.unique_fields.iter().any(|f| f == key)) {
            return Err(Error::validation("unique fields cannot be updated"));
        }

        let record = merged_snapshot(&existing, &patch);
        let updated_doc = self
            .engine
            .find_one_and_update(slug, &id_filter(id), &patch, Some(("history", record.to_value())))
            .map_err(|err| map_store_error(slug, err))?
            .ok_or_else(|| Error::not_found(format!("object '{id}' not found in '{slug}'")))?;

        debug!(slug = %slug, object_id = %id, "instance updated");
        let mut projected = updated_doc;
        projected.remove("history");
        Instance::from_document(projected)
    }

    /// Marks an instance deactivated. One more history record is appended
    /// even when the flag was already set.
    pub fn deactivate(&self, slug: &str, id: &ObjectId) -> Result<Instance> {
        let mut patch = Document::new();
        patch.insert("is_deactivated".to_string(), Value::Bool(true));
        self.update_one(slug, id, patch)
    }

    /// Fetches one history record of an instance by its id.
    pub fn get_history_record(
        &self,
        slug: &str,
        id: &ObjectId,
        history_id: &ObjectId,
    ) -> Result<HistoryRecord> {
        let doc = self
            .engine
            .find_one(slug, &id_filter(id), &[])
            .map_err(|err| map_store_error(slug, err))?
            .ok_or_else(|| Error::not_found(format!("object '{id}' not found in '{slug}'")))?;

        let instance = Instance::from_document(doc)?;
        instance
            .history
            .into_iter()
            .find(|record| &record.history_id == history_id)
            .ok_or_else(|| {
                Error::not_found(format!("history record '{history_id}' not found on '{id}'"))
            })
    }

    /// Hard-deletes an instance. Not a history event. Returns whether a
    /// document was actually removed.
    pub fn delete_one_by_id(&self, slug: &str, id: &ObjectId) -> Result<bool> {
        let removed = self
            .engine
            .delete_one(slug, &id_filter(id))
            .map_err(|err| map_store_error(slug, err))?;
        if removed {
            debug!(slug = %slug, object_id = %id, "instance deleted");
        }
        Ok(removed)
    }

    fn require_by_id(&self, slug: &str, id: &ObjectId, exclude: &[&str]) -> Result<Instance> {
        self.find_one_by_id(slug, id, exclude)?
            .ok_or_else(|| Error::not_found(format!("object '{id}' not found in '{slug}'")))
    }
}

/// Builds the post-update snapshot from the existing projection and a patch.
fn merged_snapshot(existing: &Instance, patch: &Document) -> HistoryRecord {
    let mut fields = existing.fields.clone();
    let mut notify_fields = existing.notify_fields.clone();
    let mut is_deactivated = existing.is_deactivated;

    for (key, value) in patch {
        match key.as_str() {
            "notify_fields" => {
                notify_fields = serde_json::from_value(value.clone()).unwrap_or(notify_fields);
            }
            "is_deactivated" => {
                is_deactivated = value.as_bool().unwrap_or(is_deactivated);
            }
            _ => {
                fields.insert(key.clone(), value.clone());
            }
        }
    }

    HistoryRecord::snapshot(fields, notify_fields, is_deactivated, Utc::now())
}

fn id_filter(id: &ObjectId) -> Document {
    let mut filter = Document::new();
    filter.insert(ID_FIELD.to_string(), Value::from(id.clone()));
    filter
}

fn reject_reserved(doc: &Document) -> Result<()> {
    for field in RESERVED_FIELDS {
        if doc.contains_key(field) {
            return Err(Error::validation(format!(
                "field '{field}' cannot be written directly"
            )));
        }
    }
    Ok(())
}

fn map_store_error(slug: &str, err: EngineError) -> Error {
    match err {
        EngineError::CollectionNotFound(_) => {
            Error::not_found(format!("register type '{slug}' not found"))
        }
        other => map_write_error(other),
    }
}
