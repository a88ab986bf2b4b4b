//! Embedded document storage engine.
//!
//! Named collections hold JSON documents keyed by `_id`. Each collection
//! optionally enforces a structural validator at strict level and any number
//! of unique composite indexes; violating writes are rejected by the engine
//! itself, not pre-filtered by callers.
//!
//! Transactions ([`Session`]) cover document inserts and deletes only.
//! Collection DDL — creation, validator replacement, drop — cannot join a
//! transaction; this is a hard engine constraint that the provisioning layer
//! sequences around with explicit compensation.

pub mod collection;
pub mod cursor;
pub mod document;
pub mod errors;
pub mod index;
pub mod session;

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use collection::Collection;

pub use cursor::{Cursor, FindOptions, SortOrder};
pub use document::{document_id, Document, ObjectId, ID_FIELD};
pub use errors::{EngineError, EngineResult};
pub use index::{IndexOrder, IndexSpec};
pub use session::Session;

use crate::schema::ValidationContract;

/// Process-wide storage engine handle. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct StorageEngine {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl StorageEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Collection>> {
        self.collections.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Collection>> {
        self.collections.write().unwrap_or_else(|e| e.into_inner())
    }

    // ------------------------------------------------------------------
    // DDL — never part of a session
    // ------------------------------------------------------------------

    /// Creates a collection with a validator and index set.
    pub fn create_collection(
        &self,
        name: &str,
        validator: Option<ValidationContract>,
        indexes: &[IndexSpec],
    ) -> EngineResult<()> {
        let mut collections = self.write();
        if collections.contains_key(name) {
            return Err(EngineError::CollectionExists(name.to_string()));
        }
        collections.insert(name.to_string(), Collection::new(name, validator, indexes));
        Ok(())
    }

    /// Replaces a collection's structural validator.
    pub fn set_validator(
        &self,
        name: &str,
        validator: Option<ValidationContract>,
    ) -> EngineResult<()> {
        let mut collections = self.write();
        let coll = collections
            .get_mut(name)
            .ok_or_else(|| EngineError::CollectionNotFound(name.to_string()))?;
        coll.set_validator(validator);
        Ok(())
    }

    /// Drops a collection. Returns whether it existed.
    pub fn drop_collection(&self, name: &str) -> EngineResult<bool> {
        Ok(self.write().remove(name).is_some())
    }

    /// Whether a collection exists.
    pub fn collection_exists(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Names of all collections, sorted.
    pub fn list_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of documents in a collection.
    pub fn count(&self, name: &str) -> EngineResult<usize> {
        self.read()
            .get(name)
            .map(Collection::len)
            .ok_or_else(|| EngineError::CollectionNotFound(name.to_string()))
    }

    // ------------------------------------------------------------------
    // Document operations
    // ------------------------------------------------------------------

    /// Inserts one document, returning its id.
    pub fn insert_one(&self, collection: &str, doc: Document) -> EngineResult<ObjectId> {
        let mut collections = self.write();
        collections
            .get_mut(collection)
            .ok_or_else(|| EngineError::CollectionNotFound(collection.to_string()))?
            .insert(doc)
    }

    /// Finds the first matching document, with field exclusion projection.
    pub fn find_one(
        &self,
        collection: &str,
        filter: &Document,
        exclude: &[&str],
    ) -> EngineResult<Option<Document>> {
        let collections = self.read();
        let coll = collections
            .get(collection)
            .ok_or_else(|| EngineError::CollectionNotFound(collection.to_string()))?;
        Ok(coll.find_one(filter, exclude))
    }

    /// Finds matching documents as a [`Cursor`].
    pub fn find(
        &self,
        collection: &str,
        filter: &Document,
        options: &FindOptions,
    ) -> EngineResult<Cursor> {
        let collections = self.read();
        let coll = collections
            .get(collection)
            .ok_or_else(|| EngineError::CollectionNotFound(collection.to_string()))?;
        Ok(Cursor::new(coll.find_matching(filter), options))
    }

    /// Applies `$set` plus an optional `$push` to the first matching
    /// document as one atomic step, returning the post-update image.
    pub fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Document,
        set: &Document,
        push: Option<(&str, Value)>,
    ) -> EngineResult<Option<Document>> {
        let mut collections = self.write();
        collections
            .get_mut(collection)
            .ok_or_else(|| EngineError::CollectionNotFound(collection.to_string()))?
            .update_one(filter, set, push)
    }

    /// Deletes the first matching document. Returns whether one was removed.
    pub fn delete_one(&self, collection: &str, filter: &Document) -> EngineResult<bool> {
        let mut collections = self.write();
        Ok(collections
            .get_mut(collection)
            .ok_or_else(|| EngineError::CollectionNotFound(collection.to_string()))?
            .delete_one(filter))
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Opens a transaction scope.
    pub fn start_session(&self) -> Session {
        Session::default()
    }

    /// Commits a session all-or-nothing.
    ///
    /// Touched collections are snapshotted first; any rejected write rolls
    /// every staged operation back and returns the rejection.
    pub fn commit(&self, session: Session) -> EngineResult<()> {
        use session::StagedOp;

        let mut collections = self.write();

        let mut snapshots: HashMap<String, Collection> = HashMap::new();
        for name in session.touched_collections() {
            let coll = collections
                .get(name)
                .ok_or_else(|| EngineError::CollectionNotFound(name.to_string()))?;
            snapshots
                .entry(name.to_string())
                .or_insert_with(|| coll.clone());
        }

        let mut apply = || -> EngineResult<()> {
            for op in &session.ops {
                match op {
                    StagedOp::Insert { collection, doc } => {
                        collections
                            .get_mut(collection)
                            .ok_or_else(|| {
                                EngineError::CollectionNotFound(collection.clone())
                            })?
                            .insert(doc.clone())?;
                    }
                    StagedOp::Delete { collection, filter } => {
                        collections
                            .get_mut(collection)
                            .ok_or_else(|| {
                                EngineError::CollectionNotFound(collection.clone())
                            })?
                            .delete_one(filter);
                    }
                }
            }
            Ok(())
        };

        if let Err(err) = apply() {
            for (name, snapshot) in snapshots {
                collections.insert(name, snapshot);
            }
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::index::IndexOrder;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn engine_with_indexed_collection() -> StorageEngine {
        let engine = StorageEngine::new();
        engine
            .create_collection(
                "items",
                None,
                &[IndexSpec {
                    keys: vec![("slug".to_string(), IndexOrder::Text)],
                    unique: true,
                }],
            )
            .unwrap();
        engine
    }

    #[test]
    fn test_create_and_drop_collection() {
        let engine = StorageEngine::new();
        engine.create_collection("items", None, &[]).unwrap();
        assert!(engine.collection_exists("items"));
        assert!(matches!(
            engine.create_collection("items", None, &[]),
            Err(EngineError::CollectionExists(_))
        ));
        assert!(engine.drop_collection("items").unwrap());
        assert!(!engine.collection_exists("items"));
        assert!(!engine.drop_collection("items").unwrap());
    }

    #[test]
    fn test_unknown_collection_reported() {
        let engine = StorageEngine::new();
        let result = engine.find_one("missing", &Document::new(), &[]);
        assert!(matches!(result, Err(EngineError::CollectionNotFound(_))));
    }

    #[test]
    fn test_commit_is_atomic_on_duplicate() {
        let engine = engine_with_indexed_collection();
        engine
            .insert_one("items", doc(json!({"slug": "taken"})))
            .unwrap();

        let mut session = engine.start_session();
        session.insert_one("items", doc(json!({"slug": "fresh"})));
        session.insert_one("items", doc(json!({"slug": "taken"})));

        let result = engine.commit(session);
        assert!(matches!(result, Err(EngineError::DuplicateKey { .. })));

        // The first staged insert must have been rolled back too.
        assert_eq!(engine.count("items").unwrap(), 1);
        let fresh = engine
            .find_one("items", &doc(json!({"slug": "fresh"})), &[])
            .unwrap();
        assert!(fresh.is_none());
    }

    #[test]
    fn test_commit_applies_all_ops() {
        let engine = engine_with_indexed_collection();
        let mut session = engine.start_session();
        session.insert_one("items", doc(json!({"slug": "a"})));
        session.insert_one("items", doc(json!({"slug": "b"})));
        engine.commit(session).unwrap();
        assert_eq!(engine.count("items").unwrap(), 2);
    }

    #[test]
    fn test_find_with_options() {
        let engine = engine_with_indexed_collection();
        for slug in ["c", "a", "b"] {
            engine
                .insert_one("items", doc(json!({"slug": slug})))
                .unwrap();
        }
        let options = FindOptions {
            sort: vec![("slug".to_string(), SortOrder::Ascending)],
            ..Default::default()
        };
        let slugs: Vec<String> = engine
            .find("items", &Document::new(), &options)
            .unwrap()
            .map(|d| d["slug"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(slugs, vec!["a", "b", "c"]);
    }
}
