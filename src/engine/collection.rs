//! A single named collection: documents, structural validator, unique indexes.
//!
//! All mutation goes through the engine's write lock; methods here assume
//! exclusive access. The validator runs at strict level: every insert and
//! every post-update document image is checked before anything is stored.

use std::collections::BTreeMap;

use serde_json::Value;

use super::document::{document_id, Document, ObjectId, ID_FIELD};
use super::errors::{EngineError, EngineResult};
use super::index::{IndexSpec, UniqueIndex};
use crate::schema::ValidationContract;

#[derive(Debug, Clone)]
pub(crate) struct Collection {
    name: String,
    validator: Option<ValidationContract>,
    indexes: Vec<UniqueIndex>,
    docs: BTreeMap<String, Document>,
}

impl Collection {
    pub(crate) fn new(
        name: impl Into<String>,
        validator: Option<ValidationContract>,
        specs: &[IndexSpec],
    ) -> Self {
        Self {
            name: name.into(),
            validator,
            indexes: specs
                .iter()
                .filter(|spec| spec.unique)
                .map(UniqueIndex::from_spec)
                .collect(),
            docs: BTreeMap::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.docs.len()
    }

    /// Replaces the structural validator. Existing documents are not
    /// re-checked; the new contract applies to subsequent writes.
    pub(crate) fn set_validator(&mut self, validator: Option<ValidationContract>) {
        self.validator = validator;
    }

    fn check_validator(&self, doc: &Document) -> EngineResult<()> {
        if let Some(contract) = &self.validator {
            contract
                .validate(doc)
                .map_err(|err| EngineError::DocumentRejected {
                    collection: self.name.clone(),
                    reason: err.to_string(),
                })?;
        }
        Ok(())
    }

    fn check_indexes(&self, doc: &Document, doc_id: &str) -> EngineResult<()> {
        for index in &self.indexes {
            index.check(doc, doc_id, &self.name)?;
        }
        Ok(())
    }

    /// Inserts a document, assigning a fresh `_id` when absent.
    pub(crate) fn insert(&mut self, mut doc: Document) -> EngineResult<ObjectId> {
        let id = match document_id(&doc) {
            Some(existing) => existing.to_string(),
            None => {
                let generated = ObjectId::new();
                doc.insert(ID_FIELD.to_string(), Value::from(generated.clone()));
                generated.to_string()
            }
        };

        if self.docs.contains_key(&id) {
            return Err(EngineError::DuplicateKey {
                collection: self.name.clone(),
                index: "_id_1".to_string(),
            });
        }

        self.check_validator(&doc)?;
        self.check_indexes(&doc, &id)?;

        for index in &mut self.indexes {
            index.insert(&doc, &id);
        }
        self.docs.insert(id.clone(), doc);

        // Parse never fails: the id either came from ObjectId::new or was
        // present as a string on the way in.
        ObjectId::parse(&id).ok_or_else(|| EngineError::DocumentRejected {
            collection: self.name.clone(),
            reason: format!("malformed _id '{id}'"),
        })
    }

    pub(crate) fn find_one(&self, filter: &Document, exclude: &[&str]) -> Option<Document> {
        self.docs
            .values()
            .find(|doc| matches(doc, filter))
            .map(|doc| project(doc, exclude))
    }

    pub(crate) fn find_matching(&self, filter: &Document) -> Vec<Document> {
        self.docs
            .values()
            .filter(|doc| matches(doc, filter))
            .cloned()
            .collect()
    }

    /// Applies `$set` assignments plus an optional `$push` append to the
    /// first matching document, as one atomic step. The post-update image
    /// must pass the validator and every unique index, otherwise nothing
    /// changes. Returns the post-update image.
    pub(crate) fn update_one(
        &mut self,
        filter: &Document,
        set: &Document,
        push: Option<(&str, Value)>,
    ) -> EngineResult<Option<Document>> {
        let Some(id) = self
            .docs
            .values()
            .find(|doc| matches(doc, filter))
            .and_then(document_id)
            .map(str::to_string)
        else {
            return Ok(None);
        };

        let previous = self.docs[&id].clone();
        let mut candidate = previous.clone();
        for (key, value) in set {
            candidate.insert(key.clone(), value.clone());
        }
        if let Some((field, value)) = push {
            match candidate.get_mut(field) {
                Some(Value::Array(items)) => items.push(value),
                _ => {
                    candidate.insert(field.to_string(), Value::Array(vec![value]));
                }
            }
        }

        self.check_validator(&candidate)?;
        self.check_indexes(&candidate, &id)?;

        for index in &mut self.indexes {
            index.remove(&previous, &id);
            index.insert(&candidate, &id);
        }
        self.docs.insert(id, candidate.clone());

        Ok(Some(candidate))
    }

    pub(crate) fn delete_one(&mut self, filter: &Document) -> bool {
        let Some(id) = self
            .docs
            .values()
            .find(|doc| matches(doc, filter))
            .and_then(document_id)
            .map(str::to_string)
        else {
            return false;
        };

        if let Some(doc) = self.docs.remove(&id) {
            for index in &mut self.indexes {
                index.remove(&doc, &id);
            }
            true
        } else {
            false
        }
    }
}

/// Top-level equality match.
pub(crate) fn matches(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, value)| doc.get(key) == Some(value))
}

/// Clones a document with the named fields removed.
pub(crate) fn project(doc: &Document, exclude: &[&str]) -> Document {
    let mut out = doc.clone();
    for field in exclude {
        out.remove(*field);
    }
    out
}
