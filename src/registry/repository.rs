//! Type registry: CRUD over type definitions.
//!
//! Owns the `register_type` metadata collection and the lifecycle of every
//! physical collection bound to a slug. Every mutation ends with a
//! synchronous cache invalidation for the touched slug.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use super::model::{TypeDefinition, TypePatch};
use super::provision::{id_filter, Provisioner, METADATA_COLLECTION};
use crate::cache::{CacheConfig, MetadataCache, TypeFieldLists};
use crate::engine::{Document, FindOptions, ObjectId, SortOrder, StorageEngine};
use crate::error::{Error, Result};

/// Registry of runtime-declared record types.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    engine: StorageEngine,
    provisioner: Provisioner,
    cache: Arc<MetadataCache>,
}

impl TypeRegistry {
    /// Creates a registry over the engine, bootstrapping the metadata
    /// collection when absent.
    pub fn new(engine: StorageEngine, cache_config: CacheConfig) -> Result<Self> {
        let provisioner = Provisioner::new(engine.clone());
        provisioner.ensure_metadata_collection()?;
        Ok(Self {
            engine,
            provisioner,
            cache: Arc::new(MetadataCache::new(cache_config)),
        })
    }

    /// Registers a new type and provisions its physical collection.
    pub fn create(&self, def: TypeDefinition) -> Result<TypeDefinition> {
        def.validate()?;
        let id = self.provisioner.create(&def)?;
        self.cache.invalidate(&def.slug);
        info!(slug = %def.slug, id = %id, "register type created");
        self.require_by_id(&id)
    }

    /// Looks a definition up by id.
    pub fn find_by_id(&self, id: &ObjectId) -> Result<Option<TypeDefinition>> {
        let doc = self.engine.find_one(METADATA_COLLECTION, &id_filter(id), &[])?;
        doc.map(TypeDefinition::from_document).transpose()
    }

    /// Looks a definition up by slug.
    pub fn find_by_slug(&self, slug: &str) -> Result<Option<TypeDefinition>> {
        let mut filter = Document::new();
        filter.insert("slug".to_string(), Value::String(slug.to_string()));
        let doc = self.engine.find_one(METADATA_COLLECTION, &filter, &[])?;
        doc.map(TypeDefinition::from_document).transpose()
    }

    /// All registered definitions, ordered by slug.
    pub fn list(&self) -> Result<Vec<TypeDefinition>> {
        let options = FindOptions {
            sort: vec![("slug".to_string(), SortOrder::Ascending)],
            ..Default::default()
        };
        self.engine
            .find(METADATA_COLLECTION, &Document::new(), &options)?
            .map(TypeDefinition::from_document)
            .collect()
    }

    /// Applies a patch to a definition.
    ///
    /// The whole merged candidate is re-validated, not just the supplied
    /// entries: narrowing `fields` can invalidate previously-valid
    /// unique/notify lists. A `fields` change re-provisions the collection
    /// validator after the metadata update commits.
    pub fn update(&self, id: &ObjectId, patch: TypePatch) -> Result<TypeDefinition> {
        let existing = self.require_by_id(id)?;
        let candidate = patch.apply(&existing);
        candidate.validate()?;

        let set = patch.to_set_document();
        let updated_doc = self
            .engine
            .find_one_and_update(METADATA_COLLECTION, &id_filter(id), &set, None)
            .map_err(crate::error::map_write_error)?
            .ok_or_else(|| Error::not_found(format!("register type '{id}' not found")))?;
        let updated = TypeDefinition::from_document(updated_doc)?;
        self.cache.invalidate(&updated.slug);

        if patch.touches_fields() {
            self.provisioner.alter(&updated.slug, &updated.fields)?;
        }

        info!(slug = %updated.slug, id = %id, "register type updated");
        Ok(updated)
    }

    /// Removes a definition and drops its physical collection.
    pub fn delete(&self, id: &ObjectId) -> Result<()> {
        let def = self.require_by_id(id)?;
        self.provisioner.drop_type(&def)?;
        self.cache.invalidate(&def.slug);
        info!(slug = %def.slug, id = %id, "register type deleted");
        Ok(())
    }

    /// Cache-backed unique/notify field lists for a slug.
    ///
    /// Only suitable for defaulting `notify_fields` on insert; unique-field
    /// checks on the update path must use `find_by_slug` for fresh state.
    pub fn cached_field_lists(&self, slug: &str) -> Result<TypeFieldLists> {
        if let Some(lists) = self.cache.get(slug) {
            return Ok(lists);
        }
        let def = self
            .find_by_slug(slug)?
            .ok_or_else(|| Error::not_found(format!("register type '{slug}' not found")))?;
        let lists = TypeFieldLists {
            unique_fields: def.unique_fields,
            notify_fields: def.notify_fields,
        };
        self.cache.put(slug, lists.clone());
        Ok(lists)
    }

    /// The engine handle backing this registry.
    pub fn engine(&self) -> &StorageEngine {
        &self.engine
    }

    fn require_by_id(&self, id: &ObjectId) -> Result<TypeDefinition> {
        self.find_by_id(id)?
            .ok_or_else(|| Error::not_found(format!("register type '{id}' not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, FieldType};

    fn registry() -> TypeRegistry {
        TypeRegistry::new(StorageEngine::new(), CacheConfig::default()).unwrap()
    }

    fn definition(slug: &str) -> TypeDefinition {
        TypeDefinition {
            id: ObjectId::new(),
            name: "AD User".to_string(),
            description: None,
            slug: slug.to_string(),
            fields: vec![
                FieldSpec::required("login", FieldType::Str),
                FieldSpec::optional("title", FieldType::Str),
            ],
            unique_fields: vec!["login".to_string()],
            notify_fields: vec!["title".to_string()],
        }
    }

    #[test]
    fn test_create_and_lookup() {
        let registry = registry();
        let created = registry.create(definition("ad_user")).unwrap();
        assert!(registry.engine().collection_exists("ad_user"));

        let by_slug = registry.find_by_slug("ad_user").unwrap().unwrap();
        assert_eq!(by_slug.id, created.id);
        let by_id = registry.find_by_id(&created.id).unwrap().unwrap();
        assert_eq!(by_id.slug, "ad_user");
    }

    #[test]
    fn test_duplicate_slug_conflicts() {
        let registry = registry();
        registry.create(definition("ad_user")).unwrap();
        let result = registry.create(definition("ad_user"));
        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[test]
    fn test_invalid_definition_creates_nothing() {
        let registry = registry();
        let mut def = definition("ad_user");
        def.unique_fields.push("ghost".to_string());
        assert!(matches!(registry.create(def), Err(Error::Validation(_))));
        assert!(!registry.engine().collection_exists("ad_user"));
        assert_eq!(registry.engine().count(METADATA_COLLECTION).unwrap(), 0);
    }

    #[test]
    fn test_update_rejects_broken_invariants() {
        let registry = registry();
        let created = registry.create(definition("ad_user")).unwrap();

        // Dropping 'title' would orphan notify_fields.
        let patch = TypePatch {
            fields: Some(vec![FieldSpec::required("login", FieldType::Str)]),
            ..Default::default()
        };
        assert!(matches!(
            registry.update(&created.id, patch),
            Err(Error::Validation(_))
        ));

        // Stored definition unchanged.
        let stored = registry.find_by_id(&created.id).unwrap().unwrap();
        assert_eq!(stored.fields.len(), 2);
    }

    #[test]
    fn test_update_applies_patch() {
        let registry = registry();
        let created = registry.create(definition("ad_user")).unwrap();
        let patch = TypePatch {
            name: Some("Directory User".to_string()),
            notify_fields: Some(vec![]),
            ..Default::default()
        };
        let updated = registry.update(&created.id, patch).unwrap();
        assert_eq!(updated.name, "Directory User");
        assert!(updated.notify_fields.is_empty());
        assert_eq!(updated.slug, "ad_user");
    }

    #[test]
    fn test_delete_drops_collection() {
        let registry = registry();
        let created = registry.create(definition("ad_user")).unwrap();
        registry.delete(&created.id).unwrap();
        assert!(!registry.engine().collection_exists("ad_user"));
        assert!(registry.find_by_id(&created.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_unknown_id_not_found() {
        let registry = registry();
        assert!(matches!(
            registry.delete(&ObjectId::new()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_cached_lists_follow_mutation() {
        let registry = registry();
        let created = registry.create(definition("ad_user")).unwrap();

        let lists = registry.cached_field_lists("ad_user").unwrap();
        assert_eq!(lists.notify_fields, vec!["title".to_string()]);

        // Mutation invalidates the cached entry synchronously.
        let patch = TypePatch {
            notify_fields: Some(vec!["login".to_string()]),
            ..Default::default()
        };
        registry.update(&created.id, patch).unwrap();
        let lists = registry.cached_field_lists("ad_user").unwrap();
        assert_eq!(lists.notify_fields, vec!["login".to_string()]);
    }

    #[test]
    fn test_list_sorted_by_slug() {
        let registry = registry();
        registry.create(definition("zeta")).unwrap();
        registry.create(definition("alpha")).unwrap();
        let slugs: Vec<String> = registry
            .list()
            .unwrap()
            .into_iter()
            .map(|def| def.slug)
            .collect();
        assert_eq!(slugs, vec!["alpha", "zeta"]);
    }
}
