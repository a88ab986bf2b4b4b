//! Collection provisioning: keeping a type's metadata record and its
//! physical collection in lockstep.
//!
//! The engine can wrap metadata writes in one transaction but cannot
//! include collection DDL in it. Each protocol is therefore a saga with a
//! defined compensating action:
//! - create: metadata commit, then DDL; on DDL failure delete the orphaned
//!   metadata record and fail the request.
//! - drop: metadata commit, then drop with bounded retries; a surviving
//!   orphaned collection is reported, never silently ignored.
//! - alter: validator replace after the metadata update stands; failure is a
//!   retryable inconsistency reported to the caller.

use serde_json::Value;
use tracing::{debug, error, warn};

use super::model::TypeDefinition;
use crate::engine::{Document, IndexOrder, IndexSpec, ObjectId, StorageEngine, ID_FIELD};
use crate::error::{Error, ProvisioningStep, Result};
use crate::schema::{compile, FieldSpec};

/// Metadata collection holding type definitions.
pub const METADATA_COLLECTION: &str = "register_type";

const DROP_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub(crate) struct Provisioner {
    engine: StorageEngine,
}

impl Provisioner {
    pub(crate) fn new(engine: StorageEngine) -> Self {
        Self { engine }
    }

    /// Ensures the metadata collection exists with its unique slug index.
    pub(crate) fn ensure_metadata_collection(&self) -> Result<()> {
        if !self.engine.collection_exists(METADATA_COLLECTION) {
            self.engine.create_collection(
                METADATA_COLLECTION,
                None,
                &[IndexSpec {
                    keys: vec![("slug".to_string(), IndexOrder::Text)],
                    unique: true,
                }],
            )?;
        }
        Ok(())
    }

    /// Index specifications for a type's physical collection: one unique
    /// composite index over the sorted unique fields (text-typed keys
    /// grouped contiguously), plus the unique `(_id, history.history_id)`
    /// compound index.
    pub(crate) fn index_specs(def: &TypeDefinition) -> Vec<IndexSpec> {
        let mut specs = Vec::new();

        if !def.unique_fields.is_empty() {
            let mut keys: Vec<(String, IndexOrder)> = def
                .unique_fields
                .iter()
                .map(|name| {
                    let order = def
                        .field(name)
                        .filter(|field| field.field_type.is_text())
                        .map_or(IndexOrder::Ascending, |_| IndexOrder::Text);
                    (name.clone(), order)
                })
                .collect();
            keys.sort_by_key(|(name, order)| (*order == IndexOrder::Text, name.clone()));
            specs.push(IndexSpec { keys, unique: true });
        }

        specs.push(IndexSpec {
            keys: vec![
                (ID_FIELD.to_string(), IndexOrder::Ascending),
                ("history.history_id".to_string(), IndexOrder::Ascending),
            ],
            unique: true,
        });

        specs
    }

    /// Creation protocol: commit the metadata insert transactionally, then
    /// create the physical collection outside the transaction. A DDL
    /// failure leaves the committed metadata orphaned; the compensating
    /// action deletes it before the error is surfaced.
    pub(crate) fn create(&self, def: &TypeDefinition) -> Result<ObjectId> {
        let (contract, _) = compile(&def.fields);
        let indexes = Self::index_specs(def);

        let mut session = self.engine.start_session();
        session.insert_one(METADATA_COLLECTION, def.to_document()?);
        self.engine
            .commit(session)
            .map_err(crate::error::map_write_error)
            .map_err(|err| match err {
                Error::Conflict(_) => {
                    Error::conflict(format!("register type slug '{}' already exists", def.slug))
                }
                other => other,
            })?;

        if let Err(ddl_err) = self
            .engine
            .create_collection(&def.slug, Some(contract), &indexes)
        {
            error!(slug = %def.slug, error = %ddl_err, "collection creation failed after metadata commit, compensating");
            let filter = id_filter(&def.id);
            if let Err(cleanup_err) = self.engine.delete_one(METADATA_COLLECTION, &filter) {
                error!(slug = %def.slug, error = %cleanup_err, "compensation failed, metadata record is orphaned");
            }
            return Err(Error::provisioning(
                &def.slug,
                ProvisioningStep::Create,
                ddl_err.to_string(),
            ));
        }

        debug!(slug = %def.slug, "collection provisioned");
        Ok(def.id.clone())
    }

    /// Deletion protocol: commit the metadata delete transactionally, then
    /// drop the physical collection. The drop is idempotent, so it is
    /// retried; a collection that still survives is reported loudly.
    pub(crate) fn drop_type(&self, def: &TypeDefinition) -> Result<()> {
        let mut session = self.engine.start_session();
        session.delete_one(METADATA_COLLECTION, id_filter(&def.id));
        self.engine.commit(session)?;

        let mut last_error = None;
        for attempt in 1..=DROP_ATTEMPTS {
            match self.engine.drop_collection(&def.slug) {
                Ok(_) => {
                    debug!(slug = %def.slug, "collection dropped");
                    return Ok(());
                }
                Err(err) => {
                    warn!(slug = %def.slug, attempt, error = %err, "collection drop failed, retrying");
                    last_error = Some(err);
                }
            }
        }

        let reason = last_error
            .map(|err| err.to_string())
            .unwrap_or_else(|| "drop did not complete".to_string());
        error!(slug = %def.slug, "orphaned collection left behind after metadata delete");
        Err(Error::provisioning(
            &def.slug,
            ProvisioningStep::Drop,
            reason,
        ))
    }

    /// Alteration protocol: recompile the contract and replace the
    /// collection's validator. The caller's metadata update has already
    /// committed; failure here is a retryable inconsistency.
    pub(crate) fn alter(&self, slug: &str, fields: &[FieldSpec]) -> Result<()> {
        let (contract, _) = compile(fields);
        self.engine
            .set_validator(slug, Some(contract))
            .map_err(|err| {
                error!(slug = %slug, error = %err, "validator replace failed after metadata update, metadata and enforcement are inconsistent until retried");
                Error::provisioning(slug, ProvisioningStep::Alter, err.to_string())
            })
    }
}

pub(crate) fn id_filter(id: &ObjectId) -> Document {
    let mut filter = Document::new();
    filter.insert(ID_FIELD.to_string(), Value::from(id.clone()));
    filter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, FieldType};

    fn definition(unique: &[&str]) -> TypeDefinition {
        TypeDefinition {
            id: ObjectId::new(),
            name: "AD User".to_string(),
            description: None,
            slug: "ad_user".to_string(),
            fields: vec![
                FieldSpec::required("login", FieldType::Str),
                FieldSpec::required("uid", FieldType::Int),
                FieldSpec::optional("groups", FieldType::ListOfStr),
            ],
            unique_fields: unique.iter().map(|s| s.to_string()).collect(),
            notify_fields: vec![],
        }
    }

    #[test]
    fn test_text_keys_grouped_after_scalars() {
        let specs = Provisioner::index_specs(&definition(&["login", "uid", "groups"]));
        let composite = &specs[0];
        let orders: Vec<IndexOrder> = composite.keys.iter().map(|(_, o)| *o).collect();
        assert_eq!(
            orders,
            vec![IndexOrder::Ascending, IndexOrder::Text, IndexOrder::Text]
        );
        // Sorted by name within each group: uid, then groups/login.
        let names: Vec<&str> = composite.keys.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["uid", "groups", "login"]);
    }

    #[test]
    fn test_history_index_always_present() {
        let specs = Provisioner::index_specs(&definition(&[]));
        assert_eq!(specs.len(), 1);
        let names: Vec<&str> = specs[0].keys.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["_id", "history.history_id"]);
    }

    #[test]
    fn test_create_provisions_collection() {
        let engine = StorageEngine::new();
        let provisioner = Provisioner::new(engine.clone());
        provisioner.ensure_metadata_collection().unwrap();

        let def = definition(&["login"]);
        provisioner.create(&def).unwrap();

        assert!(engine.collection_exists("ad_user"));
        assert_eq!(engine.count(METADATA_COLLECTION).unwrap(), 1);
    }

    #[test]
    fn test_create_compensates_on_ddl_failure() {
        let engine = StorageEngine::new();
        let provisioner = Provisioner::new(engine.clone());
        provisioner.ensure_metadata_collection().unwrap();

        // An orphaned collection occupying the slug makes the DDL step fail
        // after the metadata transaction commits.
        engine.create_collection("ad_user", None, &[]).unwrap();

        let def = definition(&["login"]);
        let result = provisioner.create(&def);
        assert!(matches!(
            result,
            Err(Error::Provisioning {
                step: ProvisioningStep::Create,
                ..
            })
        ));
        // The compensating delete removed the orphaned metadata record.
        assert_eq!(engine.count(METADATA_COLLECTION).unwrap(), 0);
    }

    #[test]
    fn test_drop_removes_both_objects() {
        let engine = StorageEngine::new();
        let provisioner = Provisioner::new(engine.clone());
        provisioner.ensure_metadata_collection().unwrap();

        let def = definition(&["login"]);
        provisioner.create(&def).unwrap();
        provisioner.drop_type(&def).unwrap();

        assert!(!engine.collection_exists("ad_user"));
        assert_eq!(engine.count(METADATA_COLLECTION).unwrap(), 0);
    }
}
