//! Sessions: transactions over document writes.
//!
//! A session buffers document inserts and deletes; `StorageEngine::commit`
//! applies them all-or-nothing. Collection DDL (create, validator replace,
//! drop) is deliberately absent from the session API: the engine cannot
//! include DDL in a transaction, and callers must sequence it outside the
//! commit with explicit compensation.

use super::document::Document;

#[derive(Debug, Clone)]
pub(crate) enum StagedOp {
    Insert {
        collection: String,
        doc: Document,
    },
    Delete {
        collection: String,
        filter: Document,
    },
}

/// A transaction scope buffering document writes until commit.
#[derive(Debug, Default)]
pub struct Session {
    pub(crate) ops: Vec<StagedOp>,
}

impl Session {
    /// Stages a document insert.
    pub fn insert_one(&mut self, collection: impl Into<String>, doc: Document) {
        self.ops.push(StagedOp::Insert {
            collection: collection.into(),
            doc,
        });
    }

    /// Stages a single-document delete.
    pub fn delete_one(&mut self, collection: impl Into<String>, filter: Document) {
        self.ops.push(StagedOp::Delete {
            collection: collection.into(),
            filter,
        });
    }

    /// Collections this session touches.
    pub(crate) fn touched_collections(&self) -> Vec<&str> {
        self.ops
            .iter()
            .map(|op| match op {
                StagedOp::Insert { collection, .. } => collection.as_str(),
                StagedOp::Delete { collection, .. } => collection.as_str(),
            })
            .collect()
    }
}
