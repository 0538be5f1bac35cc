//! Index reconciliation: converging a collection's live index metadata to
//! match a schema's declared index specifications.
//!
//! Runs once per record type when it is bound to a live collection. The
//! three backend calls are blocking network operations delegated verbatim;
//! failures propagate unchanged with no internal retry.

use std::collections::HashSet;

use serde::Serialize;

use crate::errors::{BackendError, MapError};
use crate::index::{CanonicalIndex, Direction, IndexOptions};
use crate::record::Record;

/// Name of the implicit primary-key index, excluded from reconciliation.
pub const PRIMARY_INDEX_NAME: &str = "_id_";

/// Live index metadata reported by the backend for one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingIndex {
    pub name: String,
    pub keys: Vec<(String, Direction)>,
    pub options: IndexOptions,
}

/// The excluded database client, seen through the only three operations the
/// reconciler needs.
pub trait IndexBackend {
    fn list_indexes(&mut self) -> Result<Vec<ExistingIndex>, BackendError>;

    /// Create an index and return its server-assigned name.
    fn create_index(&mut self, index: &CanonicalIndex) -> Result<String, BackendError>;

    fn drop_index(&mut self, name: &str) -> Result<(), BackendError>;
}

/// What a reconciliation run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexSync {
    pub dropped: Vec<String>,
    pub created: Vec<String>,
}

/// Converge the backend's indexes to the declared set with the minimal
/// create/drop operations.
///
/// Drops strictly precede creates, so redefining an index under the same
/// name never hits a transient name collision. A declared index whose live
/// TTL differs is dropped and recreated, since a TTL cannot change in place;
/// one that exists and matches is left untouched.
pub fn reconcile<B: IndexBackend + ?Sized>(
    backend: &mut B,
    declared: &[CanonicalIndex],
) -> Result<IndexSync, MapError> {
    let existing: Vec<ExistingIndex> = backend
        .list_indexes()?
        .into_iter()
        .filter(|index| index.name != PRIMARY_INDEX_NAME)
        .collect();

    let mut sync = IndexSync::default();
    let declared_names: HashSet<&str> = declared.iter().map(|index| index.name.as_str()).collect();

    for index in &existing {
        if !declared_names.contains(index.name.as_str()) {
            backend.drop_index(&index.name)?;
            sync.dropped.push(index.name.clone());
        }
    }

    let mut pending = Vec::new();
    for decl in declared {
        match existing.iter().find(|index| index.name == decl.name) {
            None => pending.push(decl),
            Some(live) if live.options.expire_after_seconds != decl.options.expire_after_seconds => {
                backend.drop_index(&decl.name)?;
                sync.dropped.push(decl.name.clone());
                pending.push(decl);
            }
            Some(_) => {}
        }
    }

    for decl in pending {
        let name = backend.create_index(decl)?;
        sync.created.push(name);
    }

    Ok(sync)
}

/// Once-per-binding entry point: reconcile the backend against `R`'s
/// declared indexes, unless the schema disabled automatic index sync.
pub fn sync_indexes<R: Record, B: IndexBackend + ?Sized>(backend: &mut B) -> Result<IndexSync, MapError> {
    let schema = R::schema();
    if !schema.config().auto_sync_indexes {
        return Ok(IndexSync::default());
    }
    reconcile(backend, schema.indexes())
}
