//! Process-wide schema cache keyed by record type identity.
//!
//! Schemas are built once per record type, leaked to `'static`, and never
//! torn down; after first use they are read-only for the lifetime of the
//! process.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::errors::SchemaError;
use crate::record::Record;
use crate::schema::Schema;

static SCHEMAS: OnceLock<RwLock<HashMap<TypeId, &'static Schema>>> = OnceLock::new();

fn cache() -> &'static RwLock<HashMap<TypeId, &'static Schema>> {
    SCHEMAS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Build-or-fetch the schema for `R`, surfacing a malformed declaration as
/// a [`SchemaError`] instead of panicking.
pub fn try_schema_of<R: Record>() -> Result<&'static Schema, SchemaError> {
    let key = TypeId::of::<R>();
    if let Some(schema) = cache().read().unwrap().get(&key) {
        return Ok(schema);
    }
    // No lock is held while building, so embedded record types may recurse
    // into the registry. Self-referential record types are not supported.
    let built = R::build_schema()?;
    let mut guard = cache().write().unwrap();
    Ok(*guard.entry(key).or_insert_with(|| Box::leak(Box::new(built))))
}

/// The schema for `R`. A malformed declaration is a definition-time bug and
/// panics on first use.
pub fn schema_of<R: Record>() -> &'static Schema {
    match try_schema_of::<R>() {
        Ok(schema) => schema,
        Err(err) => panic!(
            "schema declaration for {} is invalid: {err}",
            std::any::type_name::<R>()
        ),
    }
}
