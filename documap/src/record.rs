//! Record types and record instances.
//!
//! A [`Record`] declares its schema once; an [`Instance`] wraps one
//! converted/validated document together with its provenance. Instances
//! materialized from query results are permanently ineligible for
//! persistence.

use std::fmt;
use std::marker::PhantomData;

use bson::{Bson, Document};

use crate::errors::{MapError, SchemaError};
use crate::field::FieldKind;
use crate::schema::{CleanOptions, Schema};

/// A declared record type. `build_schema` runs at most once per process;
/// the result is cached by the registry and immutable thereafter.
pub trait Record: Sized + 'static {
    fn build_schema() -> Result<Schema, SchemaError>;

    fn schema() -> &'static Schema {
        crate::registry::schema_of::<Self>()
    }
}

/// A record type bound to a named collection. Embedded record types
/// implement only [`Record`].
pub trait Model: Record {
    const COLLECTION: &'static str;
}

/// Where an instance came from. The only mutable instance state outside the
/// wrapped document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Built through the conversion/validation pipeline; may be persisted.
    Constructed,
    /// Materialized from a query result; read-only with respect to
    /// persistence.
    Materialized,
}

/// One converted/validated document of a record type.
pub struct Instance<R: Record> {
    data: Document,
    provenance: Provenance,
    _record: PhantomData<R>,
}

// Manual impls: record types are plain markers (`struct Post;`) and carry no
// data themselves, so `Debug`/`Clone` must not require them on `R`.
impl<R: Record> fmt::Debug for Instance<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("data", &self.data)
            .field("provenance", &self.provenance)
            .finish()
    }
}

impl<R: Record> Clone for Instance<R> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            provenance: self.provenance,
            _record: PhantomData,
        }
    }
}

impl<R: Record> Instance<R> {
    /// Construct from raw data, running conversion then validation.
    pub fn new(data: Document) -> Result<Self, MapError> {
        Self::with_options(data, CleanOptions::default())
    }

    /// Construct with either pipeline phase bypassed.
    pub fn with_options(data: Document, options: CleanOptions) -> Result<Self, MapError> {
        let data = R::schema().clean(&data, options)?;
        Ok(Self {
            data,
            provenance: Provenance::Constructed,
            _record: PhantomData,
        })
    }

    /// Wrap an already-typed document as-is, skipping the pipeline entirely.
    /// The instance is marked as materialized from a query and can never be
    /// persisted.
    pub fn from_data_unchanged(data: Document) -> Self {
        Self {
            data,
            provenance: Provenance::Materialized,
            _record: PhantomData,
        }
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn data(&self) -> &Document {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Document {
        &mut self.data
    }

    pub fn into_document(self) -> Document {
        self.data
    }

    /// The document to hand to the persistence collaborator. Fails for
    /// query-materialized instances regardless of any mutation since.
    pub fn persistable(&self) -> Result<&Document, MapError> {
        match self.provenance {
            Provenance::Constructed => Ok(&self.data),
            Provenance::Materialized => Err(MapError::ReadOnlyRecord),
        }
    }

    /// Typed view over the wrapped document.
    pub fn view(&self) -> View<'_> {
        View {
            schema: R::schema(),
            data: &self.data,
        }
    }

    /// Typed value of one attribute, resolved through its wire name.
    pub fn get(&self, attr: &str) -> Option<FieldValue<'_>> {
        self.view().get(attr)
    }

    /// Present fields in schema order, embedded sub-documents surfacing as
    /// typed sub-views.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, FieldValue<'_>)> {
        self.view().iter()
    }

    /// Relaxed extended JSON rendition of the wrapped document.
    pub fn to_extjson(&self) -> serde_json::Value {
        Bson::Document(self.data.clone()).into_relaxed_extjson()
    }

    pub fn to_json(&self) -> String {
        self.to_extjson().to_string()
    }
}

/// Typed, read-only window over a document, one accessor per declared field.
#[derive(Debug, Clone, Copy)]
pub struct View<'a> {
    schema: &'static Schema,
    data: &'a Document,
}

impl<'a> View<'a> {
    pub fn new(schema: &'static Schema, data: &'a Document) -> Self {
        Self { schema, data }
    }

    pub fn document(&self) -> &'a Document {
        self.data
    }

    pub fn get(self, attr: &str) -> Option<FieldValue<'a>> {
        let field = self.schema.field(attr)?;
        let value = self.data.get(field.wire_name())?;
        Some(match (field.kind(), value) {
            (FieldKind::Embedded(schema), Bson::Document(doc)) => FieldValue::Embedded(View {
                schema: *schema,
                data: doc,
            }),
            _ => FieldValue::Scalar(value),
        })
    }

    pub fn iter(self) -> impl Iterator<Item = (&'static str, FieldValue<'a>)> {
        self.schema
            .fields()
            .iter()
            .filter_map(move |field| self.get(field.attr_name()).map(|value| (field.attr_name(), value)))
    }
}

/// A field's value as surfaced by a typed view.
#[derive(Debug, Clone, Copy)]
pub enum FieldValue<'a> {
    Scalar(&'a Bson),
    Embedded(View<'a>),
}

impl<'a> FieldValue<'a> {
    pub fn as_bson(&self) -> Option<&'a Bson> {
        match self {
            FieldValue::Scalar(value) => Some(value),
            FieldValue::Embedded(_) => None,
        }
    }

    pub fn as_view(&self) -> Option<View<'a>> {
        match self {
            FieldValue::Embedded(view) => Some(*view),
            FieldValue::Scalar(_) => None,
        }
    }
}
