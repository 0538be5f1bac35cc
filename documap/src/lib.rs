//! documap core library.
//!
//! A declarative schema layer over a document-oriented database client:
//! declare a record shape once and the layer derives, from that single
//! declaration, a conversion/validation pipeline for untyped BSON documents
//! and a reconciliation procedure that keeps the collection's named indexes
//! in sync with the declaration.
//!
//! The database client itself stays outside this crate; the reconciler
//! reaches it through the [`IndexBackend`] trait, and the CRUD wrapper
//! consumes [`Schema::convert`], [`Schema::validate`],
//! [`Instance::from_data_unchanged`] and [`Schema::indexes`].
//!
//! # Example
//!
//! ```
//! use bson::doc;
//! use documap::{Field, FieldHint, Instance, Model, Record, Schema, SchemaError};
//!
//! struct User;
//!
//! impl Record for User {
//!     fn build_schema() -> Result<Schema, SchemaError> {
//!         Schema::builder()
//!             .annotated::<String>("first_name")
//!             .annotated::<String>("last_name")
//!             .required("first_name")
//!             .finish()
//!     }
//! }
//!
//! // Lets `User` appear in other declarations as an embedded annotation.
//! impl FieldHint for User {
//!     fn field() -> Field {
//!         Field::embedded::<User>()
//!     }
//! }
//!
//! struct Post;
//!
//! impl Record for Post {
//!     fn build_schema() -> Result<Schema, SchemaError> {
//!         Schema::builder()
//!             .annotated::<User>("user")
//!             .annotated::<String>("title")
//!             .annotated::<Vec<String>>("tags")
//!             .annotated::<bool>("visible")
//!             .default_value("visible", true)
//!             .required("title")
//!             .finish()
//!     }
//! }
//!
//! impl Model for Post {
//!     const COLLECTION: &'static str = "posts";
//! }
//!
//! let post = Instance::<Post>::new(doc! {
//!     "user": { "first_name": "Foo", "last_name": "Bar" },
//!     "title": "hello world",
//!     "tags": ["life", "art"],
//! })?;
//! assert!(post.persistable().is_ok());
//! assert_eq!(post.data().get("visible"), Some(&bson::Bson::Boolean(true)));
//! # Ok::<(), documap::MapError>(())
//! ```

pub mod errors;
pub mod field;
pub mod hint;
pub mod index;
pub mod reconcile;
pub mod record;
pub mod registry;
pub mod schema;
pub mod validators;

pub use errors::{BackendError, ConversionError, MapError, SchemaError, ValidationError};
pub use field::{Converter, Field, FieldDefault, FieldKind, Validator};
pub use hint::FieldHint;
pub use index::{CanonicalIndex, Direction, IndexOptions, IndexSpec, default_index_name};
pub use reconcile::{
    ExistingIndex, IndexBackend, IndexSync, PRIMARY_INDEX_NAME, reconcile, sync_indexes,
};
pub use record::{FieldValue, Instance, Model, Provenance, Record, View};
pub use schema::{CleanOptions, ExtraDataPolicy, Schema, SchemaBuilder, SchemaConfig};

// Re-export bson so users don't need to depend on a specific bson version.
pub use bson;
