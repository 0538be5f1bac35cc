//! Static correspondence between Rust types and field constructors.
//!
//! The schema builder consults this table through [`SchemaBuilder::annotated`]
//! (`.annotated::<Vec<String>>("tags")`). A type with no mapping simply does
//! not implement [`FieldHint`], so an unmappable annotation is rejected at
//! compile time rather than at run time. Embedded record types opt in with a
//! one-line impl delegating to [`Field::embedded`].
//!
//! [`SchemaBuilder::annotated`]: crate::schema::SchemaBuilder::annotated

use bson::{Bson, Document, oid::ObjectId};
use chrono::Utc;

use crate::field::Field;

/// Maps a Rust type to the field kind that represents it in a schema.
pub trait FieldHint {
    fn field() -> Field;
}

impl FieldHint for String {
    fn field() -> Field {
        Field::string()
    }
}

impl FieldHint for i32 {
    fn field() -> Field {
        Field::int()
    }
}

impl FieldHint for i64 {
    fn field() -> Field {
        Field::int()
    }
}

impl FieldHint for f64 {
    fn field() -> Field {
        Field::float()
    }
}

impl FieldHint for bool {
    fn field() -> Field {
        Field::boolean()
    }
}

impl FieldHint for bson::Binary {
    fn field() -> Field {
        Field::bytes()
    }
}

impl FieldHint for Document {
    fn field() -> Field {
        Field::document()
    }
}

impl FieldHint for bson::DateTime {
    fn field() -> Field {
        Field::date_time()
    }
}

impl FieldHint for chrono::DateTime<Utc> {
    fn field() -> Field {
        Field::date_time()
    }
}

impl FieldHint for ObjectId {
    fn field() -> Field {
        Field::object_id()
    }
}

/// The untyped-any hint: identity conversion, no validation.
impl FieldHint for Bson {
    fn field() -> Field {
        Field::any()
    }
}

/// A typed array whose elements are converted and validated individually.
/// `Vec<Bson>` yields an array of `Any` elements, which behaves like the
/// untyped sequence; `Field::list()` remains available for declaring one
/// explicitly.
impl<T: FieldHint> FieldHint for Vec<T> {
    fn field() -> Field {
        Field::array(T::field())
    }
}

/// Optionality is the default in a schema; `Option<T>` maps to the same
/// field as `T`. Required-ness is declared separately.
impl<T: FieldHint> FieldHint for Option<T> {
    fn field() -> Field {
        T::field()
    }
}
