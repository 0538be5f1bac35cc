use thiserror::Error;

/// Top-level error type returned by documap entry points.
#[derive(Debug, Error)]
pub enum MapError {
    /// A raw value could not be coerced to its declared field type.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// A converted value violated required-ness or a custom predicate.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Persistence was attempted on a record materialized from a query
    /// result. Query results are read-only snapshots; this is a programming
    /// error, not a recoverable condition.
    #[error("record was materialized from a query result and cannot be persisted")]
    ReadOnlyRecord,

    /// The index backend reported a failure. Propagated unchanged, no retry.
    #[error("index backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Definition-time failure: the record declaration itself is malformed.
///
/// Always fatal. `Record::schema()` panics on it; `build_schema()` and
/// `SchemaBuilder::finish()` surface it as a `Result` for direct inspection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("field name cannot be empty")]
    EmptyFieldName,

    #[error("duplicate field '{0}' in schema")]
    DuplicateField(String),

    #[error("duplicate wire name '{0}' in schema")]
    DuplicateWireName(String),

    /// An alias/required/converter/validator/default override referenced an
    /// attribute that was never collected.
    #[error("'{0}' is not declared in this schema")]
    UnknownField(String),

    #[error("index specification has no keys")]
    EmptyIndex,
}

/// A raw value could not be coerced to a field's declared type.
///
/// `field` is the dotted wire path of the offending slot, e.g.
/// `user.first_name` or `tags.1`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot convert field '{field}': {message}")]
pub struct ConversionError {
    pub field: String,
    pub message: String,
}

impl ConversionError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Error with no location yet; intended for user-supplied converters.
    /// The pipeline fills in the wire path where the converter ran.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new("", message)
    }

    pub(crate) fn locate(mut self, path: &str) -> Self {
        if self.field.is_empty() {
            self.field = path.to_string();
        }
        self
    }
}

/// A converted value violated required-ness or a custom predicate.
///
/// `field` is the dotted wire path of the offending slot.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("field '{field}' failed validation: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Opaque error from the index backend collaborator.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct BackendError(Box<dyn std::error::Error + Send + Sync>);

impl BackendError {
    pub fn new(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(err.into())
    }
}
