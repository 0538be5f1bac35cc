//! Field type system: primitive and composite field kinds, each knowing how
//! to coerce a raw BSON value and how to validate a converted one.

use std::fmt;
use std::sync::Arc;

use bson::Bson;
use chrono::Utc;

use crate::errors::{ConversionError, ValidationError};
use crate::record::Record;
use crate::schema::Schema;

/// Custom conversion hook, called instead of the built-in coercion.
pub type Converter = Arc<dyn Fn(Bson) -> Result<Bson, ConversionError> + Send + Sync>;

/// Custom validation predicate, invoked on the converted value. A `false`
/// return fails validation with the field's wire path.
pub type Validator = Arc<dyn Fn(&Bson) -> bool + Send + Sync>;

/// Lazily evaluated default producer.
pub type DefaultFn = Arc<dyn Fn() -> Bson + Send + Sync>;

/// Default attached to a field, materialized once per conversion when the
/// wire key is absent from the input.
#[derive(Clone, Default)]
pub enum FieldDefault {
    #[default]
    None,
    Value(Bson),
    Producer(DefaultFn),
}

impl FieldDefault {
    pub fn materialize(&self) -> Option<Bson> {
        match self {
            FieldDefault::None => None,
            FieldDefault::Value(value) => Some(value.clone()),
            FieldDefault::Producer(producer) => Some(producer()),
        }
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDefault::None => write!(f, "None"),
            FieldDefault::Value(value) => write!(f, "Value({value:?})"),
            FieldDefault::Producer(_) => write!(f, "Producer(..)"),
        }
    }
}

/// The catalog of field kinds a schema slot can take.
#[derive(Clone)]
pub enum FieldKind {
    String,
    Int,
    Float,
    Bool,
    Bytes,
    /// Generic mapping; contents are not typed.
    Document,
    /// Generic sequence; elements are not typed.
    List,
    DateTime,
    ObjectId,
    /// Identity conversion, no validation.
    Any,
    /// Sequence whose every element is converted/validated by the element
    /// field. Coercion is permissive per element; the first non-coercible
    /// element aborts with its dotted path.
    Array(Box<Field>),
    /// Nests another record type's schema.
    Embedded(&'static Schema),
}

impl FieldKind {
    pub(crate) fn convert(&self, raw: Bson, path: &str) -> Result<Bson, ConversionError> {
        match self {
            FieldKind::String => match raw {
                Bson::String(_) => Ok(raw),
                other => Err(mismatch(path, "a string", &other)),
            },
            FieldKind::Int => match raw {
                Bson::Int64(_) => Ok(raw),
                Bson::Int32(n) => Ok(Bson::Int64(n.into())),
                // The range guard rejects integral doubles outside i64,
                // which `as` would silently saturate. The upper bound is
                // 2^63 exactly, so `<` keeps every representable in-range
                // double and nothing above.
                Bson::Double(d)
                    if d.fract() == 0.0 && d >= i64::MIN as f64 && d < i64::MAX as f64 =>
                {
                    Ok(Bson::Int64(d as i64))
                }
                Bson::Double(d) => Err(ConversionError::new(
                    path,
                    format!("cannot represent {d} as an integer"),
                )),
                Bson::String(s) => s
                    .parse::<i64>()
                    .map(Bson::Int64)
                    .map_err(|_| ConversionError::new(path, format!("cannot parse {s:?} as an integer"))),
                other => Err(mismatch(path, "an integer", &other)),
            },
            FieldKind::Float => match raw {
                Bson::Double(_) => Ok(raw),
                Bson::Int32(n) => Ok(Bson::Double(n.into())),
                Bson::Int64(n) => Ok(Bson::Double(n as f64)),
                Bson::String(s) => s
                    .parse::<f64>()
                    .map(Bson::Double)
                    .map_err(|_| ConversionError::new(path, format!("cannot parse {s:?} as a float"))),
                other => Err(mismatch(path, "a float", &other)),
            },
            FieldKind::Bool => match raw {
                Bson::Boolean(_) => Ok(raw),
                other => Err(mismatch(path, "a boolean", &other)),
            },
            FieldKind::Bytes => match raw {
                Bson::Binary(_) => Ok(raw),
                other => Err(mismatch(path, "binary data", &other)),
            },
            FieldKind::Document => match raw {
                Bson::Document(_) => Ok(raw),
                other => Err(mismatch(path, "a document", &other)),
            },
            FieldKind::List => match raw {
                Bson::Array(_) => Ok(raw),
                other => Err(mismatch(path, "an array", &other)),
            },
            FieldKind::DateTime => match raw {
                Bson::DateTime(_) => Ok(raw),
                Bson::String(s) => chrono::DateTime::parse_from_rfc3339(&s)
                    .map(|dt| Bson::DateTime(bson::DateTime::from_chrono(dt.with_timezone(&Utc))))
                    .map_err(|_| ConversionError::new(path, format!("cannot parse {s:?} as an RFC 3339 datetime"))),
                other => Err(mismatch(path, "a datetime", &other)),
            },
            FieldKind::ObjectId => match raw {
                Bson::ObjectId(_) => Ok(raw),
                Bson::String(s) => bson::oid::ObjectId::parse_str(&s)
                    .map(Bson::ObjectId)
                    .map_err(|_| ConversionError::new(path, format!("cannot parse {s:?} as an object id"))),
                other => Err(mismatch(path, "an object id", &other)),
            },
            FieldKind::Any => Ok(raw),
            FieldKind::Array(element) => match raw {
                Bson::Array(items) => items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| element.convert_value(item, &format!("{path}.{i}")))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Bson::Array),
                other => Err(mismatch(path, "an array", &other)),
            },
            FieldKind::Embedded(schema) => match raw {
                Bson::Document(doc) => schema.convert_at(&doc, path).map(Bson::Document),
                other => Err(mismatch(path, "an embedded document", &other)),
            },
        }
    }

    pub(crate) fn validate(&self, value: &Bson, path: &str) -> Result<(), ValidationError> {
        match self {
            FieldKind::Array(element) => match value {
                Bson::Array(items) => {
                    for (i, item) in items.iter().enumerate() {
                        element.validate_value(item, &format!("{path}.{i}"))?;
                    }
                    Ok(())
                }
                _ => Err(ValidationError::new(path, "expected an array")),
            },
            FieldKind::Embedded(schema) => match value {
                Bson::Document(doc) => schema.validate_at(doc, path),
                _ => Err(ValidationError::new(path, "expected an embedded document")),
            },
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::String => write!(f, "string"),
            FieldKind::Int => write!(f, "int"),
            FieldKind::Float => write!(f, "float"),
            FieldKind::Bool => write!(f, "bool"),
            FieldKind::Bytes => write!(f, "bytes"),
            FieldKind::Document => write!(f, "document"),
            FieldKind::List => write!(f, "list"),
            FieldKind::DateTime => write!(f, "datetime"),
            FieldKind::ObjectId => write!(f, "object_id"),
            FieldKind::Any => write!(f, "any"),
            FieldKind::Array(element) => write!(f, "array<{:?}>", element.kind),
            FieldKind::Embedded(schema) => write!(f, "embedded({} fields)", schema.fields().len()),
        }
    }
}

/// One named slot in a schema.
///
/// The attribute name is the declaration name; the wire name is what appears
/// in stored documents (the attribute name unless aliased). The wire name is
/// settable once and never empty after schema finalization.
#[derive(Clone)]
pub struct Field {
    attr: String,
    wire: Option<String>,
    kind: FieldKind,
    required: bool,
    default: FieldDefault,
    converter: Option<Converter>,
    validator: Option<Validator>,
}

impl Field {
    fn new(kind: FieldKind) -> Self {
        Self {
            attr: String::new(),
            wire: None,
            kind,
            required: false,
            default: FieldDefault::None,
            converter: None,
            validator: None,
        }
    }

    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }

    pub fn int() -> Self {
        Self::new(FieldKind::Int)
    }

    pub fn float() -> Self {
        Self::new(FieldKind::Float)
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Bool)
    }

    pub fn bytes() -> Self {
        Self::new(FieldKind::Bytes)
    }

    pub fn document() -> Self {
        Self::new(FieldKind::Document)
    }

    pub fn list() -> Self {
        Self::new(FieldKind::List)
    }

    pub fn date_time() -> Self {
        Self::new(FieldKind::DateTime)
    }

    pub fn object_id() -> Self {
        Self::new(FieldKind::ObjectId)
    }

    pub fn any() -> Self {
        Self::new(FieldKind::Any)
    }

    pub fn array(element: Field) -> Self {
        Self::new(FieldKind::Array(Box::new(element)))
    }

    /// Nest another record type's schema under this slot.
    pub fn embedded<R: Record>() -> Self {
        Self::new(FieldKind::Embedded(R::schema()))
    }

    /// Preset the wire name, overriding the declaration name.
    pub fn rename(mut self, wire: impl Into<String>) -> Self {
        self.wire = Some(wire.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Bson>) -> Self {
        self.default = FieldDefault::Value(value.into());
        self
    }

    /// Lazy default, evaluated once per conversion when the key is absent.
    pub fn default_with<F>(mut self, producer: F) -> Self
    where
        F: Fn() -> Bson + Send + Sync + 'static,
    {
        self.default = FieldDefault::Producer(Arc::new(producer));
        self
    }

    /// Replace the built-in coercion with a custom conversion function.
    pub fn with_converter<F>(mut self, converter: F) -> Self
    where
        F: Fn(Bson) -> Result<Bson, ConversionError> + Send + Sync + 'static,
    {
        self.converter = Some(Arc::new(converter));
        self
    }

    /// Attach a custom predicate checked after conversion.
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Bson) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn attr_name(&self) -> &str {
        &self.attr
    }

    pub fn wire_name(&self) -> &str {
        self.wire.as_deref().unwrap_or(&self.attr)
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default(&self) -> &FieldDefault {
        &self.default
    }

    pub(crate) fn with_attr(mut self, attr: String) -> Self {
        self.attr = attr;
        self
    }

    pub(crate) fn set_wire(&mut self, wire: String) {
        self.wire = Some(wire);
    }

    pub(crate) fn set_required(&mut self) {
        self.required = true;
    }

    pub(crate) fn set_default(&mut self, default: FieldDefault) {
        self.default = default;
    }

    pub(crate) fn set_converter(&mut self, converter: Converter) {
        self.converter = Some(converter);
    }

    pub(crate) fn set_validator(&mut self, validator: Validator) {
        self.validator = Some(validator);
    }

    pub(crate) fn convert_value(&self, raw: Bson, path: &str) -> Result<Bson, ConversionError> {
        if let Some(converter) = &self.converter {
            return converter(raw).map_err(|err| err.locate(path));
        }
        self.kind.convert(raw, path)
    }

    pub(crate) fn validate_value(&self, value: &Bson, path: &str) -> Result<(), ValidationError> {
        if let Some(validator) = &self.validator
            && !validator(value)
        {
            return Err(ValidationError::new(path, "rejected by custom validator"));
        }
        self.kind.validate(value, path)
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("attr", &self.attr)
            .field("wire", &self.wire_name())
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("converter", &self.converter.is_some())
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

pub(crate) fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn mismatch(path: &str, expected: &str, got: &Bson) -> ConversionError {
    ConversionError::new(path, format!("expected {expected}, got {}", bson_kind(got)))
}

fn bson_kind(value: &Bson) -> &'static str {
    match value {
        Bson::Double(_) => "a double",
        Bson::String(_) => "a string",
        Bson::Array(_) => "an array",
        Bson::Document(_) => "a document",
        Bson::Boolean(_) => "a boolean",
        Bson::Null => "null",
        Bson::Int32(_) | Bson::Int64(_) => "an integer",
        Bson::Binary(_) => "binary data",
        Bson::ObjectId(_) => "an object id",
        Bson::DateTime(_) => "a datetime",
        _ => "an unsupported bson value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_coercion_is_permissive() {
        let kind = FieldKind::Int;
        assert_eq!(kind.convert(Bson::Int32(7), "n").unwrap(), Bson::Int64(7));
        assert_eq!(kind.convert(Bson::Double(3.0), "n").unwrap(), Bson::Int64(3));
        assert_eq!(
            kind.convert(Bson::String("42".into()), "n").unwrap(),
            Bson::Int64(42)
        );
        let err = kind.convert(Bson::Boolean(true), "n").unwrap_err();
        assert_eq!(err.field, "n");
    }

    #[test]
    fn fractional_double_is_not_an_int() {
        let err = FieldKind::Int.convert(Bson::Double(3.5), "n").unwrap_err();
        assert_eq!(err.field, "n");
    }

    #[test]
    fn out_of_range_double_is_not_an_int() {
        let kind = FieldKind::Int;
        for d in [1e300, -1e300, 9.3e18, 2f64.powi(63), f64::INFINITY, f64::NAN] {
            let err = kind.convert(Bson::Double(d), "n").unwrap_err();
            assert_eq!(err.field, "n");
        }
        // The extremes of the representable range still convert.
        assert_eq!(
            kind.convert(Bson::Double(i64::MIN as f64), "n").unwrap(),
            Bson::Int64(i64::MIN)
        );
        assert_eq!(
            kind.convert(Bson::Double(2f64.powi(62)), "n").unwrap(),
            Bson::Int64(1 << 62)
        );
    }

    #[test]
    fn datetime_accepts_rfc3339_strings() {
        let converted = FieldKind::DateTime
            .convert(Bson::String("2024-05-01T12:00:00Z".into()), "at")
            .unwrap();
        assert!(matches!(converted, Bson::DateTime(_)));

        let err = FieldKind::DateTime
            .convert(Bson::String("yesterday".into()), "at")
            .unwrap_err();
        assert_eq!(err.field, "at");
    }

    #[test]
    fn object_id_accepts_hex_strings() {
        let converted = FieldKind::ObjectId
            .convert(Bson::String("507f1f77bcf86cd799439011".into()), "id")
            .unwrap();
        assert!(matches!(converted, Bson::ObjectId(_)));
        assert!(FieldKind::ObjectId.convert(Bson::String("nope".into()), "id").is_err());
    }

    #[test]
    fn array_fails_on_first_bad_element_with_its_path() {
        let field = Field::array(Field::int());
        let raw = Bson::Array(vec![Bson::Int32(1), Bson::Boolean(true), Bson::Int32(3)]);
        let err = field.convert_value(raw, "tags").unwrap_err();
        assert_eq!(err.field, "tags.1");
    }

    #[test]
    fn custom_converter_errors_are_located() {
        let field = Field::string().with_converter(|_| Err(ConversionError::message("nope")));
        let err = field.convert_value(Bson::String("x".into()), "title").unwrap_err();
        assert_eq!(err.field, "title");
        assert_eq!(err.message, "nope");
    }

    #[test]
    fn lazy_default_runs_per_materialization() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        let default = FieldDefault::Producer(Arc::new(|| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Bson::Int64(1)
        }));
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
        default.materialize();
        default.materialize();
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
    }
}
