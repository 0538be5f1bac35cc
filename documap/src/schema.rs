//! Schema building and the conversion/validation pipeline.
//!
//! A schema is built exactly once per record type, is immutable afterward,
//! and drives both document conversion/validation and index reconciliation.

use std::collections::HashSet;
use std::fmt;

use bson::{Bson, Document};

use crate::errors::{ConversionError, MapError, SchemaError, ValidationError};
use crate::field::{Converter, Field, FieldDefault, Validator, join_path};
use crate::hint::FieldHint;
use crate::index::{CanonicalIndex, IndexSpec};

/// Policy for input keys that are not declared in the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtraDataPolicy {
    /// Warn and pass the key through unchanged (the default).
    #[default]
    Warn,
    /// Silently drop the key from the converted output.
    Drop,
}

/// Explicit configuration passed to the schema builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaConfig {
    pub extra_data: ExtraDataPolicy,
    /// When false, [`sync_indexes`] becomes a no-op for this record type.
    ///
    /// [`sync_indexes`]: crate::reconcile::sync_indexes
    pub auto_sync_indexes: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            extra_data: ExtraDataPolicy::Warn,
            auto_sync_indexes: true,
        }
    }
}

/// Per-call switches for [`Schema::clean`]. Both phases run by default;
/// either can be bypassed independently, e.g. for data just read back from
/// the database.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanOptions {
    pub bypass_conversion: bool,
    pub bypass_validation: bool,
}

/// The ordered, finalized field set of one record type.
///
/// Field order is insertion order and matters only for human-facing
/// enumeration, never for correctness.
#[derive(Debug)]
pub struct Schema {
    fields: Vec<Field>,
    indexes: Vec<CanonicalIndex>,
    config: SchemaConfig,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look up a field by attribute (declaration) name.
    pub fn field(&self, attr: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.attr_name() == attr)
    }

    /// The declared indexes, normalized to canonical `(name, keys, options)`
    /// triples.
    pub fn indexes(&self) -> &[CanonicalIndex] {
        &self.indexes
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    /// Convert a raw document into a typed one.
    ///
    /// Present wire keys are coerced through their field (a custom converter
    /// replaces the built-in coercion); absent keys with a default
    /// materialize it lazily; absent keys without one are omitted.
    /// Required-ness is enforced by [`Schema::validate`], not here. The
    /// input is never mutated, and no partial output is returned on failure.
    pub fn convert(&self, raw: &Document) -> Result<Document, ConversionError> {
        self.convert_at(raw, "")
    }

    /// Check required-ness and custom predicates on a converted document,
    /// recursing into embedded and array fields. Fails fast on the first
    /// offending field, identified by its dotted wire path.
    pub fn validate(&self, data: &Document) -> Result<(), ValidationError> {
        self.validate_at(data, "")
    }

    /// Convert then validate, with each phase independently bypassable.
    pub fn clean(&self, raw: &Document, options: CleanOptions) -> Result<Document, MapError> {
        let data = if options.bypass_conversion {
            raw.clone()
        } else {
            self.convert(raw)?
        };
        if !options.bypass_validation {
            self.validate(&data)?;
        }
        Ok(data)
    }

    pub(crate) fn convert_at(&self, raw: &Document, path: &str) -> Result<Document, ConversionError> {
        let mut out = Document::new();
        for field in &self.fields {
            let wire = field.wire_name();
            match raw.get(wire) {
                Some(value) => {
                    let converted = field.convert_value(value.clone(), &join_path(path, wire))?;
                    out.insert(wire, converted);
                }
                None => {
                    if let Some(default) = field.default().materialize() {
                        out.insert(wire, default);
                    }
                }
            }
        }
        for (key, value) in raw.iter() {
            if self.field_by_wire(key).is_none() {
                match self.config.extra_data {
                    ExtraDataPolicy::Warn => {
                        log::warn!(
                            "key '{}' is not declared in the schema; passing it through",
                            join_path(path, key)
                        );
                        out.insert(key.clone(), value.clone());
                    }
                    ExtraDataPolicy::Drop => {}
                }
            }
        }
        Ok(out)
    }

    pub(crate) fn validate_at(&self, data: &Document, path: &str) -> Result<(), ValidationError> {
        for field in &self.fields {
            let wire = field.wire_name();
            match data.get(wire) {
                Some(value) => field.validate_value(value, &join_path(path, wire))?,
                None => {
                    if field.is_required() {
                        return Err(ValidationError::new(
                            join_path(path, wire),
                            "missing required field",
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn field_by_wire(&self, wire: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.wire_name() == wire)
    }
}

/// Collects field declarations and declaration-time customizations, then
/// freezes them into a [`Schema`].
///
/// Overrides are resolved by [`finish`](SchemaBuilder::finish) in a fixed
/// order: aliases, required list, converters, validators. Each override must
/// reference an already-collected attribute name.
pub struct SchemaBuilder {
    fields: Vec<(Field, bool)>,
    aliases: Vec<(String, String)>,
    required: Vec<String>,
    defaults: Vec<(String, FieldDefault)>,
    converters: Vec<(String, Converter)>,
    validators: Vec<(String, Validator)>,
    indexes: Vec<IndexSpec>,
    config: SchemaConfig,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            aliases: Vec::new(),
            required: Vec::new(),
            defaults: Vec::new(),
            converters: Vec::new(),
            validators: Vec::new(),
            indexes: Vec::new(),
            config: SchemaConfig::default(),
        }
    }

    /// Declare an explicit field object under the given attribute name.
    pub fn field(mut self, attr: impl Into<String>, field: Field) -> Self {
        self.fields.push((field.with_attr(attr.into()), true));
        self
    }

    /// Derive a field from a type annotation via the [`FieldHint`]
    /// correspondence table.
    pub fn annotated<T: FieldHint>(mut self, attr: impl Into<String>) -> Self {
        self.fields.push((T::field().with_attr(attr.into()), false));
        self
    }

    /// Remap a field to a different wire name.
    pub fn alias(mut self, attr: impl Into<String>, wire: impl Into<String>) -> Self {
        self.aliases.push((attr.into(), wire.into()));
        self
    }

    /// Mark a collected field as required.
    pub fn required(mut self, attr: impl Into<String>) -> Self {
        self.required.push(attr.into());
        self
    }

    /// Attach a default value to a collected field.
    pub fn default_value(mut self, attr: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.defaults.push((attr.into(), FieldDefault::Value(value.into())));
        self
    }

    /// Attach a lazy default producer to a collected field.
    pub fn default_with<F>(mut self, attr: impl Into<String>, producer: F) -> Self
    where
        F: Fn() -> Bson + Send + Sync + 'static,
    {
        self.defaults
            .push((attr.into(), FieldDefault::Producer(std::sync::Arc::new(producer))));
        self
    }

    /// Replace a collected field's built-in coercion.
    pub fn converter<F>(mut self, attr: impl Into<String>, converter: F) -> Self
    where
        F: Fn(Bson) -> Result<Bson, ConversionError> + Send + Sync + 'static,
    {
        self.converters.push((attr.into(), std::sync::Arc::new(converter)));
        self
    }

    /// Attach a custom predicate to a collected field.
    pub fn validator<F>(mut self, attr: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&Bson) -> bool + Send + Sync + 'static,
    {
        self.validators.push((attr.into(), std::sync::Arc::new(validator)));
        self
    }

    /// Declare an index specification.
    pub fn index(mut self, spec: IndexSpec) -> Self {
        self.indexes.push(spec);
        self
    }

    pub fn config(mut self, config: SchemaConfig) -> Self {
        self.config = config;
        self
    }

    pub fn extra_data(mut self, policy: ExtraDataPolicy) -> Self {
        self.config.extra_data = policy;
        self
    }

    pub fn auto_sync_indexes(mut self, enabled: bool) -> Self {
        self.config.auto_sync_indexes = enabled;
        self
    }

    /// Finalize the schema: fix field order, resolve overrides, verify name
    /// uniqueness, canonicalize indexes.
    ///
    /// Mixing explicit and annotated fields warns and reorders best-effort
    /// (explicit fields first, declaration order) but does not fail.
    pub fn finish(self) -> Result<Schema, SchemaError> {
        let explicit_seen = self.fields.iter().any(|(_, explicit)| *explicit);
        let annotated_seen = self.fields.iter().any(|(_, explicit)| !*explicit);

        let mut fields: Vec<Field> = if explicit_seen && annotated_seen {
            log::warn!(
                "schema mixes explicit and annotated field declarations; \
                 field order is best-effort (explicit fields first)"
            );
            let (explicit, annotated): (Vec<_>, Vec<_>) =
                self.fields.into_iter().partition(|(_, explicit)| *explicit);
            explicit.into_iter().chain(annotated).map(|(field, _)| field).collect()
        } else {
            self.fields.into_iter().map(|(field, _)| field).collect()
        };

        let mut seen = HashSet::new();
        for field in &fields {
            if field.attr_name().is_empty() {
                return Err(SchemaError::EmptyFieldName);
            }
            if !seen.insert(field.attr_name().to_string()) {
                return Err(SchemaError::DuplicateField(field.attr_name().to_string()));
            }
        }

        for (attr, default) in self.defaults {
            lookup_mut(&mut fields, &attr)?.set_default(default);
        }
        for (attr, wire) in self.aliases {
            lookup_mut(&mut fields, &attr)?.set_wire(wire);
        }
        for attr in self.required {
            lookup_mut(&mut fields, &attr)?.set_required();
        }
        for (attr, converter) in self.converters {
            lookup_mut(&mut fields, &attr)?.set_converter(converter);
        }
        for (attr, validator) in self.validators {
            lookup_mut(&mut fields, &attr)?.set_validator(validator);
        }

        let mut wires = HashSet::new();
        for field in &fields {
            if field.wire_name().is_empty() {
                return Err(SchemaError::EmptyFieldName);
            }
            if !wires.insert(field.wire_name().to_string()) {
                return Err(SchemaError::DuplicateWireName(field.wire_name().to_string()));
            }
        }

        let mut indexes = Vec::with_capacity(self.indexes.len());
        for spec in self.indexes {
            indexes.push(spec.canonical()?);
        }

        Ok(Schema {
            fields,
            indexes,
            config: self.config,
        })
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SchemaBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaBuilder")
            .field("fields", &self.fields.len())
            .field("indexes", &self.indexes.len())
            .finish()
    }
}

fn lookup_mut<'a>(fields: &'a mut [Field], attr: &str) -> Result<&'a mut Field, SchemaError> {
    fields
        .iter_mut()
        .find(|field| field.attr_name() == attr)
        .ok_or_else(|| SchemaError::UnknownField(attr.to_string()))
}
