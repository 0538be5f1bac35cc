//! Index specifications and canonical naming.
//!
//! A schema declares indexes in several shorthand forms; normalization turns
//! each into a canonical `(name, ordered keys, options)` triple. When no
//! explicit name is given, the canonical name is the underscore-joined
//! `field_direction` of every key component, e.g. `[("h", 1), ("i", -1)]`
//! becomes `h_1_i_-1`.

use serde::{Serialize, Serializer};

use crate::errors::SchemaError;

/// Sort direction of one index key component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn as_i32(self) -> i32 {
        match self {
            Direction::Ascending => 1,
            Direction::Descending => -1,
        }
    }
}

// Serialized as the wire-level 1 / -1 the database expects.
impl Serialize for Direction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.as_i32())
    }
}

/// Options carried by an index beyond its key list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct IndexOptions {
    pub unique: bool,
    pub sparse: bool,
    /// TTL in seconds; the database auto-deletes documents after this
    /// interval. A TTL change cannot be applied in place.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_after_seconds: Option<u64>,
}

/// One declared index, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    keys: Vec<(String, Direction)>,
    name: Option<String>,
    options: IndexOptions,
}

impl IndexSpec {
    /// Single-field ascending index.
    pub fn field(name: impl Into<String>) -> Self {
        Self::key(name, Direction::Ascending)
    }

    /// Single `(field, direction)` pair.
    pub fn key(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            keys: vec![(name.into(), direction)],
            name: None,
            options: IndexOptions::default(),
        }
    }

    /// Compound index; key order is significant.
    pub fn compound<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = (S, Direction)>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(|(name, dir)| (name.into(), dir)).collect(),
            name: None,
            options: IndexOptions::default(),
        }
    }

    /// Append another ascending key component.
    pub fn then(mut self, name: impl Into<String>) -> Self {
        self.keys.push((name.into(), Direction::Ascending));
        self
    }

    /// Append another descending key component.
    pub fn then_desc(mut self, name: impl Into<String>) -> Self {
        self.keys.push((name.into(), Direction::Descending));
        self
    }

    /// Explicit index name, replacing the generated one.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn unique(mut self) -> Self {
        self.options.unique = true;
        self
    }

    pub fn sparse(mut self) -> Self {
        self.options.sparse = true;
        self
    }

    pub fn expire_after_seconds(mut self, seconds: u64) -> Self {
        self.options.expire_after_seconds = Some(seconds);
        self
    }

    /// Normalize into the canonical `(name, keys, options)` triple.
    pub fn canonical(&self) -> Result<CanonicalIndex, SchemaError> {
        if self.keys.is_empty() {
            return Err(SchemaError::EmptyIndex);
        }
        let name = match &self.name {
            Some(name) => name.clone(),
            None => default_index_name(&self.keys),
        };
        Ok(CanonicalIndex {
            name,
            keys: self.keys.clone(),
            options: self.options,
        })
    }
}

/// A normalized index declaration, comparable against live index metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalIndex {
    pub name: String,
    pub keys: Vec<(String, Direction)>,
    pub options: IndexOptions,
}

/// `field_direction` per key component, joined by underscores.
pub fn default_index_name(keys: &[(String, Direction)]) -> String {
    keys.iter()
        .map(|(field, direction)| format!("{}_{}", field, direction.as_i32()))
        .collect::<Vec<_>>()
        .join("_")
}
