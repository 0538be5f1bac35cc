//! End-to-end tour: declare record types, convert/validate raw documents,
//! and reconcile declared indexes against a (fake) collection.
//!
//! Run with `RUST_LOG=warn cargo run --example blog` to see the extra-data
//! warning emitted for undeclared keys.

use bson::{Bson, doc};
use documap::{
    BackendError, CanonicalIndex, Direction, ExistingIndex, Field, FieldHint, Instance,
    IndexBackend, IndexOptions, IndexSpec, Model, Record, Schema, SchemaError, sync_indexes,
    validators,
};

struct Author;

impl Record for Author {
    fn build_schema() -> Result<Schema, SchemaError> {
        Schema::builder()
            .annotated::<String>("first_name")
            .annotated::<String>("last_name")
            .annotated::<String>("email")
            .required("first_name")
            .validator("email", validators::is_valid_email)
            .finish()
    }
}

impl FieldHint for Author {
    fn field() -> Field {
        Field::embedded::<Author>()
    }
}

struct Post;

impl Record for Post {
    fn build_schema() -> Result<Schema, SchemaError> {
        Schema::builder()
            .annotated::<Author>("author")
            .annotated::<String>("title")
            .annotated::<Vec<String>>("tags")
            .annotated::<bool>("visible")
            .default_value("visible", true)
            .annotated::<bson::DateTime>("created_on")
            .default_with("created_on", || Bson::DateTime(bson::DateTime::now()))
            .required("title")
            .index(IndexSpec::field("title").unique())
            .index(IndexSpec::key("created_on", Direction::Descending))
            .index(IndexSpec::field("created_on").expire_after_seconds(86_400).name("retention"))
            .finish()
    }
}

impl Model for Post {
    const COLLECTION: &'static str = "posts";
}

/// Stand-in for the real database client's index operations.
#[derive(Default)]
struct FakeCollection {
    indexes: Vec<ExistingIndex>,
}

impl IndexBackend for FakeCollection {
    fn list_indexes(&mut self) -> Result<Vec<ExistingIndex>, BackendError> {
        Ok(self.indexes.clone())
    }

    fn create_index(&mut self, index: &CanonicalIndex) -> Result<String, BackendError> {
        self.indexes.push(ExistingIndex {
            name: index.name.clone(),
            keys: index.keys.clone(),
            options: index.options,
        });
        Ok(index.name.clone())
    }

    fn drop_index(&mut self, name: &str) -> Result<(), BackendError> {
        self.indexes.retain(|index| index.name != name);
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let post = Instance::<Post>::new(doc! {
        "author": { "first_name": "Foo", "last_name": "Bar", "email": "foo@example.com" },
        "title": "hello world",
        "tags": ["life", "art"],
        "mood": "sunny", // undeclared; warned about and passed through
    })?;

    println!("converted document: {}", post.to_json());

    for (attr, _value) in post.iter() {
        println!("attribute in schema order: {attr}");
    }

    let plan = serde_json::to_string_pretty(Post::schema().indexes())?;
    println!("declared index plan: {plan}");

    // A stale index that the declaration no longer mentions.
    let mut collection = FakeCollection {
        indexes: vec![ExistingIndex {
            name: "old_field_1".to_string(),
            keys: vec![("old_field".to_string(), Direction::Ascending)],
            options: IndexOptions::default(),
        }],
    };
    let sync = sync_indexes::<Post, _>(&mut collection)?;
    println!("dropped: {:?}, created: {:?}", sync.dropped, sync.created);

    Ok(())
}
