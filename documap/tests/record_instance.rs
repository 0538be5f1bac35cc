//! Record instance provenance, typed views, and the persistence guard.

use bson::{Bson, doc};
use documap::{Field, FieldHint, Instance, MapError, Model, Record, Schema, SchemaError};

struct Author;

impl Record for Author {
    fn build_schema() -> Result<Schema, SchemaError> {
        Schema::builder()
            .annotated::<String>("first_name")
            .annotated::<String>("last_name")
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
            .required("title")
            .finish()
    }
}

impl Model for Post {
    const COLLECTION: &'static str = "posts";
}

fn sample() -> bson::Document {
    doc! {
        "author": { "first_name": "Foo", "last_name": "Bar" },
        "title": "hello world",
        "tags": ["life", "art"],
    }
}

#[test]
fn constructed_instances_may_be_persisted() {
    let post = Instance::<Post>::new(sample()).unwrap();
    assert_eq!(post.provenance(), documap::Provenance::Constructed);
    assert!(post.persistable().is_ok());
}

#[test]
fn construction_runs_the_full_pipeline() {
    let err = Instance::<Post>::new(doc! { "tags": ["life"] }).unwrap_err();
    assert!(matches!(err, MapError::Validation(_)));

    let err = Instance::<Post>::new(doc! { "title": "hi", "tags": [1] }).unwrap_err();
    assert!(matches!(err, MapError::Conversion(_)));
}

#[test]
fn materialized_instances_are_never_persistable() {
    let mut post = Instance::<Post>::from_data_unchanged(sample());
    assert_eq!(post.provenance(), documap::Provenance::Materialized);
    assert!(matches!(post.persistable(), Err(MapError::ReadOnlyRecord)));

    // Mutating the data afterwards does not make it persistable.
    post.data_mut().insert("title", "edited");
    assert!(matches!(post.persistable(), Err(MapError::ReadOnlyRecord)));
}

#[test]
fn materialization_bypasses_the_pipeline_entirely() {
    let post = Instance::<Post>::from_data_unchanged(doc! { "title": 42 });
    assert_eq!(post.data().get("title"), Some(&Bson::Int32(42)));
}

#[test]
fn embedded_fields_surface_as_typed_views() {
    let post = Instance::<Post>::new(sample()).unwrap();
    let author = post.get("author").unwrap().as_view().unwrap();
    assert_eq!(
        author.get("first_name").unwrap().as_bson(),
        Some(&Bson::String("Foo".into()))
    );
}

#[test]
fn iteration_follows_schema_order() {
    let post = Instance::<Post>::new(sample()).unwrap();
    let attrs: Vec<_> = post.iter().map(|(attr, _)| attr).collect();
    assert_eq!(attrs, ["author", "title", "tags"]);
}

#[test]
fn iteration_skips_absent_optional_fields() {
    let post = Instance::<Post>::new(doc! { "title": "hi" }).unwrap();
    let attrs: Vec<_> = post.iter().map(|(attr, _)| attr).collect();
    assert_eq!(attrs, ["title"]);
}

#[test]
fn json_rendition_uses_wire_names() {
    let post = Instance::<Post>::new(sample()).unwrap();
    let json = post.to_extjson();
    assert_eq!(json["title"], "hello world");
    assert_eq!(json["author"]["last_name"], "Bar");
}

#[test]
fn collection_name_is_exposed_to_the_crud_collaborator() {
    assert_eq!(Post::COLLECTION, "posts");
}

// `Post` is a plain marker with no derives of its own; `Debug` and `Clone`
// on the instance must not demand them.
#[test]
fn instances_are_debuggable_and_cloneable_for_marker_record_types() {
    let post = Instance::<Post>::new(sample()).unwrap();
    let copy = post.clone();
    assert_eq!(copy.data(), post.data());
    assert!(format!("{post:?}").contains("Constructed"));
}

#[test]
fn schemas_are_built_once_and_shared() {
    assert!(std::ptr::eq(Post::schema(), Post::schema()));
}
