//! Index reconciliation against an in-memory fake backend.

use documap::{
    BackendError, CanonicalIndex, Direction, ExistingIndex, IndexBackend, IndexOptions, IndexSpec,
    Record, Schema, SchemaError, reconcile, sync_indexes,
};

#[derive(Default)]
struct FakeBackend {
    indexes: Vec<ExistingIndex>,
    calls: Vec<String>,
}

impl FakeBackend {
    fn with_indexes(indexes: Vec<ExistingIndex>) -> Self {
        Self {
            indexes,
            calls: Vec::new(),
        }
    }

    fn index(&self, name: &str) -> Option<&ExistingIndex> {
        self.indexes.iter().find(|index| index.name == name)
    }
}

impl IndexBackend for FakeBackend {
    fn list_indexes(&mut self) -> Result<Vec<ExistingIndex>, BackendError> {
        self.calls.push("list".to_string());
        Ok(self.indexes.clone())
    }

    fn create_index(&mut self, index: &CanonicalIndex) -> Result<String, BackendError> {
        self.calls.push(format!("create {}", index.name));
        self.indexes.push(ExistingIndex {
            name: index.name.clone(),
            keys: index.keys.clone(),
            options: index.options,
        });
        Ok(index.name.clone())
    }

    fn drop_index(&mut self, name: &str) -> Result<(), BackendError> {
        self.calls.push(format!("drop {name}"));
        self.indexes.retain(|index| index.name != name);
        Ok(())
    }
}

fn primary() -> ExistingIndex {
    ExistingIndex {
        name: "_id_".to_string(),
        keys: vec![("_id".to_string(), Direction::Ascending)],
        options: IndexOptions::default(),
    }
}

fn ascending(name: &str) -> ExistingIndex {
    ExistingIndex {
        name: format!("{name}_1"),
        keys: vec![(name.to_string(), Direction::Ascending)],
        options: IndexOptions::default(),
    }
}

fn canonical(spec: IndexSpec) -> CanonicalIndex {
    spec.canonical().unwrap()
}

#[test]
fn stale_indexes_are_dropped_and_declared_ones_created() {
    let mut backend = FakeBackend::with_indexes(vec![primary(), ascending("a")]);
    let declared = [canonical(IndexSpec::field("b"))];

    let sync = reconcile(&mut backend, &declared).unwrap();

    assert_eq!(sync.dropped, ["a_1"]);
    assert_eq!(sync.created, ["b_1"]);
    assert!(backend.index("a_1").is_none());
    assert!(backend.index("b_1").is_some());
    // The implicit primary-key index is never touched.
    assert!(backend.index("_id_").is_some());
}

#[test]
fn matching_indexes_are_left_untouched() {
    let mut backend = FakeBackend::with_indexes(vec![primary(), ascending("a")]);
    let declared = [canonical(IndexSpec::field("a"))];

    let sync = reconcile(&mut backend, &declared).unwrap();

    assert!(sync.dropped.is_empty());
    assert!(sync.created.is_empty());
    assert_eq!(backend.calls, ["list"]);
}

#[test]
fn ttl_change_drops_and_recreates_the_index() {
    let mut backend = FakeBackend::with_indexes(vec![
        primary(),
        ExistingIndex {
            name: "expires_at_1".to_string(),
            keys: vec![("expires_at".to_string(), Direction::Ascending)],
            options: IndexOptions {
                expire_after_seconds: Some(2400),
                ..Default::default()
            },
        },
    ]);
    let declared = [canonical(IndexSpec::field("expires_at").expire_after_seconds(3600))];

    let sync = reconcile(&mut backend, &declared).unwrap();

    assert_eq!(sync.dropped, ["expires_at_1"]);
    assert_eq!(sync.created, ["expires_at_1"]);
    assert_eq!(
        backend.index("expires_at_1").unwrap().options.expire_after_seconds,
        Some(3600)
    );
}

#[test]
fn drops_always_precede_creates() {
    let mut backend = FakeBackend::with_indexes(vec![
        ascending("stale"),
        ExistingIndex {
            name: "expires_at_1".to_string(),
            keys: vec![("expires_at".to_string(), Direction::Ascending)],
            options: IndexOptions {
                expire_after_seconds: Some(2400),
                ..Default::default()
            },
        },
    ]);
    let declared = [
        canonical(IndexSpec::field("expires_at").expire_after_seconds(3600)),
        canonical(IndexSpec::field("b")),
    ];

    reconcile(&mut backend, &declared).unwrap();

    assert_eq!(
        backend.calls,
        [
            "list",
            "drop stale_1",
            "drop expires_at_1",
            "create expires_at_1",
            "create b_1",
        ]
    );
}

struct Session;

impl Record for Session {
    fn build_schema() -> Result<Schema, SchemaError> {
        Schema::builder()
            .annotated::<String>("token")
            .annotated::<bson::DateTime>("expires_at")
            .index(IndexSpec::field("token").unique())
            .index(IndexSpec::field("expires_at").expire_after_seconds(3600))
            .finish()
    }
}

struct ManualSession;

impl Record for ManualSession {
    fn build_schema() -> Result<Schema, SchemaError> {
        Schema::builder()
            .annotated::<String>("token")
            .index(IndexSpec::field("token"))
            .auto_sync_indexes(false)
            .finish()
    }
}

#[test]
fn binding_a_record_type_builds_its_declared_indexes() {
    let mut backend = FakeBackend::with_indexes(vec![primary()]);
    let sync = sync_indexes::<Session, _>(&mut backend).unwrap();

    assert_eq!(sync.created, ["token_1", "expires_at_1"]);
    assert!(backend.index("token_1").unwrap().options.unique);
    assert_eq!(
        backend.index("expires_at_1").unwrap().options.expire_after_seconds,
        Some(3600)
    );
}

#[test]
fn disabled_auto_sync_performs_no_backend_calls() {
    let mut backend = FakeBackend::with_indexes(vec![primary(), ascending("a")]);
    let sync = sync_indexes::<ManualSession, _>(&mut backend).unwrap();

    assert_eq!(sync, documap::IndexSync::default());
    assert!(backend.calls.is_empty());
    assert!(backend.index("a_1").is_some());
}

#[test]
fn backend_errors_propagate_unchanged() {
    struct FailingBackend;

    impl IndexBackend for FailingBackend {
        fn list_indexes(&mut self) -> Result<Vec<ExistingIndex>, BackendError> {
            Err(BackendError::new("connection reset"))
        }

        fn create_index(&mut self, _index: &CanonicalIndex) -> Result<String, BackendError> {
            unreachable!("list_indexes fails first")
        }

        fn drop_index(&mut self, _name: &str) -> Result<(), BackendError> {
            unreachable!("list_indexes fails first")
        }
    }

    let err = reconcile(&mut FailingBackend, &[]).unwrap_err();
    assert!(matches!(err, documap::MapError::Backend(_)));
    assert!(err.to_string().contains("connection reset"));
}
