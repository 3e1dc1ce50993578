//! Document store: named collections of keyed JSON records.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::Record;
use crate::error::PersistenceError;

/// What the pipelines need from persistence. Shared by reference across workers.
pub trait DocumentStore: Sync {
    /// True if `collection` holds at least one record with `key`.
    fn contains(&self, collection: &str, key: &str) -> Result<bool, PersistenceError>;

    /// Best-effort bulk insert. Returns the number of records written.
    fn insert_many(&self, collection: &str, records: &[Record]) -> Result<usize, PersistenceError>;

    /// Index `field` of the record bodies in `collection`. Idempotent; returns whether an index
    /// was created by this call.
    fn ensure_index(&self, collection: &str, field: &str) -> Result<bool, PersistenceError>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    fn contains(&self, collection: &str, key: &str) -> Result<bool, PersistenceError> {
        (**self).contains(collection, key)
    }

    fn insert_many(&self, collection: &str, records: &[Record]) -> Result<usize, PersistenceError> {
        (**self).insert_many(collection, records)
    }

    fn ensure_index(&self, collection: &str, field: &str) -> Result<bool, PersistenceError> {
        (**self).ensure_index(collection, field)
    }
}

/// WAL tuning pragmas (synchronous, autocheckpoint, size limit).
/// Use after PRAGMA journal_mode = WAL.
pub(crate) const WAL_PRAGMAS: &str = r#"
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 10000;
        PRAGMA journal_size_limit = 67108864;
        "#;

/// One table for every collection; `key` is what `contains` looks up.
pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY,
    collection TEXT NOT NULL,
    key TEXT NOT NULL,
    body TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_records_collection_key ON records(collection, key);
"#;

pub(crate) const INSERT_RECORD_SQL: &str =
    "INSERT INTO records (collection, key, body) VALUES (?1, ?2, ?3)";

/// Unique Maven components across every SBOM in a collection: (id, name), id falling back to
/// the package URL when a component has no bom-ref.
pub(crate) const UNIQUE_MAVEN_COMPONENTS_SQL: &str = r#"
SELECT COALESCE(json_extract(c.value, '$."bom-ref"'), json_extract(c.value, '$.purl')) AS cid,
       MIN(json_extract(c.value, '$.name'))
FROM records r, json_each(r.body, '$.components') c
WHERE r.collection = ?1
  AND json_extract(c.value, '$.purl') LIKE 'pkg:maven/%'
  AND json_extract(c.value, '$.name') IS NOT NULL
GROUP BY cid
ORDER BY cid
"#;

/// Distinct names of components of one type (`?2`) across every SBOM in a collection, sorted.
pub(crate) const UNIQUE_COMPONENT_NAMES_SQL: &str = r#"
SELECT DISTINCT json_extract(c.value, '$.name')
FROM records r, json_each(r.body, '$.components') c
WHERE r.collection = ?1
  AND json_extract(c.value, '$.type') = ?2
  AND json_extract(c.value, '$.name') IS NOT NULL
ORDER BY 1
"#;

/// Collection and field names end up inside SQL text; allow only `[A-Za-z0-9_]`.
pub(crate) fn check_identifier(name: &str) -> Result<&str, PersistenceError> {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(name)
    } else {
        Err(PersistenceError::InvalidIdentifier(name.to_string()))
    }
}
