//! SQLite-backed document store (WAL, one `records` table).

use anyhow::{Context, Result};
use log::{debug, warn};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::error::PersistenceError;
use crate::{ComponentRef, Record};

use super::{
    DocumentStore, INSERT_RECORD_SQL, SCHEMA, UNIQUE_COMPONENT_NAMES_SQL,
    UNIQUE_MAVEN_COMPONENTS_SQL, WAL_PRAGMAS, check_identifier,
};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Enable WAL and apply schema to an open connection (idempotent).
fn apply_wal_and_schema(conn: &Connection) -> Result<()> {
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
        .context("enable WAL")?;
    conn.execute_batch(WAL_PRAGMAS).context("set WAL pragmas")?;
    conn.execute_batch(SCHEMA).context("create schema")?;
    Ok(())
}

/// Document store over one SQLite connection. Access is serialized by a mutex so the store can
/// be shared by reference across pipeline threads.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open or create the store at `path` and ensure schema + WAL.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("open database {}", path.display()))?;
        conn.busy_timeout(BUSY_TIMEOUT).context("set busy timeout")?;
        apply_wal_and_schema(&conn)?;
        debug!("Opened store {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// In-memory store with the same schema (tests, dry runs; no WAL pragmas needed).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        conn.execute_batch(SCHEMA).context("create schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Backing file, or None for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, PersistenceError> {
        self.conn.lock().map_err(|_| PersistenceError::Poisoned)
    }

    /// Number of records in `collection`.
    pub fn count(&self, collection: &str) -> Result<usize, PersistenceError> {
        let conn = self.lock()?;
        let n: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM records WHERE collection = ?1",
                [collection],
                |row| row.get(0),
            )
            .map_err(|e| PersistenceError::sqlite(collection, e))?;
        Ok(n.max(0) as usize)
    }

    /// Every record of `collection`, in insertion order.
    pub fn load(&self, collection: &str) -> Result<Vec<Record>, PersistenceError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT key, body FROM records WHERE collection = ?1 ORDER BY id")
            .map_err(|e| PersistenceError::sqlite(collection, e))?;
        let rows = stmt
            .query_map([collection], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| PersistenceError::sqlite(collection, e))?;
        let mut records = Vec::new();
        for row in rows {
            let (key, body) = row.map_err(|e| PersistenceError::sqlite(collection, e))?;
            let body =
                serde_json::from_str(&body).map_err(|e| PersistenceError::json(collection, e))?;
            records.push(Record { key, body });
        }
        Ok(records)
    }

    /// Hand `f` a lazy iterator over the unique Maven components of every SBOM in
    /// `collection`.
    ///
    /// File-backed stores stream from a separate read-only connection, so `f` may write
    /// through this store while iterating (WAL keeps the cursor on its snapshot). In-memory
    /// stores have no second connection; their rows are read up front.
    pub fn scan_maven_components<R, F>(&self, collection: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut dyn Iterator<Item = ComponentRef>) -> R,
    {
        self.scan(UNIQUE_MAVEN_COMPONENTS_SQL, [collection], component_from_row, f)
    }

    /// Like [`Self::scan_maven_components`], over the distinct names of components whose
    /// CycloneDX `type` is `component_type`. Names arrive sorted.
    pub fn scan_component_names<R, F>(
        &self,
        collection: &str,
        component_type: &str,
        f: F,
    ) -> Result<R>
    where
        F: FnOnce(&mut dyn Iterator<Item = String>) -> R,
    {
        self.scan(
            UNIQUE_COMPONENT_NAMES_SQL,
            [collection, component_type],
            |row: &rusqlite::Row<'_>| row.get::<_, String>(0),
            f,
        )
    }

    fn scan<T, P, M, R, F>(&self, sql: &str, params: P, map_row: M, f: F) -> Result<R>
    where
        P: rusqlite::Params,
        M: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
        F: FnOnce(&mut dyn Iterator<Item = T>) -> R,
    {
        match &self.path {
            Some(path) => {
                let reader = Connection::open_with_flags(
                    path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )
                .context("open reader connection")?;
                reader.busy_timeout(BUSY_TIMEOUT).context("set busy timeout")?;
                let mut stmt = reader.prepare(sql).context("prepare scan")?;
                let rows = stmt.query_map(params, map_row).context("run scan")?;
                let mut iter = rows.filter_map(skip_bad_row);
                Ok(f(&mut iter))
            }
            None => {
                let items: Vec<T> = {
                    let conn = self.lock()?;
                    let mut stmt = conn.prepare(sql).context("prepare scan")?;
                    let rows = stmt.query_map(params, map_row).context("run scan")?;
                    rows.filter_map(skip_bad_row).collect()
                };
                Ok(f(&mut items.into_iter()))
            }
        }
    }
}

fn component_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ComponentRef> {
    Ok(ComponentRef {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn skip_bad_row<T>(row: rusqlite::Result<T>) -> Option<T> {
    row.map_err(|e| warn!("Skipping unreadable row: {}", e))
        .ok()
}

impl DocumentStore for SqliteStore {
    fn contains(&self, collection: &str, key: &str) -> Result<bool, PersistenceError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM records WHERE collection = ?1 AND key = ?2)",
            (collection, key),
            |row| row.get(0),
        )
        .map_err(|e| PersistenceError::sqlite(collection, e))
    }

    /// Insert all records in a single transaction.
    fn insert_many(&self, collection: &str, records: &[Record]) -> Result<usize, PersistenceError> {
        if records.is_empty() {
            return Ok(0);
        }
        let bodies = records
            .iter()
            .map(|r| serde_json::to_string(&r.body))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PersistenceError::json(collection, e))?;

        let mut conn = self.lock()?;
        let sqlite = |e: rusqlite::Error| PersistenceError::sqlite(collection, e);
        let tx = conn.transaction().map_err(sqlite)?;
        {
            let mut stmt = tx.prepare(INSERT_RECORD_SQL).map_err(sqlite)?;
            for (record, body) in records.iter().zip(&bodies) {
                stmt.execute((collection, record.key.as_str(), body.as_str()))
                    .map_err(sqlite)?;
            }
        }
        tx.commit().map_err(sqlite)?;
        debug!("Inserted {} records into {}", records.len(), collection);
        Ok(records.len())
    }

    fn ensure_index(&self, collection: &str, field: &str) -> Result<bool, PersistenceError> {
        let collection = check_identifier(collection)?;
        let field = check_identifier(field)?;
        let name = format!("idx_{collection}_{field}");

        let conn = self.lock()?;
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = ?1)",
                [name.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| PersistenceError::sqlite(collection, e))?;
        if exists {
            return Ok(false);
        }
        conn.execute_batch(&format!(
            "CREATE INDEX IF NOT EXISTS {name} ON records(json_extract(body, '$.{field}')) \
             WHERE collection = '{collection}';"
        ))
        .map_err(|e| PersistenceError::sqlite(collection, e))?;
        debug!("Created index {}", name);
        Ok(true)
    }
}
