//! SQLite data store.
//!
//! Connections come from an `r2d2` pool; every [`SqliteSession`] owns one
//! pooled connection for its lifetime. In-memory stores use a uniquely named
//! shared-cache database so that all pooled connections see the same data.

use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

use parking_lot::Mutex;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, OpenFlags, ToSql};
use serde::{Deserialize, Serialize};

use crate::error::{BackendError, StorageError, StorageResult};
use crate::query::SqlParam;

use super::{DataStore, Row, Session, SqlValue, schema};

/// SQLite store backed by a connection pool.
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
    config: SqliteStoreConfig,
    is_memory: bool,
    /// Keeps a shared in-memory database alive while the pool recycles connections.
    _memory_anchor: Option<Mutex<Connection>>,
}

impl Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("config", &self.config)
            .field("is_memory", &self.is_memory)
            .field("pool_size", &self.pool.state().connections)
            .finish_non_exhaustive()
    }
}

/// Configuration for the SQLite store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of idle connections.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u32,

    /// Reject writes on pooled connections (`PRAGMA query_only`).
    #[serde(default)]
    pub read_only: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout_ms() -> u64 {
    30000
}

fn default_busy_timeout_ms() -> u32 {
    5000
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            read_only: false,
        }
    }
}

impl SqliteStore {
    /// Creates a new in-memory store.
    pub fn in_memory() -> StorageResult<Self> {
        Self::with_config(":memory:", SqliteStoreConfig::default())
    }

    /// Opens a file-based database.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        Self::with_config(path, SqliteStoreConfig::default())
    }

    /// Creates a store with custom configuration.
    ///
    /// The path `:memory:` creates a private in-memory database shared by all
    /// connections of this store.
    pub fn with_config<P: AsRef<Path>>(path: P, config: SqliteStoreConfig) -> StorageResult<Self> {
        let path_str = path.as_ref().to_string_lossy().into_owned();
        let is_memory = path_str == ":memory:";

        let busy_timeout = Duration::from_millis(u64::from(config.busy_timeout_ms));
        let read_only = config.read_only;

        let (manager, memory_anchor) = if is_memory {
            let uri = format!(
                "file:cdm-lookup-{}?mode=memory&cache=shared",
                uuid::Uuid::new_v4().simple()
            );
            let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX;
            let anchor = Connection::open_with_flags(&uri, flags)?;
            (
                SqliteConnectionManager::file(&uri).with_flags(flags),
                Some(Mutex::new(anchor)),
            )
        } else {
            (SqliteConnectionManager::file(path.as_ref()), None)
        };

        let manager = manager.with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            if read_only {
                conn.execute_batch("PRAGMA query_only = ON")?;
            }
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(config.max_connections)
            .min_idle(Some(config.min_connections))
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms))
            .build(manager)
            .map_err(|e| {
                StorageError::Backend(BackendError::ConnectionFailed {
                    backend_name: "sqlite".to_string(),
                    message: e.to_string(),
                })
            })?;

        tracing::debug!(
            path = %path_str,
            max_connections = config.max_connections,
            "SQLite connection pool ready"
        );

        Ok(Self {
            pool,
            config,
            is_memory,
            _memory_anchor: memory_anchor,
        })
    }

    /// Creates the warehouse tables used by local development and tests.
    pub fn init_fixture_schema(&self) -> StorageResult<()> {
        let conn = self.get_connection()?;
        schema::initialize_fixture_schema(&conn)
    }

    /// Runs a closure against a pooled connection.
    ///
    /// Intended for fixture loading; request paths go through [`Session`].
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> StorageResult<T> {
        let conn = self.get_connection()?;
        Ok(f(&conn)?)
    }

    /// Verifies that a pooled connection can run a trivial query.
    pub fn health_check(&self) -> StorageResult<()> {
        let conn = self.get_connection().map_err(|_| {
            StorageError::Backend(BackendError::Unavailable {
                backend_name: "sqlite".to_string(),
                message: "Failed to get connection".to_string(),
            })
        })?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    /// Returns whether this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.is_memory
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    fn get_connection(&self) -> StorageResult<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: "sqlite".to_string(),
                message: e.to_string(),
            })
        })
    }
}

impl DataStore for SqliteStore {
    type Session = SqliteSession;

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn session(&self) -> StorageResult<Self::Session> {
        Ok(SqliteSession(self.get_connection()?))
    }
}

/// A pooled SQLite connection checked out for one operation.
pub struct SqliteSession(PooledConnection<SqliteConnectionManager>);

impl Debug for SqliteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSession").finish()
    }
}

impl Session for SqliteSession {
    fn execute(&mut self, query: &str, args: &[SqlParam]) -> StorageResult<Vec<Row>> {
        let mut stmt = self.0.prepare(query).map_err(query_failed)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = stmt
            .query(rusqlite::params_from_iter(args.iter()))
            .map_err(query_failed)?;
        let mut result = Vec::new();
        while let Some(row) = rows.next().map_err(query_failed)? {
            let mut record = Row::new();
            for (index, column) in columns.iter().enumerate() {
                let value = row.get_ref(index).map_err(query_failed)?;
                record.insert(column.clone(), sql_value(value));
            }
            result.push(record);
        }
        Ok(result)
    }

    fn rollback(&mut self) -> StorageResult<()> {
        if !self.0.is_autocommit() {
            self.0.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlParam::String(s) => ToSqlOutput::from(s.as_str()),
            SqlParam::Integer(i) => ToSqlOutput::from(*i),
            SqlParam::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
        })
    }
}

/// Statement preparation and stepping failures are query errors; pool and
/// connection failures keep their own variants.
fn query_failed(err: rusqlite::Error) -> StorageError {
    StorageError::query(err.to_string())
}

fn sql_value(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Integer(i),
        ValueRef::Real(f) => SqlValue::Real(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            SqlValue::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_store() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store.init_fixture_schema().unwrap();
        store
    }

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_memory());
        assert_eq!(store.backend_name(), "sqlite");
    }

    #[test]
    fn test_fixture_schema_is_idempotent() {
        let store = create_store();
        store.init_fixture_schema().unwrap();
    }

    #[test]
    fn test_health_check() {
        let store = create_store();
        assert!(store.health_check().is_ok());
    }

    #[test]
    fn test_sessions_share_memory_database() {
        let store = create_store();
        store
            .with_connection(|conn| {
                conn.execute(
                    "INSERT INTO person (person_id, gender_concept_id, race_concept_id, birth_datetime) VALUES (1, 8507, 8527, '1980-01-01 00:00:00')",
                    [],
                )
            })
            .unwrap();

        let mut first = store.session().unwrap();
        let mut second = store.session().unwrap();
        let a = first.execute("SELECT person_id FROM person", &[]).unwrap();
        let b = second.execute("SELECT person_id FROM person", &[]).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_execute_binds_parameters() {
        let store = create_store();
        store
            .with_connection(|conn| {
                conn.execute_batch(
                    "INSERT INTO death (person_id, death_date) VALUES (1, '2021-05-01');
                     INSERT INTO death (person_id, death_date) VALUES (2, '2021-06-01');",
                )
            })
            .unwrap();

        let mut session = store.session().unwrap();
        let rows = session
            .execute(
                "SELECT person_id, death_date FROM death WHERE death_date = ?1",
                &[SqlParam::string("2021-06-01")],
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].i64("person_id").unwrap(), 2);
    }

    #[test]
    fn test_null_parameter_matches_nothing() {
        let store = create_store();
        store
            .with_connection(|conn| {
                conn.execute_batch("INSERT INTO death (person_id, death_date) VALUES (1, NULL)")
            })
            .unwrap();

        let mut session = store.session().unwrap();
        let rows = session
            .execute(
                "SELECT person_id FROM death WHERE death_date = ?1",
                &[SqlParam::Null],
            )
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_execute_error_and_rollback() {
        let store = create_store();
        let mut session = store.session().unwrap();
        let err = session
            .execute("SELECT * FROM no_such_table", &[])
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Backend(BackendError::QueryError { ref message })
                if message.contains("no such table")
        ));
        assert!(session.rollback().is_ok());
    }

    #[test]
    fn test_bad_parameter_count_is_query_error() {
        let store = create_store();
        let mut session = store.session().unwrap();
        let err = session
            .execute("SELECT person_id FROM death WHERE person_id = ?1", &[])
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Backend(BackendError::QueryError { .. })
        ));
    }

    #[test]
    fn test_rollback_discards_open_transaction() {
        let store = create_store();
        let mut session = store.session().unwrap();
        session.execute("BEGIN", &[]).unwrap();
        session
            .execute(
                "INSERT INTO death (person_id, death_date) VALUES (?1, ?2)",
                &[SqlParam::integer(9), SqlParam::string("2020-01-01")],
            )
            .unwrap();
        session.rollback().unwrap();

        let rows = session.execute("SELECT person_id FROM death", &[]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_file_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("cdm.db")).unwrap();
        assert!(!store.is_memory());
        store.init_fixture_schema().unwrap();
        let mut session = store.session().unwrap();
        assert!(session.execute("SELECT * FROM concept", &[]).unwrap().is_empty());
    }
}
