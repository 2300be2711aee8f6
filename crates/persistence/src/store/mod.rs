//! Storage abstraction for the clinical-data warehouse.
//!
//! The service never shares one database session between callers. Every
//! operation checks a [`Session`] out of a [`DataStore`], runs its queries and
//! drops the session, which returns the underlying connection to the pool.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "sqlite")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use cdm_lookup_persistence::store::{DataStore, Session};
//! use cdm_lookup_persistence::store::sqlite::SqliteStore;
//! use cdm_lookup_persistence::query::SqlParam;
//!
//! let store = SqliteStore::open("cdm.db")?;
//! let mut session = store.session()?;
//! let rows = session.execute(
//!     "SELECT person_id FROM person WHERE gender_concept_id = ?1",
//!     &[SqlParam::integer(8507)],
//! )?;
//! println!("{} persons", rows.len());
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "sqlite"))]
//! # fn main() {}
//! ```

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{RowError, StorageResult};
use crate::query::SqlParam;

#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// A pooled source of database sessions.
pub trait DataStore: Send + Sync {
    /// The session type handed out by this store.
    type Session: Session;

    /// Returns a short name identifying the backend (e.g. "sqlite").
    fn backend_name(&self) -> &'static str;

    /// Checks a session out of the pool.
    ///
    /// The session is released when dropped.
    fn session(&self) -> StorageResult<Self::Session>;
}

/// One checked-out database session.
pub trait Session {
    /// Executes a query with positional arguments and returns all rows.
    fn execute(&mut self, query: &str, args: &[SqlParam]) -> StorageResult<Vec<Row>>;

    /// Rolls back any open transaction on this session.
    ///
    /// Called after a failed [`execute`](Session::execute) before the error is
    /// reported to the caller. A session without an open transaction is left
    /// untouched.
    fn rollback(&mut self) -> StorageResult<()>;

    /// Executes a query, rolling the session back if it fails.
    ///
    /// The original execution error is returned even when the rollback itself
    /// fails; the rollback failure is only logged.
    fn query(&mut self, query: &str, args: &[SqlParam]) -> StorageResult<Vec<Row>> {
        match self.execute(query, args) {
            Ok(rows) => Ok(rows),
            Err(err) => {
                if let Err(rollback_err) = self.rollback() {
                    tracing::warn!(error = %rollback_err, "Rollback after failed query failed");
                }
                Err(err)
            }
        }
    }
}

/// A single value read from a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Real(f64),
    /// Text value.
    Text(String),
}

/// A result row, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: HashMap<String, SqlValue>,
}

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column value, returning the row for chaining.
    pub fn with(mut self, column: impl Into<String>, value: SqlValue) -> Self {
        self.values.insert(column.into(), value);
        self
    }

    /// Sets a column value.
    pub fn insert(&mut self, column: impl Into<String>, value: SqlValue) {
        self.values.insert(column.into(), value);
    }

    /// Returns the raw value of a column.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.values.get(column)
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reads a nullable integer column.
    pub fn opt_i64(&self, column: &str) -> Result<Option<i64>, RowError> {
        match self.require(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Integer(value) => Ok(Some(*value)),
            SqlValue::Text(text) => text.trim().parse().map(Some).map_err(|_| {
                RowError::UnexpectedType {
                    column: column.to_string(),
                    expected: "an integer",
                }
            }),
            SqlValue::Real(_) => Err(RowError::UnexpectedType {
                column: column.to_string(),
                expected: "an integer",
            }),
        }
    }

    /// Reads a non-null integer column.
    pub fn i64(&self, column: &str) -> Result<i64, RowError> {
        self.opt_i64(column)?.ok_or_else(|| RowError::UnexpectedType {
            column: column.to_string(),
            expected: "a non-null integer",
        })
    }

    /// Reads a nullable text column.
    pub fn opt_str(&self, column: &str) -> Result<Option<&str>, RowError> {
        match self.require(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Text(text) => Ok(Some(text.as_str())),
            _ => Err(RowError::UnexpectedType {
                column: column.to_string(),
                expected: "text",
            }),
        }
    }

    /// Reads a non-null text column.
    pub fn str(&self, column: &str) -> Result<&str, RowError> {
        self.opt_str(column)?.ok_or_else(|| RowError::UnexpectedType {
            column: column.to_string(),
            expected: "non-null text",
        })
    }

    /// Reads a nullable date or timestamp column as a calendar date.
    ///
    /// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DDTHH:MM:SS`.
    pub fn opt_date(&self, column: &str) -> Result<Option<NaiveDate>, RowError> {
        let Some(text) = self.opt_str(column)? else {
            return Ok(None);
        };
        parse_date_value(text)
            .map(Some)
            .ok_or_else(|| RowError::UnexpectedType {
                column: column.to_string(),
                expected: "a date",
            })
    }

    fn require(&self, column: &str) -> Result<&SqlValue, RowError> {
        self.values
            .get(column)
            .ok_or_else(|| RowError::MissingColumn {
                column: column.to_string(),
            })
    }
}

fn parse_date_value(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|timestamp| timestamp.date())
}
