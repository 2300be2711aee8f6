//! SQL fragments with bound parameters.

use chrono::{NaiveDate, NaiveDateTime};

/// Text layout used for timestamp parameters and columns.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Text layout used for date parameters and columns.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A fragment of SQL with bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    /// The SQL clause.
    pub sql: String,
    /// Bound parameter values.
    pub params: Vec<SqlParam>,
}

/// A bound SQL parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// String parameter.
    String(String),
    /// Integer parameter.
    Integer(i64),
    /// Null parameter.
    Null,
}

impl SqlParam {
    /// Creates a string parameter.
    pub fn string(s: impl Into<String>) -> Self {
        SqlParam::String(s.into())
    }

    /// Creates an integer parameter.
    pub fn integer(i: i64) -> Self {
        SqlParam::Integer(i)
    }

    /// Creates a timestamp parameter in the warehouse text layout.
    pub fn timestamp(ts: NaiveDateTime) -> Self {
        SqlParam::String(ts.format(TIMESTAMP_FORMAT).to_string())
    }

    /// Creates a date parameter in the warehouse text layout.
    pub fn date(date: NaiveDate) -> Self {
        SqlParam::String(date.format(DATE_FORMAT).to_string())
    }

    /// Returns true for the NULL parameter.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlParam::Null)
    }
}

impl SqlFragment {
    /// Creates a new SQL fragment.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Adds a parameter and returns its placeholder string.
    pub fn add_param(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("?{}", self.params.len())
    }

    /// Returns true if this fragment is empty.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_param_numbers_placeholders() {
        let mut frag = SqlFragment::new("SELECT * FROM person");
        assert_eq!(frag.add_param(SqlParam::integer(1)), "?1");
        assert_eq!(frag.add_param(SqlParam::string("x")), "?2");
        assert_eq!(frag.params.len(), 2);
        assert!(!frag.is_empty());
    }

    #[test]
    fn test_temporal_params() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        assert_eq!(SqlParam::date(date), SqlParam::string("2020-01-02"));

        let ts = date.and_hms_opt(23, 59, 59).unwrap();
        assert_eq!(SqlParam::timestamp(ts), SqlParam::string("2020-01-02 23:59:59"));
    }
}
