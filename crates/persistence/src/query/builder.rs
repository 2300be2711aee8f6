//! Conjunctive filter query builder.
//!
//! A [`FilterQueryBuilder`] collects [`Predicate`]s in the order they are added
//! and renders them into a single `SELECT` with every value bound through a
//! numbered placeholder. Pagination, when present, is always rendered last.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::fragment::{SqlFragment, SqlParam};

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day of the range.
    pub start: NaiveDate,
    /// Last day of the range (inclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a new range.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Returns the first instant of the range.
    pub fn start_of_range(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    /// Returns the last second of the range.
    pub fn end_of_range(&self) -> NaiveDateTime {
        end_of_day(self.end)
    }
}

/// Returns the last second of a calendar day.
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(23, 59, 59)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN))
}

/// Page selection for a result set.
///
/// `offset = number * size`, `limit = size`. A page size of zero yields an
/// empty page; callers are expected to reject it before building a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Zero-based page number.
    pub number: u64,
    /// Rows per page.
    pub size: u64,
}

impl Page {
    /// Page size used when the caller does not provide one.
    pub const DEFAULT_SIZE: u64 = 10;

    /// Creates a page selection.
    pub fn new(number: u64, size: u64) -> Self {
        Self { number, size }
    }

    /// Returns the first page with the given size.
    pub fn first(size: u64) -> Self {
        Self::new(0, size)
    }

    /// Returns the number of rows to skip.
    pub fn offset(&self) -> u64 {
        self.number.saturating_mul(self.size)
    }

    /// Returns the maximum number of rows to return.
    pub fn limit(&self) -> u64 {
        self.size
    }

    /// Returns the following page.
    pub fn next(&self) -> Self {
        Self::new(self.number.saturating_add(1), self.size)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::first(Self::DEFAULT_SIZE)
    }
}

/// A single filter condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column = value`. A NULL value never matches any row.
    Equals {
        column: &'static str,
        value: SqlParam,
    },
    /// `column LIKE '%text%'` with LIKE wildcards in `text` escaped.
    Contains { column: &'static str, text: String },
    /// `column BETWEEN low AND high`.
    Between {
        column: &'static str,
        low: SqlParam,
        high: SqlParam,
    },
    /// `start_column >= low AND end_column <= high`.
    Within {
        start_column: &'static str,
        end_column: &'static str,
        low: SqlParam,
        high: SqlParam,
    },
}

impl Predicate {
    /// Equality against a bound value.
    pub fn eq(column: &'static str, value: SqlParam) -> Self {
        Predicate::Equals { column, value }
    }

    /// Substring match.
    pub fn contains(column: &'static str, text: impl Into<String>) -> Self {
        Predicate::Contains {
            column,
            text: text.into(),
        }
    }

    /// Matches a timestamp column falling anywhere on the given day.
    pub fn on_day(column: &'static str, date: NaiveDate) -> Self {
        Self::between(column, date.and_time(NaiveTime::MIN), end_of_day(date))
    }

    /// Inclusive timestamp range on one column.
    pub fn between(column: &'static str, low: NaiveDateTime, high: NaiveDateTime) -> Self {
        Predicate::Between {
            column,
            low: SqlParam::timestamp(low),
            high: SqlParam::timestamp(high),
        }
    }

    /// Start/end columns both inside the inclusive calendar range.
    pub fn within(start_column: &'static str, end_column: &'static str, range: DateRange) -> Self {
        Predicate::Within {
            start_column,
            end_column,
            low: SqlParam::timestamp(range.start_of_range()),
            high: SqlParam::timestamp(range.end_of_range()),
        }
    }

    /// Returns true if this predicate can never match (equality with NULL).
    pub fn is_unsatisfiable(&self) -> bool {
        matches!(self, Predicate::Equals { value, .. } if value.is_null())
    }

    fn render(&self, fragment: &mut SqlFragment) -> String {
        match self {
            Predicate::Equals { column, value } => {
                let p = fragment.add_param(value.clone());
                format!("{} = {}", column, p)
            }
            Predicate::Contains { column, text } => {
                let p = fragment.add_param(SqlParam::string(format!("%{}%", escape_like(text))));
                format!("{} LIKE {} ESCAPE '\\'", column, p)
            }
            Predicate::Between { column, low, high } => {
                let lo = fragment.add_param(low.clone());
                let hi = fragment.add_param(high.clone());
                format!("{} BETWEEN {} AND {}", column, lo, hi)
            }
            Predicate::Within {
                start_column,
                end_column,
                low,
                high,
            } => {
                let lo = fragment.add_param(low.clone());
                let hi = fragment.add_param(high.clone());
                format!("({} >= {} AND {} <= {})", start_column, lo, end_column, hi)
            }
        }
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Builds a parameterized `SELECT` from a base clause and ANDed predicates.
#[derive(Debug, Clone)]
pub struct FilterQueryBuilder {
    select: String,
    predicates: Vec<Predicate>,
    order_by: &'static [&'static str],
    page: Option<Page>,
}

impl FilterQueryBuilder {
    /// Creates a builder over a `SELECT ... FROM ...` clause.
    pub fn new(select: impl Into<String>) -> Self {
        Self {
            select: select.into(),
            predicates: Vec::new(),
            order_by: &[],
            page: None,
        }
    }

    /// Appends a predicate.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Appends several predicates, preserving their order.
    pub fn filters(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    /// Sets the ascending ordering keys, most significant first.
    pub fn order_by(mut self, columns: &'static [&'static str]) -> Self {
        self.order_by = columns;
        self
    }

    /// Applies pagination.
    pub fn paginate(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    /// Returns the predicates in AND order.
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Returns the number of predicates.
    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }

    /// Renders the query.
    pub fn build(&self) -> SqlFragment {
        let mut fragment = SqlFragment::new(self.select.clone());

        let conditions: Vec<String> = self
            .predicates
            .iter()
            .map(|predicate| predicate.render(&mut fragment))
            .collect();

        if !conditions.is_empty() {
            fragment.sql = format!("{} WHERE {}", fragment.sql, conditions.join(" AND "));
        }

        if !self.order_by.is_empty() {
            let keys: Vec<String> = self
                .order_by
                .iter()
                .map(|column| format!("{column} ASC"))
                .collect();
            fragment.sql = format!("{} ORDER BY {}", fragment.sql, keys.join(", "));
        }

        if let Some(page) = self.page {
            let limit = fragment.add_param(SqlParam::integer(clamp_i64(page.limit())));
            let offset = fragment.add_param(SqlParam::integer(clamp_i64(page.offset())));
            fragment.sql = format!("{} LIMIT {} OFFSET {}", fragment.sql, limit, offset);
        }

        fragment
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
