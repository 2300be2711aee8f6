//! Search query parameters.
//!
//! All parameters arrive as optional strings so that a malformed value is
//! reported through the response envelope instead of axum's plain-text query
//! rejection. Empty values are treated as absent.

use chrono::NaiveDate;
use serde::Deserialize;

use cdm_lookup_persistence::query::{
    ConceptFilter, ConditionFilter, DateRange, DeathFilter, DrugFilter, Page, PersonFilter,
    VisitFilter,
};

/// Separator between the two dates of a range parameter.
pub const RANGE_SEPARATOR: char = '~';

/// Errors raised while parsing query parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamError {
    /// A parameter value could not be parsed.
    #[error("invalid value '{value}' for '{name}': expected {expected}")]
    Invalid {
        /// Parameter name.
        name: &'static str,
        /// The raw value.
        value: String,
        /// Description of the accepted format.
        expected: &'static str,
    },

    /// `page_size` was zero.
    #[error("page_size must be greater than 0")]
    ZeroPageSize,
}

/// Raw query parameters shared by the search endpoints.
///
/// Each endpoint reads only the parameters it declares and ignores the rest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    /// Person identifier.
    pub person_id: Option<String>,
    /// Visit identifier.
    pub visit_id: Option<String>,
    /// Condition concept label.
    pub condition: Option<String>,
    /// Drug concept label.
    pub drug: Option<String>,
    /// Visit type label.
    pub visit_type: Option<String>,
    /// Gender label.
    pub gender: Option<String>,
    /// Race label.
    pub race: Option<String>,
    /// Ethnicity label.
    pub ethnicity: Option<String>,
    /// Birth day, `YYYY-MM-DD`.
    pub birth: Option<String>,
    /// `YYYY-MM-DD~YYYY-MM-DD` range, or a single day for deaths.
    pub date: Option<String>,
    /// Substring of a concept name.
    pub keyword: Option<String>,
    /// Zero-based page number.
    pub page: Option<String>,
    /// Rows per page.
    pub page_size: Option<String>,
}

impl SearchParams {
    /// Parses `page` and `page_size`.
    pub fn page(&self, default_size: u64) -> Result<Page, ParamError> {
        let number = parse_u64("page", present(&self.page))?.unwrap_or(0);
        let size = parse_u64("page_size", present(&self.page_size))?.unwrap_or(default_size);
        if size == 0 {
            return Err(ParamError::ZeroPageSize);
        }
        Ok(Page::new(number, size))
    }

    /// Builds the `/search/condition` filter.
    pub fn condition_filter(&self) -> Result<ConditionFilter, ParamError> {
        Ok(ConditionFilter {
            person_id: parse_id("person_id", present(&self.person_id))?,
            visit_id: parse_id("visit_id", present(&self.visit_id))?,
            condition: label(&self.condition),
            date: parse_date_range("date", present(&self.date))?,
        })
    }

    /// Builds the `/search/drug` filter.
    pub fn drug_filter(&self) -> Result<DrugFilter, ParamError> {
        Ok(DrugFilter {
            person_id: parse_id("person_id", present(&self.person_id))?,
            visit_id: parse_id("visit_id", present(&self.visit_id))?,
            drug: label(&self.drug),
            date: parse_date_range("date", present(&self.date))?,
        })
    }

    /// Builds the `/search/person` filter.
    pub fn person_filter(&self) -> Result<PersonFilter, ParamError> {
        Ok(PersonFilter {
            birth: parse_date("birth", present(&self.birth))?,
            gender: label(&self.gender),
            race: label(&self.race),
            ethnicity: label(&self.ethnicity),
        })
    }

    /// Builds the `/search/visit` filter.
    pub fn visit_filter(&self) -> Result<VisitFilter, ParamError> {
        Ok(VisitFilter {
            person_id: parse_id("person_id", present(&self.person_id))?,
            visit_type: label(&self.visit_type),
            date: parse_date_range("date", present(&self.date))?,
        })
    }

    /// Builds the `/search/death` filter. `date` is a single day here.
    pub fn death_filter(&self) -> Result<DeathFilter, ParamError> {
        Ok(DeathFilter {
            person_id: parse_id("person_id", present(&self.person_id))?,
            date: parse_date("date", present(&self.date))?,
        })
    }

    /// Builds the `/search/concept` filter.
    pub fn concept_filter(&self) -> Result<ConceptFilter, ParamError> {
        Ok(ConceptFilter {
            keyword: label(&self.keyword),
        })
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

// Labels are matched verbatim against the cache, so only empty values are dropped.
fn label(value: &Option<String>) -> Option<String> {
    present(value).map(str::to_string)
}

fn parse_u64(name: &'static str, value: Option<&str>) -> Result<Option<u64>, ParamError> {
    value
        .map(|v| {
            v.trim().parse().map_err(|_| ParamError::Invalid {
                name,
                value: v.to_string(),
                expected: "a non-negative integer",
            })
        })
        .transpose()
}

/// Parses an integer identifier.
pub fn parse_id(name: &'static str, value: Option<&str>) -> Result<Option<i64>, ParamError> {
    value
        .map(|v| {
            v.trim().parse().map_err(|_| ParamError::Invalid {
                name,
                value: v.to_string(),
                expected: "an integer id",
            })
        })
        .transpose()
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(name: &'static str, value: Option<&str>) -> Result<Option<NaiveDate>, ParamError> {
    value
        .map(|v| {
            NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").map_err(|_| ParamError::Invalid {
                name,
                value: v.to_string(),
                expected: "a date formatted YYYY-MM-DD",
            })
        })
        .transpose()
}

/// Parses a `YYYY-MM-DD~YYYY-MM-DD` inclusive range.
///
/// A range whose start is after its end is accepted and matches nothing.
pub fn parse_date_range(
    name: &'static str,
    value: Option<&str>,
) -> Result<Option<DateRange>, ParamError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let invalid = || ParamError::Invalid {
        name,
        value: raw.to_string(),
        expected: "a range formatted YYYY-MM-DD~YYYY-MM-DD",
    };

    let (start, end) = raw.split_once(RANGE_SEPARATOR).ok_or_else(invalid)?;
    let start = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d").map_err(|_| invalid())?;
    let end = NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d").map_err(|_| invalid())?;
    Ok(Some(DateRange::new(start, end)))
}
