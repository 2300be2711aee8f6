//! Count queries for the statistics endpoints.
//!
//! Category counts validate the requested value against the current cache
//! view before building a query. An absent or unknown value yields
//! [`CountQuery::Invalid`] carrying the list of values that would have been
//! accepted, so callers can show it to the client.

use chrono::{Days, Months, NaiveDateTime, NaiveTime};
use serde_json::{Value, json};

use crate::cache::{CacheView, ReferenceEntity};
use crate::query::{FilterQueryBuilder, Predicate, SqlFragment, end_of_day};

const PERSONS: &str = "SELECT COUNT(*) AS count FROM person";
const VISITS: &str = "SELECT COUNT(*) AS count FROM visit_occurrence";
const DEATHS: &str = "SELECT COUNT(*) AS count FROM death";
const VISITS_WITH_PERSON: &str = "SELECT COUNT(*) AS count FROM visit_occurrence v \
                                  JOIN person p ON v.person_id = p.person_id";

/// A count of persons or visits sliced by one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryCount {
    PersonGender,
    PersonRace,
    PersonEthnicity,
    VisitType,
    VisitGender,
    VisitRace,
    VisitEthnicity,
}

impl CategoryCount {
    /// Returns the reference entity the category values come from.
    pub fn entity(&self) -> ReferenceEntity {
        match self {
            CategoryCount::PersonGender | CategoryCount::VisitGender => ReferenceEntity::Gender,
            CategoryCount::PersonRace | CategoryCount::VisitRace => ReferenceEntity::Race,
            CategoryCount::PersonEthnicity | CategoryCount::VisitEthnicity => {
                ReferenceEntity::Ethnicity
            }
            CategoryCount::VisitType => ReferenceEntity::VisitType,
        }
    }

    fn source(&self) -> (&'static str, &'static str) {
        match self {
            CategoryCount::PersonGender => (PERSONS, "gender_concept_id"),
            CategoryCount::PersonRace => (PERSONS, "race_concept_id"),
            CategoryCount::PersonEthnicity => (PERSONS, "ethnicity_source_value"),
            CategoryCount::VisitType => (VISITS, "visit_concept_id"),
            CategoryCount::VisitGender => (VISITS_WITH_PERSON, "p.gender_concept_id"),
            CategoryCount::VisitRace => (VISITS_WITH_PERSON, "p.race_concept_id"),
            CategoryCount::VisitEthnicity => (VISITS_WITH_PERSON, "p.ethnicity_source_value"),
        }
    }
}

/// Outcome of preparing a count.
#[derive(Debug, Clone, PartialEq)]
pub enum CountQuery {
    /// A query yielding one row with a `count` column.
    Count(SqlFragment),
    /// The requested value is not valid; carries the accepted values.
    Invalid(Value),
}

/// Counts all persons.
pub fn persons() -> SqlFragment {
    SqlFragment::new(PERSONS)
}

/// Counts death records.
pub fn deaths() -> SqlFragment {
    SqlFragment::new(DEATHS)
}

/// Prepares a count of rows whose category equals `value`.
pub fn category_count(count: CategoryCount, value: Option<&str>, view: &CacheView) -> CountQuery {
    let snapshot = view.get(count.entity());
    let Some(value) = value.filter(|value| snapshot.contains(value)) else {
        return CountQuery::Invalid(json!(snapshot.labels()));
    };

    let (select, column) = count.source();
    CountQuery::Count(
        FilterQueryBuilder::new(select)
            .filter(Predicate::eq(column, snapshot.bind(value)))
            .build(),
    )
}

/// A ten-year age bucket, named by its lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeBucket(u32);

impl AgeBucket {
    pub const WIDTH: u32 = 10;

    /// Parses a bucket marker. Only non-negative multiples of ten are valid.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let start: u32 = raw?.trim().parse().ok()?;
        (start % Self::WIDTH == 0).then_some(Self(start))
    }

    /// Returns the inclusive birth-timestamp range of people whose age as of
    /// `now` falls in `[start, start + 10)`.
    ///
    /// The lower bound is the day after `now - (start + 10)` years at
    /// midnight; the upper bound is `now - start` years at end of day.
    pub fn birth_range(&self, now: NaiveDateTime) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let today = now.date();
        let years_back = |years: u32| -> Option<chrono::NaiveDate> {
            today.checked_sub_months(Months::new(years.checked_mul(12)?))
        };

        let lower = years_back(self.0.checked_add(Self::WIDTH)?)?
            .checked_add_days(Days::new(1))?
            .and_time(NaiveTime::MIN);
        let upper = end_of_day(years_back(self.0)?);
        Some((lower, upper))
    }

    /// Returns the marker list shown when a bucket is missing or invalid.
    pub fn markers() -> Value {
        json!([0, 10, 20, "..."])
    }
}

/// Prepares a count of visits by people in the given age bucket.
pub fn age_count(raw: Option<&str>, now: NaiveDateTime) -> CountQuery {
    let Some((lower, upper)) = AgeBucket::parse(raw).and_then(|bucket| bucket.birth_range(now))
    else {
        return CountQuery::Invalid(AgeBucket::markers());
    };

    CountQuery::Count(
        FilterQueryBuilder::new(VISITS_WITH_PERSON)
            .filter(Predicate::between("p.birth_datetime", lower, upper))
            .build(),
    )
}
