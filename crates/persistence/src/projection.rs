//! Row projections returned by the search operations.
//!
//! Each projection reads the column aliases produced by the matching
//! [`SearchEntity`](crate::query::SearchEntity) select clause and turns coded
//! columns back into labels through a cache snapshot. A code without a label
//! in the snapshot projects as `null`.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::cache::{ReferenceEntity, Snapshot};
use crate::error::{RowError, StorageResult};
use crate::store::Row;

/// Code used by the warehouse for "no matching concept".
pub const NO_MATCHING_CONCEPT: i64 = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionRecord {
    pub person_id: i64,
    pub visit_id: Option<i64>,
    pub condition_concept_id: i64,
    pub condition_concept_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugRecord {
    pub person_id: i64,
    pub visit_id: Option<i64>,
    pub drug_concept_id: i64,
    pub drug_concept_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub person_id: i64,
    pub birth: Option<NaiveDate>,
    pub gender_concept_id: i64,
    pub gender_concept_name: Option<String>,
    pub race_concept_id: i64,
    pub race_concept_name: Option<String>,
    pub ethnicity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub visit_id: i64,
    pub person_id: i64,
    pub visit_concept_id: i64,
    pub visit_concept_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeathRecord {
    pub person_id: i64,
    pub date: Option<NaiveDate>,
}

/// Whether a catalog concept is still in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Validity {
    Valid,
    Invalid,
}

impl Validity {
    /// A concept is valid while the start of its end date has not passed.
    /// A concept without an end date is always valid.
    pub fn at(valid_end_date: Option<NaiveDate>, now: NaiveDateTime) -> Self {
        match valid_end_date {
            Some(end) if end.and_time(NaiveTime::MIN) < now => Validity::Invalid,
            _ => Validity::Valid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptRecord {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub class: String,
    pub validity: Validity,
    pub domain: String,
    pub vocabulary: String,
}

/// Reverse-resolves a code, logging codes the snapshot does not know.
pub fn label_for(snapshot: &Snapshot, entity: ReferenceEntity, code: i64) -> Option<String> {
    let label = snapshot.reverse_resolve(code).map(str::to_string);
    if label.is_none() && code != NO_MATCHING_CONCEPT {
        tracing::warn!(entity = %entity, code, "No label for code in current snapshot");
    }
    label
}

pub fn conditions(rows: &[Row], snapshot: &Snapshot) -> StorageResult<Vec<ConditionRecord>> {
    project(rows, |row| {
        let code = row.i64("concept_id")?;
        Ok(ConditionRecord {
            person_id: row.i64("person_id")?,
            visit_id: row.opt_i64("visit_id")?,
            condition_concept_id: code,
            condition_concept_name: label_for(snapshot, ReferenceEntity::Condition, code),
            start_date: row.opt_date("start_date")?,
            end_date: row.opt_date("end_date")?,
        })
    })
}

pub fn drugs(rows: &[Row], snapshot: &Snapshot) -> StorageResult<Vec<DrugRecord>> {
    project(rows, |row| {
        let code = row.i64("concept_id")?;
        Ok(DrugRecord {
            person_id: row.i64("person_id")?,
            visit_id: row.opt_i64("visit_id")?,
            drug_concept_id: code,
            drug_concept_name: label_for(snapshot, ReferenceEntity::Drug, code),
            start_date: row.opt_date("start_date")?,
            end_date: row.opt_date("end_date")?,
        })
    })
}

pub fn persons(
    rows: &[Row],
    genders: &Snapshot,
    races: &Snapshot,
) -> StorageResult<Vec<PersonRecord>> {
    project(rows, |row| {
        let gender = row.i64("gender_concept_id")?;
        let race = row.i64("race_concept_id")?;
        Ok(PersonRecord {
            person_id: row.i64("person_id")?,
            birth: row.opt_date("birth")?,
            gender_concept_id: gender,
            gender_concept_name: label_for(genders, ReferenceEntity::Gender, gender),
            race_concept_id: race,
            race_concept_name: label_for(races, ReferenceEntity::Race, race),
            ethnicity: row.opt_str("ethnicity")?.map(str::to_string),
        })
    })
}

pub fn visits(rows: &[Row], visit_types: &Snapshot) -> StorageResult<Vec<VisitRecord>> {
    project(rows, |row| {
        let code = row.i64("visit_concept_id")?;
        Ok(VisitRecord {
            visit_id: row.i64("visit_id")?,
            person_id: row.i64("person_id")?,
            visit_concept_id: code,
            visit_concept_name: label_for(visit_types, ReferenceEntity::VisitType, code),
            start_date: row.opt_date("start_date")?,
            end_date: row.opt_date("end_date")?,
        })
    })
}

pub fn deaths(rows: &[Row]) -> StorageResult<Vec<DeathRecord>> {
    project(rows, |row| {
        Ok(DeathRecord {
            person_id: row.i64("person_id")?,
            date: row.opt_date("date")?,
        })
    })
}

/// Projects catalog rows, judging validity against `now`.
pub fn concepts(rows: &[Row], now: NaiveDateTime) -> StorageResult<Vec<ConceptRecord>> {
    project(rows, |row| {
        Ok(ConceptRecord {
            id: row.i64("id")?,
            code: row.str("code")?.to_string(),
            name: row.str("name")?.to_string(),
            class: row.str("class")?.to_string(),
            validity: Validity::at(row.opt_date("valid_end_date")?, now),
            domain: row.str("domain")?.to_string(),
            vocabulary: row.str("vocabulary")?.to_string(),
        })
    })
}

fn project<T>(rows: &[Row], f: impl Fn(&Row) -> Result<T, RowError>) -> StorageResult<Vec<T>> {
    rows.iter().map(|row| f(row).map_err(Into::into)).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::CodeMapping;
    use crate::store::SqlValue;

    fn text(s: &str) -> SqlValue {
        SqlValue::Text(s.to_string())
    }

    fn conditions_snapshot() -> Snapshot {
        Snapshot::Codes(Arc::new(CodeMapping::from_pairs(vec![(
            320128,
            "Essential hypertension".to_string(),
        )])))
    }

    #[test]
    fn test_condition_projection() {
        let rows = vec![
            Row::new()
                .with("person_id", SqlValue::Integer(1))
                .with("visit_id", SqlValue::Null)
                .with("concept_id", SqlValue::Integer(320128))
                .with("start_date", text("2020-02-03 08:00:00"))
                .with("end_date", SqlValue::Null),
        ];

        let records = conditions(&rows, &conditions_snapshot()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].condition_concept_name.as_deref(),
            Some("Essential hypertension")
        );

        let json = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(json["start_date"], "2020-02-03");
        assert!(json["end_date"].is_null());
        assert!(json["visit_id"].is_null());
    }

    #[test]
    fn test_unknown_code_projects_null_label() {
        let rows = vec![
            Row::new()
                .with("person_id", SqlValue::Integer(1))
                .with("visit_id", SqlValue::Integer(10))
                .with("concept_id", SqlValue::Integer(999))
                .with("start_date", text("2020-02-03"))
                .with("end_date", text("2020-02-04")),
        ];

        let records = drugs(&rows, &conditions_snapshot()).unwrap();
        assert_eq!(records[0].drug_concept_name, None);
        assert_eq!(records[0].visit_id, Some(10));
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let rows = vec![Row::new().with("person_id", SqlValue::Integer(1))];
        assert!(deaths(&rows).is_err());
    }

    #[test]
    fn test_concept_validity() {
        let now = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();

        assert_eq!(
            Validity::at(NaiveDate::from_ymd_opt(2099, 12, 31), now),
            Validity::Valid
        );
        assert_eq!(
            Validity::at(NaiveDate::from_ymd_opt(2024, 6, 1), now),
            Validity::Invalid
        );
        assert_eq!(Validity::at(None, now), Validity::Valid);

        let rows = vec![
            Row::new()
                .with("id", SqlValue::Integer(320128))
                .with("code", text("59621000"))
                .with("name", text("Essential hypertension"))
                .with("class", text("Clinical Finding"))
                .with("valid_end_date", text("2099-12-31"))
                .with("domain", text("Condition"))
                .with("vocabulary", text("SNOMED")),
        ];
        let json = serde_json::to_value(concepts(&rows, now).unwrap()).unwrap();
        assert_eq!(json[0]["validity"], "Valid");
        assert_eq!(json[0]["class"], "Clinical Finding");
    }
}
