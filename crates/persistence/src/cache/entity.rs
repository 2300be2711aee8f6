//! Reference entity kinds and their refresh queries.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A kind of reference data held by the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceEntity {
    Condition,
    Drug,
    Gender,
    Race,
    VisitType,
    Ethnicity,
}

impl ReferenceEntity {
    /// All entities in refresh order.
    pub const ALL: [ReferenceEntity; 6] = [
        ReferenceEntity::Condition,
        ReferenceEntity::Drug,
        ReferenceEntity::Gender,
        ReferenceEntity::Race,
        ReferenceEntity::VisitType,
        ReferenceEntity::Ethnicity,
    ];

    /// Returns the catalog domain tag, or `None` for label-only entities.
    pub fn domain_tag(&self) -> Option<&'static str> {
        match self {
            ReferenceEntity::Condition => Some("Condition"),
            ReferenceEntity::Drug => Some("Drug"),
            ReferenceEntity::Gender => Some("Gender"),
            ReferenceEntity::Race => Some("Race"),
            ReferenceEntity::VisitType => Some("Visit"),
            ReferenceEntity::Ethnicity => None,
        }
    }

    /// Returns true when the entity carries numeric codes.
    pub fn has_codes(&self) -> bool {
        self.domain_tag().is_some()
    }

    /// Returns the fact table and column whose distinct values are in use.
    pub fn fact_source(&self) -> (&'static str, &'static str) {
        match self {
            ReferenceEntity::Condition => ("condition_occurrence", "condition_concept_id"),
            ReferenceEntity::Drug => ("drug_exposure", "drug_concept_id"),
            ReferenceEntity::Gender => ("person", "gender_concept_id"),
            ReferenceEntity::Race => ("person", "race_concept_id"),
            ReferenceEntity::VisitType => ("visit_occurrence", "visit_concept_id"),
            ReferenceEntity::Ethnicity => ("person", "ethnicity_source_value"),
        }
    }

    /// Returns the refresh query.
    ///
    /// Coded entities take the domain tag as `?1` and yield `code, label`
    /// ordered by code. Ethnicity takes no arguments and yields `label`.
    pub fn refresh_query(&self) -> String {
        let (table, column) = self.fact_source();
        if self.has_codes() {
            format!(
                "SELECT c.concept_id AS code, c.concept_name AS label \
                 FROM concept c \
                 JOIN (SELECT DISTINCT {column} AS used_id FROM {table}) f \
                 ON c.concept_id = f.used_id \
                 WHERE c.domain_id = ?1 \
                 ORDER BY c.concept_id ASC"
            )
        } else {
            format!(
                "SELECT DISTINCT {column} AS label FROM {table} \
                 WHERE {column} IS NOT NULL \
                 ORDER BY {column} ASC"
            )
        }
    }

    /// Returns the snake_case name used in logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceEntity::Condition => "condition",
            ReferenceEntity::Drug => "drug",
            ReferenceEntity::Gender => "gender",
            ReferenceEntity::Race => "race",
            ReferenceEntity::VisitType => "visit_type",
            ReferenceEntity::Ethnicity => "ethnicity",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            ReferenceEntity::Condition => 0,
            ReferenceEntity::Drug => 1,
            ReferenceEntity::Gender => 2,
            ReferenceEntity::Race => 3,
            ReferenceEntity::VisitType => 4,
            ReferenceEntity::Ethnicity => 5,
        }
    }
}

impl fmt::Display for ReferenceEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_matches_declaration_order() {
        for (i, entity) in ReferenceEntity::ALL.iter().enumerate() {
            assert_eq!(entity.index(), i);
        }
    }

    #[test]
    fn test_domain_tags() {
        assert_eq!(ReferenceEntity::VisitType.domain_tag(), Some("Visit"));
        assert_eq!(ReferenceEntity::Ethnicity.domain_tag(), None);
        assert!(!ReferenceEntity::Ethnicity.has_codes());
    }

    #[test]
    fn test_refresh_query_shapes() {
        let q = ReferenceEntity::Drug.refresh_query();
        assert!(q.contains("SELECT DISTINCT drug_concept_id AS used_id FROM drug_exposure"));
        assert!(q.contains("c.domain_id = ?1"));

        let q = ReferenceEntity::Ethnicity.refresh_query();
        assert!(q.contains("ethnicity_source_value IS NOT NULL"));
        assert!(!q.contains("?1"));
    }
}
