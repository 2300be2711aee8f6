//! Per-entity search filters.
//!
//! Every filter struct declares its optional fields in the order their
//! predicates are ANDed together. Label fields are resolved through a
//! [`CacheView`]; an unknown label binds NULL and the search returns no rows.

use std::fmt;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::builder::{DateRange, FilterQueryBuilder, Page, Predicate};
use super::fragment::{SqlFragment, SqlParam};
use crate::cache::{CacheView, ReferenceEntity};
use crate::error::StorageResult;
use crate::projection::{
    self, ConceptRecord, ConditionRecord, DeathRecord, DrugRecord, PersonRecord, VisitRecord,
};
use crate::store::Row;

/// A searchable warehouse entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchEntity {
    Condition,
    Drug,
    Person,
    Visit,
    Death,
    Concept,
}

impl SearchEntity {
    pub const ALL: [SearchEntity; 6] = [
        SearchEntity::Condition,
        SearchEntity::Drug,
        SearchEntity::Person,
        SearchEntity::Visit,
        SearchEntity::Death,
        SearchEntity::Concept,
    ];

    /// Returns the warehouse table.
    pub fn table(&self) -> &'static str {
        match self {
            SearchEntity::Condition => "condition_occurrence",
            SearchEntity::Drug => "drug_exposure",
            SearchEntity::Person => "person",
            SearchEntity::Visit => "visit_occurrence",
            SearchEntity::Death => "death",
            SearchEntity::Concept => "concept",
        }
    }

    /// Returns the select clause with columns aliased to projection names.
    pub fn select_clause(&self) -> &'static str {
        match self {
            SearchEntity::Condition => {
                "SELECT person_id, visit_occurrence_id AS visit_id, \
                 condition_concept_id AS concept_id, \
                 condition_start_datetime AS start_date, \
                 condition_end_datetime AS end_date \
                 FROM condition_occurrence"
            }
            SearchEntity::Drug => {
                "SELECT person_id, visit_occurrence_id AS visit_id, \
                 drug_concept_id AS concept_id, \
                 drug_exposure_start_datetime AS start_date, \
                 drug_exposure_end_datetime AS end_date \
                 FROM drug_exposure"
            }
            SearchEntity::Person => {
                "SELECT person_id, birth_datetime AS birth, gender_concept_id, \
                 race_concept_id, ethnicity_source_value AS ethnicity \
                 FROM person"
            }
            SearchEntity::Visit => {
                "SELECT visit_occurrence_id AS visit_id, person_id, visit_concept_id, \
                 visit_start_datetime AS start_date, \
                 visit_end_datetime AS end_date \
                 FROM visit_occurrence"
            }
            SearchEntity::Death => "SELECT person_id, death_date AS date FROM death",
            SearchEntity::Concept => {
                "SELECT concept_id AS id, concept_code AS code, concept_name AS name, \
                 concept_class_id AS class, valid_end_date, domain_id AS domain, \
                 vocabulary_id AS vocabulary \
                 FROM concept"
            }
        }
    }

    /// Returns the ordering keys. Together they identify a row, so pages
    /// never overlap or skip rows.
    pub fn order_key(&self) -> &'static [&'static str] {
        match self {
            SearchEntity::Condition => &["person_id", "condition_occurrence_id"],
            SearchEntity::Drug => &["person_id", "drug_exposure_id"],
            SearchEntity::Person => &["person_id"],
            SearchEntity::Visit => &["visit_occurrence_id"],
            SearchEntity::Death => &["person_id", "death_date"],
            SearchEntity::Concept => &["concept_id"],
        }
    }

    /// Returns the key the result list is wrapped in.
    pub fn payload_key(&self) -> &'static str {
        match self {
            SearchEntity::Condition => "conditions",
            SearchEntity::Drug => "drugs",
            SearchEntity::Person => "persons",
            SearchEntity::Visit => "visits",
            SearchEntity::Death => "death",
            SearchEntity::Concept => "concepts",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchEntity::Condition => "condition",
            SearchEntity::Drug => "drug",
            SearchEntity::Person => "person",
            SearchEntity::Visit => "visit",
            SearchEntity::Death => "death",
            SearchEntity::Concept => "concept",
        }
    }
}

impl fmt::Display for SearchEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A filter set for one searchable entity.
pub trait EntitySearch {
    /// Projection produced for each row.
    type Item: Serialize + Send + 'static;

    /// The entity this filter searches.
    const ENTITY: SearchEntity;

    /// Returns the predicates in AND order.
    fn predicates(&self, view: &CacheView) -> Vec<Predicate>;

    /// Projects result rows.
    fn project(rows: &[Row], view: &CacheView) -> StorageResult<Vec<Self::Item>>;

    /// Builds the paginated query.
    fn build(&self, view: &CacheView, page: Page) -> SqlFragment {
        FilterQueryBuilder::new(Self::ENTITY.select_clause())
            .filters(self.predicates(view))
            .order_by(Self::ENTITY.order_key())
            .paginate(page)
            .build()
    }
}

fn label_predicate(
    column: &'static str,
    view: &CacheView,
    entity: ReferenceEntity,
    label: Option<&str>,
) -> Option<Predicate> {
    label.map(|label| Predicate::eq(column, view.get(entity).bind(label)))
}

fn id_predicate(column: &'static str, id: Option<i64>) -> Option<Predicate> {
    id.map(|id| Predicate::eq(column, SqlParam::integer(id)))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionFilter {
    pub person_id: Option<i64>,
    pub visit_id: Option<i64>,
    pub condition: Option<String>,
    pub date: Option<DateRange>,
}

impl EntitySearch for ConditionFilter {
    type Item = ConditionRecord;
    const ENTITY: SearchEntity = SearchEntity::Condition;

    fn predicates(&self, view: &CacheView) -> Vec<Predicate> {
        [
            id_predicate("person_id", self.person_id),
            id_predicate("visit_occurrence_id", self.visit_id),
            label_predicate(
                "condition_concept_id",
                view,
                ReferenceEntity::Condition,
                self.condition.as_deref(),
            ),
            self.date.map(|range| {
                Predicate::within("condition_start_datetime", "condition_end_datetime", range)
            }),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn project(rows: &[Row], view: &CacheView) -> StorageResult<Vec<Self::Item>> {
        projection::conditions(rows, view.get(ReferenceEntity::Condition))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrugFilter {
    pub person_id: Option<i64>,
    pub visit_id: Option<i64>,
    pub drug: Option<String>,
    pub date: Option<DateRange>,
}

impl EntitySearch for DrugFilter {
    type Item = DrugRecord;
    const ENTITY: SearchEntity = SearchEntity::Drug;

    fn predicates(&self, view: &CacheView) -> Vec<Predicate> {
        [
            id_predicate("person_id", self.person_id),
            id_predicate("visit_occurrence_id", self.visit_id),
            label_predicate(
                "drug_concept_id",
                view,
                ReferenceEntity::Drug,
                self.drug.as_deref(),
            ),
            self.date.map(|range| {
                Predicate::within(
                    "drug_exposure_start_datetime",
                    "drug_exposure_end_datetime",
                    range,
                )
            }),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn project(rows: &[Row], view: &CacheView) -> StorageResult<Vec<Self::Item>> {
        projection::drugs(rows, view.get(ReferenceEntity::Drug))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonFilter {
    pub birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub race: Option<String>,
    pub ethnicity: Option<String>,
}

impl EntitySearch for PersonFilter {
    type Item = PersonRecord;
    const ENTITY: SearchEntity = SearchEntity::Person;

    fn predicates(&self, view: &CacheView) -> Vec<Predicate> {
        [
            self.birth
                .map(|birth| Predicate::on_day("birth_datetime", birth)),
            label_predicate(
                "gender_concept_id",
                view,
                ReferenceEntity::Gender,
                self.gender.as_deref(),
            ),
            label_predicate(
                "race_concept_id",
                view,
                ReferenceEntity::Race,
                self.race.as_deref(),
            ),
            label_predicate(
                "ethnicity_source_value",
                view,
                ReferenceEntity::Ethnicity,
                self.ethnicity.as_deref(),
            ),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn project(rows: &[Row], view: &CacheView) -> StorageResult<Vec<Self::Item>> {
        projection::persons(
            rows,
            view.get(ReferenceEntity::Gender),
            view.get(ReferenceEntity::Race),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitFilter {
    pub person_id: Option<i64>,
    pub visit_type: Option<String>,
    pub date: Option<DateRange>,
}

impl EntitySearch for VisitFilter {
    type Item = VisitRecord;
    const ENTITY: SearchEntity = SearchEntity::Visit;

    fn predicates(&self, view: &CacheView) -> Vec<Predicate> {
        [
            id_predicate("person_id", self.person_id),
            label_predicate(
                "visit_concept_id",
                view,
                ReferenceEntity::VisitType,
                self.visit_type.as_deref(),
            ),
            self.date.map(|range| {
                Predicate::within("visit_start_datetime", "visit_end_datetime", range)
            }),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn project(rows: &[Row], view: &CacheView) -> StorageResult<Vec<Self::Item>> {
        projection::visits(rows, view.get(ReferenceEntity::VisitType))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeathFilter {
    pub person_id: Option<i64>,
    pub date: Option<NaiveDate>,
}

impl EntitySearch for DeathFilter {
    type Item = DeathRecord;
    const ENTITY: SearchEntity = SearchEntity::Death;

    fn predicates(&self, _view: &CacheView) -> Vec<Predicate> {
        [
            id_predicate("person_id", self.person_id),
            self.date
                .map(|date| Predicate::eq("death_date", SqlParam::date(date))),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn project(rows: &[Row], _view: &CacheView) -> StorageResult<Vec<Self::Item>> {
        projection::deaths(rows)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConceptFilter {
    pub keyword: Option<String>,
}

impl EntitySearch for ConceptFilter {
    type Item = ConceptRecord;
    const ENTITY: SearchEntity = SearchEntity::Concept;

    fn predicates(&self, _view: &CacheView) -> Vec<Predicate> {
        self.keyword
            .iter()
            .map(|keyword| Predicate::contains("concept_name", keyword.as_str()))
            .collect()
    }

    fn project(rows: &[Row], _view: &CacheView) -> StorageResult<Vec<Self::Item>> {
        projection::concepts(rows, Local::now().naive_local())
    }
}
