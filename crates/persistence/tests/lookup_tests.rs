//! End-to-end tests of the reference cache, filter builder and lookup service
//! against an in-memory SQLite warehouse.

#![cfg(feature = "sqlite")]

use std::sync::Arc;

use chrono::NaiveDate;

use cdm_lookup_persistence::aggregate::{self, CategoryCount, CountQuery};
use cdm_lookup_persistence::cache::{ReferenceCache, ReferenceEntity};
use cdm_lookup_persistence::query::{
    ConceptFilter, ConditionFilter, DateRange, DeathFilter, DrugFilter, Page, PersonFilter,
    VisitFilter,
};
use cdm_lookup_persistence::service::LookupService;
use cdm_lookup_persistence::store::sqlite::SqliteStore;

const SEED: &str = "
    INSERT INTO concept (concept_id, concept_name, domain_id, vocabulary_id, concept_class_id, concept_code, valid_end_date) VALUES
        (320128, 'Essential hypertension', 'Condition', 'SNOMED', 'Clinical Finding', '59621000', '2099-12-31'),
        (201826, 'Type 2 diabetes mellitus', 'Condition', 'SNOMED', 'Clinical Finding', '44054006', '2099-12-31'),
        (4329847, 'Myocardial infarction', 'Condition', 'SNOMED', 'Clinical Finding', '22298006', '2010-01-01'),
        (1503297, 'metformin', 'Drug', 'RxNorm', 'Ingredient', '6809', '2099-12-31'),
        (8507, 'MALE', 'Gender', 'Gender', 'Gender', 'M', '2099-12-31'),
        (8532, 'FEMALE', 'Gender', 'Gender', 'Gender', 'F', '2099-12-31'),
        (8527, 'White', 'Race', 'Race', 'Race', '5', '2099-12-31'),
        (8516, 'Black or African American', 'Race', 'Race', 'Race', '3', '2099-12-31'),
        (9201, 'Inpatient Visit', 'Visit', 'Visit', 'Visit', 'IP', '2099-12-31'),
        (9202, 'Outpatient Visit', 'Visit', 'Visit', 'Visit', 'OP', '2099-12-31');

    INSERT INTO person (person_id, gender_concept_id, birth_datetime, race_concept_id, ethnicity_source_value) VALUES
        (1, 8507, '1960-04-12 00:00:00', 8527, 'Not Hispanic'),
        (2, 8532, '1975-09-30 00:00:00', 8516, 'Hispanic'),
        (3, 8532, '1988-01-15 00:00:00', 8527, NULL),
        (4, 8507, '2001-07-07 00:00:00', 8516, 'Not Hispanic');

    INSERT INTO visit_occurrence (visit_occurrence_id, person_id, visit_concept_id, visit_start_datetime, visit_end_datetime) VALUES
        (10, 1, 9201, '2020-02-01 09:00:00', '2020-02-05 12:00:00'),
        (11, 2, 9202, '2020-06-10 10:00:00', '2020-06-10 11:00:00'),
        (12, 3, 9202, '2019-11-20 08:00:00', NULL),
        (13, 4, 9201, '2020-12-30 22:00:00', '2021-01-02 10:00:00');

    INSERT INTO condition_occurrence (condition_occurrence_id, person_id, condition_concept_id, condition_start_datetime, condition_end_datetime, visit_occurrence_id) VALUES
        (100, 1, 320128, '2020-02-01 09:30:00', '2020-02-05 10:00:00', 10),
        (101, 2, 320128, '2020-06-10 10:15:00', '2020-06-10 10:45:00', 11),
        (102, 3, 320128, '2020-12-31 00:00:00', '2020-12-31 23:00:00', NULL),
        (103, 3, 320128, '2019-11-20 08:10:00', '2019-11-20 09:00:00', 12),
        (104, 4, 201826, '2020-03-03 00:00:00', '2020-03-04 00:00:00', NULL);

    INSERT INTO drug_exposure (drug_exposure_id, person_id, drug_concept_id, drug_exposure_start_datetime, drug_exposure_end_datetime, visit_occurrence_id) VALUES
        (200, 4, 1503297, '2020-03-03 00:00:00', NULL, NULL);

    INSERT INTO death (person_id, death_date) VALUES
        (1, '2021-05-01');
";

fn create_service() -> LookupService<SqliteStore> {
    let store = SqliteStore::in_memory().expect("Failed to create SQLite store");
    store.init_fixture_schema().expect("Failed to initialize schema");
    store
        .with_connection(|conn| conn.execute_batch(SEED))
        .expect("Failed to seed fixture data");

    let store = Arc::new(store);
    let cache = Arc::new(ReferenceCache::new());
    assert!(cache.refresh_all(store.as_ref()).is_complete());
    LookupService::new(store, cache)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ============================================================================
// Reference Cache
// ============================================================================

#[test]
fn test_every_code_round_trips() {
    let service = create_service();
    let cache = service.cache();

    for entity in ReferenceEntity::ALL.iter().filter(|e| e.has_codes()) {
        for label in cache.labels(*entity) {
            let code = cache.resolve(*entity, &label).unwrap();
            assert_eq!(cache.reverse_resolve(*entity, code), Some(label.clone()));
            assert_eq!(
                cache.resolve(*entity, &cache.reverse_resolve(*entity, code).unwrap()),
                Some(code)
            );
        }
    }
}

#[test]
fn test_unused_catalog_concepts_are_not_cached() {
    let service = create_service();
    let cache = service.cache();

    assert_eq!(
        cache.labels(ReferenceEntity::Condition),
        vec!["Essential hypertension", "Type 2 diabetes mellitus"]
    );
    assert_eq!(cache.resolve(ReferenceEntity::Condition, "Myocardial infarction"), None);
    assert_eq!(
        cache.labels(ReferenceEntity::Ethnicity),
        vec!["Hispanic", "Not Hispanic"]
    );
}

// ============================================================================
// Search
// ============================================================================

#[test]
fn test_condition_label_and_range() {
    let service = create_service();
    let filter = ConditionFilter {
        condition: Some("Essential hypertension".to_string()),
        date: Some(DateRange::new(date(2020, 1, 1), date(2020, 12, 31))),
        ..Default::default()
    };

    let page = service.search(&filter, Page::default()).unwrap();
    assert_eq!(page.items.len(), 3);
    for record in &page.items {
        assert_eq!(
            record.condition_concept_name.as_deref(),
            Some("Essential hypertension")
        );
    }
    let persons: Vec<i64> = page.items.iter().map(|r| r.person_id).collect();
    assert_eq!(persons, vec![1, 2, 3]);
}

#[test]
fn test_unknown_label_yields_empty_page() {
    let service = create_service();

    let conditions = ConditionFilter {
        condition: Some("Not a condition".to_string()),
        ..Default::default()
    };
    assert!(service.search(&conditions, Page::default()).unwrap().items.is_empty());

    let persons = PersonFilter {
        ethnicity: Some("Martian".to_string()),
        ..Default::default()
    };
    assert!(service.search(&persons, Page::default()).unwrap().items.is_empty());

    let visits = VisitFilter {
        visit_type: Some("Teleport Visit".to_string()),
        ..Default::default()
    };
    assert!(service.search(&visits, Page::default()).unwrap().items.is_empty());
}

#[test]
fn test_pages_are_disjoint_and_contiguous() {
    let service = create_service();
    let filter = VisitFilter::default();

    let all = service.search(&filter, Page::first(10)).unwrap().items;
    let first = service.search(&filter, Page::new(0, 2)).unwrap().items;
    let second = service.search(&filter, Page::new(1, 2)).unwrap().items;

    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    assert_eq!(&all[0..2], first.as_slice());
    assert_eq!(&all[2..4], second.as_slice());
}

#[test]
fn test_same_person_rows_page_in_id_order() {
    let service = create_service();
    service
        .store()
        .with_connection(|conn| {
            conn.execute_batch(
                "INSERT INTO condition_occurrence (condition_occurrence_id, person_id, condition_concept_id, condition_start_datetime, condition_end_datetime, visit_occurrence_id) VALUES
                    (107, 1, 201826, '2018-01-01 00:00:00', NULL, NULL),
                    (105, 1, 201826, '2022-01-01 00:00:00', NULL, NULL),
                    (106, 1, 201826, '2016-01-01 00:00:00', NULL, NULL);",
            )
        })
        .unwrap();

    let filter = ConditionFilter {
        person_id: Some(1),
        ..Default::default()
    };
    let mut starts = Vec::new();
    for page in 0..5 {
        let items = service.search(&filter, Page::new(page, 1)).unwrap().items;
        starts.extend(items.into_iter().map(|item| item.start_date));
    }

    // condition_occurrence_id 100, 105, 106, 107
    assert_eq!(
        starts,
        vec![
            Some(date(2020, 2, 1)),
            Some(date(2022, 1, 1)),
            Some(date(2016, 1, 1)),
            Some(date(2018, 1, 1)),
        ]
    );
}

#[test]
fn test_person_search() {
    let service = create_service();

    let filter = PersonFilter {
        gender: Some("FEMALE".to_string()),
        race: Some("White".to_string()),
        ..Default::default()
    };
    let page = service.search(&filter, Page::default()).unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].person_id, 3);
    assert_eq!(page.items[0].ethnicity, None);
    assert_eq!(page.items[0].race_concept_name.as_deref(), Some("White"));

    let filter = PersonFilter {
        birth: Some(date(1975, 9, 30)),
        ethnicity: Some("Hispanic".to_string()),
        ..Default::default()
    };
    let page = service.search(&filter, Page::default()).unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].birth, Some(date(1975, 9, 30)));
}

#[test]
fn test_visit_search_range_excludes_overflowing_visit() {
    let service = create_service();
    let filter = VisitFilter {
        date: Some(DateRange::new(date(2020, 1, 1), date(2020, 12, 31))),
        ..Default::default()
    };

    let ids: Vec<i64> = service
        .search(&filter, Page::default())
        .unwrap()
        .items
        .iter()
        .map(|v| v.visit_id)
        .collect();
    assert_eq!(ids, vec![10, 11]);
}

#[test]
fn test_drug_death_and_concept_search() {
    let service = create_service();

    let drugs = service
        .search(
            &DrugFilter {
                person_id: Some(4),
                ..Default::default()
            },
            Page::default(),
        )
        .unwrap();
    assert_eq!(drugs.items.len(), 1);
    assert_eq!(drugs.items[0].drug_concept_name.as_deref(), Some("metformin"));
    assert_eq!(drugs.items[0].end_date, None);

    let deaths = service
        .search(
            &DeathFilter {
                date: Some(date(2021, 5, 1)),
                ..Default::default()
            },
            Page::default(),
        )
        .unwrap();
    assert_eq!(deaths.items.len(), 1);

    let concepts = service
        .search(
            &ConceptFilter {
                keyword: Some("infarct".to_string()),
            },
            Page::default(),
        )
        .unwrap();
    assert_eq!(concepts.items.len(), 1);
    assert_eq!(
        serde_json::to_value(&concepts.items[0]).unwrap()["validity"],
        "Invalid"
    );
}

// ============================================================================
// Counts
// ============================================================================

#[test]
fn test_category_counts() {
    let service = create_service();
    let view = service.cache().view();

    let CountQuery::Count(query) =
        aggregate::category_count(CategoryCount::PersonGender, Some("FEMALE"), &view)
    else {
        panic!("expected a count query");
    };
    assert_eq!(service.count(&query).unwrap(), 2);

    let CountQuery::Count(query) = aggregate::category_count(
        CategoryCount::VisitEthnicity,
        Some("Not Hispanic"),
        &view,
    ) else {
        panic!("expected a count query");
    };
    assert_eq!(service.count(&query).unwrap(), 2);

    let CountQuery::Count(query) = aggregate::category_count(
        CategoryCount::VisitType,
        Some("Outpatient Visit"),
        &view,
    ) else {
        panic!("expected a count query");
    };
    assert_eq!(service.count(&query).unwrap(), 2);

    assert_eq!(service.count(&aggregate::deaths()).unwrap(), 1);
    assert_eq!(service.count(&aggregate::persons()).unwrap(), 4);
}

#[test]
fn test_age_bucket_count() {
    let service = create_service();
    let now = date(2024, 1, 1).and_hms_opt(12, 0, 0).unwrap();

    // Person 4 is 22 on the reference date and has one visit.
    let CountQuery::Count(query) = aggregate::age_count(Some("20"), now) else {
        panic!("expected a count query");
    };
    assert_eq!(service.count(&query).unwrap(), 1);

    let CountQuery::Count(query) = aggregate::age_count(Some("0"), now) else {
        panic!("expected a count query");
    };
    assert_eq!(service.count(&query).unwrap(), 0);
}
