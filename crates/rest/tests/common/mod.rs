//! Common test utilities for REST API testing.
//!
//! Builds an in-memory warehouse seeded with a small fixture, refreshes the
//! reference cache against it and wraps the router in a [`TestServer`].

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum_test::TestServer;
use cdm_lookup_persistence::cache::ReferenceCache;
use cdm_lookup_persistence::store::sqlite::SqliteStore;
use cdm_lookup_rest::{ServerConfig, create_app_with_config};
use serde_json::Value;

/// Fixture rows shared by the integration tests.
///
/// - 4 persons, two of each gender, one with no ethnicity
/// - 4 visits; visit 13 ends in 2021 and visit 12 has no end
/// - 4 hypertension conditions, 3 of them in 2020
/// - 1 drug exposure and 1 death
pub const SEED: &str = "
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

/// Creates a seeded in-memory store with a freshly refreshed cache.
pub fn seeded_store() -> (Arc<SqliteStore>, Arc<ReferenceCache>) {
    let store = SqliteStore::in_memory().expect("Failed to create SQLite store");
    seed_and_refresh(store)
}

/// Creates a seeded file-backed store under `path`.
pub fn seeded_file_store(path: &Path) -> (Arc<SqliteStore>, Arc<ReferenceCache>) {
    let store = SqliteStore::open(path).expect("Failed to open SQLite database");
    seed_and_refresh(store)
}

fn seed_and_refresh(store: SqliteStore) -> (Arc<SqliteStore>, Arc<ReferenceCache>) {
    store.init_fixture_schema().expect("Failed to initialize schema");
    store
        .with_connection(|conn| conn.execute_batch(SEED))
        .expect("Failed to seed fixture data");

    let store = Arc::new(store);
    let cache = Arc::new(ReferenceCache::new());
    let report = cache.refresh_all(store.as_ref());
    assert!(report.is_complete(), "refresh failed for {:?}", report.failed());

    (store, cache)
}

/// Creates a test server over the seeded fixture.
pub fn create_test_server() -> (TestServer, Arc<SqliteStore>) {
    create_test_server_with_config(ServerConfig::for_testing())
}

/// Creates a test server over the seeded fixture with custom configuration.
pub fn create_test_server_with_config(config: ServerConfig) -> (TestServer, Arc<SqliteStore>) {
    let (store, cache) = seeded_store();
    let app = create_app_with_config(Arc::clone(&store), cache, config);
    let server = TestServer::new(app).expect("Failed to create test server");
    (server, store)
}

/// Returns the list under `data.<key>` of a search response.
pub fn payload<'a>(body: &'a Value, key: &str) -> &'a Vec<Value> {
    body["data"][key]
        .as_array()
        .unwrap_or_else(|| panic!("missing data.{key} in {body}"))
}

/// Returns `data.count` of a statistics response.
pub fn count(body: &Value) -> u64 {
    body["data"]["count"]
        .as_u64()
        .unwrap_or_else(|| panic!("missing data.count in {body}"))
}
