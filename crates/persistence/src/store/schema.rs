//! Fixture schema for the warehouse tables the service reads.
//!
//! The production warehouse schema is fixed and owned elsewhere; this schema
//! only mirrors the columns the lookup service touches so that local
//! development databases and tests can be created from scratch. Datetimes are
//! stored as `YYYY-MM-DD HH:MM:SS` text and dates as `YYYY-MM-DD` text, which
//! keeps range comparisons lexicographic.

use rusqlite::Connection;

use crate::error::StorageResult;

const FIXTURE_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS concept (
        concept_id INTEGER PRIMARY KEY,
        concept_name TEXT NOT NULL,
        domain_id TEXT NOT NULL,
        vocabulary_id TEXT NOT NULL,
        concept_class_id TEXT NOT NULL,
        concept_code TEXT NOT NULL,
        valid_start_date TEXT NOT NULL DEFAULT '1970-01-01',
        valid_end_date TEXT NOT NULL DEFAULT '2099-12-31'
    );

    CREATE TABLE IF NOT EXISTS person (
        person_id INTEGER PRIMARY KEY,
        gender_concept_id INTEGER NOT NULL,
        birth_datetime TEXT,
        race_concept_id INTEGER NOT NULL,
        ethnicity_source_value TEXT
    );

    CREATE TABLE IF NOT EXISTS visit_occurrence (
        visit_occurrence_id INTEGER PRIMARY KEY,
        person_id INTEGER NOT NULL,
        visit_concept_id INTEGER NOT NULL,
        visit_start_datetime TEXT NOT NULL,
        visit_end_datetime TEXT
    );

    CREATE TABLE IF NOT EXISTS condition_occurrence (
        condition_occurrence_id INTEGER PRIMARY KEY,
        person_id INTEGER NOT NULL,
        condition_concept_id INTEGER NOT NULL,
        condition_start_datetime TEXT NOT NULL,
        condition_end_datetime TEXT,
        visit_occurrence_id INTEGER
    );

    CREATE TABLE IF NOT EXISTS drug_exposure (
        drug_exposure_id INTEGER PRIMARY KEY,
        person_id INTEGER NOT NULL,
        drug_concept_id INTEGER NOT NULL,
        drug_exposure_start_datetime TEXT NOT NULL,
        drug_exposure_end_datetime TEXT,
        visit_occurrence_id INTEGER
    );

    CREATE TABLE IF NOT EXISTS death (
        person_id INTEGER NOT NULL,
        death_date TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_concept_domain ON concept (domain_id);
    CREATE INDEX IF NOT EXISTS idx_visit_person ON visit_occurrence (person_id);
    CREATE INDEX IF NOT EXISTS idx_condition_person ON condition_occurrence (person_id);
    CREATE INDEX IF NOT EXISTS idx_drug_person ON drug_exposure (person_id);
";

/// Creates the fixture tables if they do not exist yet.
pub fn initialize_fixture_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(FIXTURE_SCHEMA)?;
    tracing::debug!("Fixture warehouse schema initialized");
    Ok(())
}
