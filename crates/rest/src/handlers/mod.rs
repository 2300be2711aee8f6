//! HTTP request handlers.
//!
//! - [`search`] - Paginated entity search under `/search`
//! - [`statistic`] - Aggregate counts under `/statistic`
//! - [`health`] - Health check endpoint
//! - [`fallback`] - Enveloped `404` for unknown paths

pub mod fallback;
pub mod health;
pub mod search;
pub mod statistic;

// Re-export handlers for convenience
pub use fallback::not_found_handler;
pub use health::health_handler;
pub use search::{
    concept_handler, condition_handler, death_handler, drug_handler, person_handler,
    visit_handler,
};
pub use statistic::{
    death_count_handler, person_count_handler, person_ethnicity_count_handler,
    person_gender_count_handler, person_race_count_handler, visit_age_count_handler,
    visit_ethnicity_count_handler, visit_gender_count_handler, visit_race_count_handler,
    visit_type_count_handler,
};
