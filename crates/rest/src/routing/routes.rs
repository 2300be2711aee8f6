//! Route table for the lookup API.

use axum::{Router, routing::get};
use cdm_lookup_persistence::store::DataStore;

use crate::handlers;
use crate::state::AppState;

/// Creates all API routes.
///
/// # Routes
///
/// ## Search
/// - `GET /search/{condition,drug,person,visit,death,concept}` (trailing slash accepted)
///
/// ## Statistics
/// - `GET /statistic/person/person_count`
/// - `GET /statistic/person/{gender,race,ethnicity}_count[/{value}]`
/// - `GET /statistic/person/death_count`
/// - `GET /statistic/visit/{visit_type,gender,race,ethnicity}_count[/{value}]`
/// - `GET /statistic/visit/age_count[/{age}]`
///
/// ## System
/// - `GET /health`
///
/// Any other path answers `404` with a `STATUS_ERROR` envelope.
pub fn create_routes<D>(state: AppState<D>) -> Router
where
    D: DataStore + 'static,
{
    Router::new()
        .route("/health", get(handlers::health_handler::<D>))
        .merge(search_routes::<D>())
        .nest("/statistic/person", person_statistic_routes::<D>())
        .nest("/statistic/visit", visit_statistic_routes::<D>())
        .fallback(handlers::not_found_handler)
        .with_state(state)
}

fn search_routes<D>() -> Router<AppState<D>>
where
    D: DataStore + 'static,
{
    Router::new()
        .route("/search/condition", get(handlers::condition_handler::<D>))
        .route("/search/condition/", get(handlers::condition_handler::<D>))
        .route("/search/drug", get(handlers::drug_handler::<D>))
        .route("/search/drug/", get(handlers::drug_handler::<D>))
        .route("/search/person", get(handlers::person_handler::<D>))
        .route("/search/person/", get(handlers::person_handler::<D>))
        .route("/search/visit", get(handlers::visit_handler::<D>))
        .route("/search/visit/", get(handlers::visit_handler::<D>))
        .route("/search/death", get(handlers::death_handler::<D>))
        .route("/search/death/", get(handlers::death_handler::<D>))
        .route("/search/concept", get(handlers::concept_handler::<D>))
        .route("/search/concept/", get(handlers::concept_handler::<D>))
}

fn person_statistic_routes<D>() -> Router<AppState<D>>
where
    D: DataStore + 'static,
{
    Router::new()
        .route("/person_count", get(handlers::person_count_handler::<D>))
        .route(
            "/gender_count",
            get(handlers::person_gender_count_handler::<D>),
        )
        .route(
            "/gender_count/{gender}",
            get(handlers::person_gender_count_handler::<D>),
        )
        .route("/race_count", get(handlers::person_race_count_handler::<D>))
        .route(
            "/race_count/{race}",
            get(handlers::person_race_count_handler::<D>),
        )
        .route(
            "/ethnicity_count",
            get(handlers::person_ethnicity_count_handler::<D>),
        )
        .route(
            "/ethnicity_count/{ethnicity}",
            get(handlers::person_ethnicity_count_handler::<D>),
        )
        .route("/death_count", get(handlers::death_count_handler::<D>))
}

fn visit_statistic_routes<D>() -> Router<AppState<D>>
where
    D: DataStore + 'static,
{
    Router::new()
        .route(
            "/visit_type_count",
            get(handlers::visit_type_count_handler::<D>),
        )
        .route(
            "/visit_type_count/{visit_type}",
            get(handlers::visit_type_count_handler::<D>),
        )
        .route("/gender_count", get(handlers::visit_gender_count_handler::<D>))
        .route(
            "/gender_count/{gender}",
            get(handlers::visit_gender_count_handler::<D>),
        )
        .route("/race_count", get(handlers::visit_race_count_handler::<D>))
        .route(
            "/race_count/{race}",
            get(handlers::visit_race_count_handler::<D>),
        )
        .route(
            "/ethnicity_count",
            get(handlers::visit_ethnicity_count_handler::<D>),
        )
        .route(
            "/ethnicity_count/{ethnicity}",
            get(handlers::visit_ethnicity_count_handler::<D>),
        )
        .route("/age_count", get(handlers::visit_age_count_handler::<D>))
        .route(
            "/age_count/{age}",
            get(handlers::visit_age_count_handler::<D>),
        )
}
