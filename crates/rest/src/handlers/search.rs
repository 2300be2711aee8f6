//! Search handlers.
//!
//! One handler per searchable entity:
//! - `GET /search/condition`
//! - `GET /search/drug`
//! - `GET /search/person`
//! - `GET /search/visit`
//! - `GET /search/death`
//! - `GET /search/concept`
//!
//! Each responds with `{ "status": "SUCCESS", "data": { <entity key>: [...] } }`.
//! Unknown label values produce an empty list, malformed values produce
//! `INVALID_DATA` and storage failures produce `DATABASE_ERROR`.

use axum::extract::{Query, State, rejection::QueryRejection};
use cdm_lookup_persistence::query::{EntitySearch, Page};
use cdm_lookup_persistence::store::DataStore;
use tracing::debug;

use crate::error::RestResult;
use crate::extractors::SearchParams;
use crate::responses::Envelope;
use crate::state::AppState;

type SearchQuery = Result<Query<SearchParams>, QueryRejection>;

/// Handler for `GET /search/condition`.
///
/// Parameters: `person_id`, `visit_id`, `condition`, `date` (range), `page`, `page_size`.
pub async fn condition_handler<D>(
    State(state): State<AppState<D>>,
    query: SearchQuery,
) -> RestResult<Envelope>
where
    D: DataStore + 'static,
{
    let Query(params) = query?;
    let filter = params.condition_filter()?;
    let page = params.page(state.default_page_size())?;
    run_search(state, filter, page).await
}

/// Handler for `GET /search/drug`.
///
/// Parameters: `person_id`, `visit_id`, `drug`, `date` (range), `page`, `page_size`.
pub async fn drug_handler<D>(
    State(state): State<AppState<D>>,
    query: SearchQuery,
) -> RestResult<Envelope>
where
    D: DataStore + 'static,
{
    let Query(params) = query?;
    let filter = params.drug_filter()?;
    let page = params.page(state.default_page_size())?;
    run_search(state, filter, page).await
}

/// Handler for `GET /search/person`.
///
/// Parameters: `birth`, `gender`, `race`, `ethnicity`, `page`, `page_size`.
pub async fn person_handler<D>(
    State(state): State<AppState<D>>,
    query: SearchQuery,
) -> RestResult<Envelope>
where
    D: DataStore + 'static,
{
    let Query(params) = query?;
    let filter = params.person_filter()?;
    let page = params.page(state.default_page_size())?;
    run_search(state, filter, page).await
}

/// Handler for `GET /search/visit`.
///
/// Parameters: `person_id`, `visit_type`, `date` (range), `page`, `page_size`.
pub async fn visit_handler<D>(
    State(state): State<AppState<D>>,
    query: SearchQuery,
) -> RestResult<Envelope>
where
    D: DataStore + 'static,
{
    let Query(params) = query?;
    let filter = params.visit_filter()?;
    let page = params.page(state.default_page_size())?;
    run_search(state, filter, page).await
}

/// Handler for `GET /search/death`.
///
/// Parameters: `person_id`, `date` (single day), `page`, `page_size`.
pub async fn death_handler<D>(
    State(state): State<AppState<D>>,
    query: SearchQuery,
) -> RestResult<Envelope>
where
    D: DataStore + 'static,
{
    let Query(params) = query?;
    let filter = params.death_filter()?;
    let page = params.page(state.default_page_size())?;
    run_search(state, filter, page).await
}

/// Handler for `GET /search/concept`.
///
/// Parameters: `keyword`, `page`, `page_size`.
pub async fn concept_handler<D>(
    State(state): State<AppState<D>>,
    query: SearchQuery,
) -> RestResult<Envelope>
where
    D: DataStore + 'static,
{
    let Query(params) = query?;
    let filter = params.concept_filter()?;
    let page = params.page(state.default_page_size())?;
    run_search(state, filter, page).await
}

async fn run_search<D, F>(state: AppState<D>, filter: F, page: Page) -> RestResult<Envelope>
where
    D: DataStore + 'static,
    F: EntitySearch + std::fmt::Debug + Send + 'static,
{
    debug!(entity = %F::ENTITY, filter = ?filter, page = ?page, "Processing search request");

    let service = state.service();
    let result = tokio::task::spawn_blocking(move || service.search(&filter, page)).await??;

    debug!(entity = %F::ENTITY, count = result.items.len(), "Search completed");
    Ok(Envelope::keyed(F::ENTITY.payload_key(), result.items))
}
