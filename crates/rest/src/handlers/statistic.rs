//! Statistics handlers.
//!
//! Count endpoints answer with `{ "count": n }`. Category endpoints take the
//! category value as an optional trailing path segment; when it is missing or
//! not a known value the response is `INVALID_DATA` carrying the accepted
//! values, which lets clients discover them.

use axum::extract::{Path, State};
use cdm_lookup_persistence::aggregate::{self, CategoryCount, CountQuery};
use cdm_lookup_persistence::query::SqlFragment;
use cdm_lookup_persistence::store::DataStore;
use chrono::Local;
use serde_json::json;
use tracing::debug;

use crate::error::RestResult;
use crate::responses::Envelope;
use crate::state::AppState;

/// `GET /statistic/person/person_count`
pub async fn person_count_handler<D>(State(state): State<AppState<D>>) -> RestResult<Envelope>
where
    D: DataStore + 'static,
{
    run_count(state, aggregate::persons()).await
}

/// `GET /statistic/person/death_count`
pub async fn death_count_handler<D>(State(state): State<AppState<D>>) -> RestResult<Envelope>
where
    D: DataStore + 'static,
{
    run_count(state, aggregate::deaths()).await
}

/// `GET /statistic/person/gender_count[/{gender}]`
pub async fn person_gender_count_handler<D>(
    State(state): State<AppState<D>>,
    value: Option<Path<String>>,
) -> RestResult<Envelope>
where
    D: DataStore + 'static,
{
    run_category(state, CategoryCount::PersonGender, value).await
}

/// `GET /statistic/person/race_count[/{race}]`
pub async fn person_race_count_handler<D>(
    State(state): State<AppState<D>>,
    value: Option<Path<String>>,
) -> RestResult<Envelope>
where
    D: DataStore + 'static,
{
    run_category(state, CategoryCount::PersonRace, value).await
}

/// `GET /statistic/person/ethnicity_count[/{ethnicity}]`
pub async fn person_ethnicity_count_handler<D>(
    State(state): State<AppState<D>>,
    value: Option<Path<String>>,
) -> RestResult<Envelope>
where
    D: DataStore + 'static,
{
    run_category(state, CategoryCount::PersonEthnicity, value).await
}

/// `GET /statistic/visit/visit_type_count[/{visit_type}]`
pub async fn visit_type_count_handler<D>(
    State(state): State<AppState<D>>,
    value: Option<Path<String>>,
) -> RestResult<Envelope>
where
    D: DataStore + 'static,
{
    run_category(state, CategoryCount::VisitType, value).await
}

/// `GET /statistic/visit/gender_count[/{gender}]`
pub async fn visit_gender_count_handler<D>(
    State(state): State<AppState<D>>,
    value: Option<Path<String>>,
) -> RestResult<Envelope>
where
    D: DataStore + 'static,
{
    run_category(state, CategoryCount::VisitGender, value).await
}

/// `GET /statistic/visit/race_count[/{race}]`
pub async fn visit_race_count_handler<D>(
    State(state): State<AppState<D>>,
    value: Option<Path<String>>,
) -> RestResult<Envelope>
where
    D: DataStore + 'static,
{
    run_category(state, CategoryCount::VisitRace, value).await
}

/// `GET /statistic/visit/ethnicity_count[/{ethnicity}]`
pub async fn visit_ethnicity_count_handler<D>(
    State(state): State<AppState<D>>,
    value: Option<Path<String>>,
) -> RestResult<Envelope>
where
    D: DataStore + 'static,
{
    run_category(state, CategoryCount::VisitEthnicity, value).await
}

/// `GET /statistic/visit/age_count[/{age}]`
///
/// Counts visits by people aged `[age, age + 10)` today. `age` must be a
/// non-negative multiple of ten; otherwise the bucket markers are returned.
pub async fn visit_age_count_handler<D>(
    State(state): State<AppState<D>>,
    value: Option<Path<String>>,
) -> RestResult<Envelope>
where
    D: DataStore + 'static,
{
    let value = value.map(|Path(value)| value);
    match aggregate::age_count(value.as_deref(), Local::now().naive_local()) {
        CountQuery::Count(fragment) => run_count(state, fragment).await,
        CountQuery::Invalid(markers) => Ok(Envelope::invalid_data(markers)),
    }
}

async fn run_category<D>(
    state: AppState<D>,
    count: CategoryCount,
    value: Option<Path<String>>,
) -> RestResult<Envelope>
where
    D: DataStore + 'static,
{
    let value = value.map(|Path(value)| value);
    let view = state.cache().view();
    match aggregate::category_count(count, value.as_deref(), &view) {
        CountQuery::Count(fragment) => run_count(state, fragment).await,
        CountQuery::Invalid(labels) => {
            debug!(?count, value = ?value, "Unknown category value");
            Ok(Envelope::invalid_data(labels))
        }
    }
}

async fn run_count<D>(state: AppState<D>, fragment: SqlFragment) -> RestResult<Envelope>
where
    D: DataStore + 'static,
{
    let service = state.service();
    let count = tokio::task::spawn_blocking(move || service.count(&fragment)).await??;
    Ok(Envelope::success(json!({ "count": count })))
}
