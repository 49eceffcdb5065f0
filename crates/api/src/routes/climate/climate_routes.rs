use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use log::error;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

use crate::{reports, AppState, PrecipitationReading, TemperatureReading, TemperatureSummary};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RangeParams {
    /// Inclusive start date, YYYY-MM-DD
    pub start: String,
    /// Inclusive end date, YYYY-MM-DD; omit to run through the latest observation
    pub end: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1.0/precipitation",
    responses(
        (status = OK, description = "Precipitation readings for the reporting window, ordered by date", body = Vec<PrecipitationReading>),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query the climate store")
    ))]
pub async fn precipitation(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PrecipitationReading>>, (StatusCode, String)> {
    let readings = state.reports.precipitation().await.map_err(store_error)?;
    Ok(Json(readings))
}

#[utoipa::path(
    get,
    path = "/api/v1.0/stations",
    responses(
        (status = OK, description = "Identifiers of every station in the dataset", body = Vec<String>),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query the climate store")
    ))]
pub async fn stations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, (StatusCode, String)> {
    let stations = state.reports.stations().await.map_err(store_error)?;
    Ok(Json(stations))
}

#[utoipa::path(
    get,
    path = "/api/v1.0/tobs",
    responses(
        (status = OK, description = "Temperature readings for the most active station over the reporting window, ordered by date", body = Vec<TemperatureReading>),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query the climate store")
    ))]
pub async fn tobs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TemperatureReading>>, (StatusCode, String)> {
    let readings = state
        .reports
        .most_active_series()
        .await
        .map_err(store_error)?;
    Ok(Json(readings))
}

#[utoipa::path(
    get,
    path = "/api/v1.0/temperature",
    params(RangeParams),
    responses(
        (status = OK, description = "Min/avg/max temperature over the requested range; all fields null when no observations match", body = TemperatureSummary),
        (status = BAD_REQUEST, description = "Malformed date or inverted range"),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query the climate store")
    ))]
pub async fn temperature_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeParams>,
) -> Result<Json<TemperatureSummary>, (StatusCode, String)> {
    let summary = state
        .reports
        .range_summary(&params.start, params.end.as_deref())
        .await
        .map_err(|err| match err {
            reports::Error::InvalidDate { .. } | reports::Error::InvertedRange { .. } => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            reports::Error::Store(_) => store_error(err),
        })?;
    Ok(Json(summary))
}

fn store_error(err: reports::Error) -> (StatusCode, String) {
    error!("error querying climate store: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Failed to query climate data: {}", err),
    )
}
