use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::AppState;

/// The API surface advertised at the root route
#[derive(Serialize, ToSchema)]
pub struct ApiIndex {
    pub routes: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = OK, description = "Lists the available API routes", body = ApiIndex)
    ))]
pub async fn index(State(state): State<Arc<AppState>>) -> Json<ApiIndex> {
    let routes = [
        "/api/v1.0/precipitation",
        "/api/v1.0/stations",
        "/api/v1.0/tobs",
        "/api/v1.0/temperature?start=YYYY-MM-DD&end=YYYY-MM-DD",
    ]
    .iter()
    .map(|route| format!("{}{}", state.remote_url, route))
    .collect();

    Json(ApiIndex { routes })
}
