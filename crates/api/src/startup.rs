use crate::{
    db::{ClimateAccess, ClimateData},
    index, precipitation,
    reports::Reports,
    routes, stations, temperature_summary, tobs,
};
use axum::{
    body::Body,
    extract::Request,
    middleware::{self, Next},
    response::IntoResponse,
    routing::get,
    Router,
};
use hyper::{
    header::{ACCEPT, CONTENT_TYPE},
    Method,
};
use log::info;
use std::{sync::Arc, time::Duration};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Bound on a single request; every query is one finite scan, anything
/// slower than this is a stuck store call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct AppState {
    pub remote_url: String,
    pub reports: Arc<Reports>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::home::index::index,
        routes::climate::climate_routes::precipitation,
        routes::climate::climate_routes::stations,
        routes::climate::climate_routes::tobs,
        routes::climate::climate_routes::temperature_summary,
    ),
    components(
        schemas(
            routes::home::index::ApiIndex,
            crate::db::PrecipitationReading,
            crate::db::TemperatureReading,
            crate::reports::TemperatureSummary,
        )
    ),
    tags(
        (name = "hawaii climate api", description = "a read-only RESTful api over the Hawaii historical climate dataset")
    )
)]
struct ApiDoc;

pub fn build_app_state(remote_url: String, data_dir: String) -> AppState {
    let climate_db: Arc<dyn ClimateData> = Arc::new(ClimateAccess::new(data_dir));

    AppState {
        remote_url,
        reports: Arc::new(Reports::new(climate_db)),
    }
}

pub fn app(app_state: AppState) -> Router {
    let api_docs = ApiDoc::openapi();
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE])
        .allow_origin(Any);

    Router::new()
        .route("/", get(index))
        .route("/api/v1.0/precipitation", get(precipitation))
        .route("/api/v1.0/stations", get(stations))
        .route("/api/v1.0/tobs", get(tobs))
        .route("/api/v1.0/temperature", get(temperature_summary))
        .with_state(Arc::new(app_state))
        .layer(middleware::from_fn(log_request))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .merge(Scalar::with_url("/docs", api_docs))
        .layer(cors)
}

async fn log_request(request: Request<Body>, next: Next) -> impl IntoResponse {
    let now = time::OffsetDateTime::now_utc();
    let path = request
        .uri()
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or_default();
    info!(target: "http_request","new request, {} {}", request.method().as_str(), path);

    let response = next.run(request).await;
    let response_time = time::OffsetDateTime::now_utc() - now;
    info!(target: "http_response", "response, code: {}, time: {}", response.status().as_str(), response_time);

    response
}
