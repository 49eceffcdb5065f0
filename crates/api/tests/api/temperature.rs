use crate::helpers::{spawn_app, store_unavailable, MockClimateStore};
use axum::{
    body::{to_bytes, Body},
    http::Request,
};
use climate_api::TemperatureStats;
use hyper::{Method, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use time::macros::date;
use tower::ServiceExt;

#[tokio::test]
async fn closed_range_reduces_the_requested_interval() {
    let mut climate_db = MockClimateStore::new();
    // the dataset's final day, reduced across all stations
    climate_db
        .expect_temperature_stats()
        .withf(|filter| {
            filter.start == date!(2017 - 08 - 23)
                && filter.end == Some(date!(2017 - 08 - 23))
                && filter.station.is_none()
        })
        .times(1)
        .returning(|_| {
            Ok(TemperatureStats {
                min: Some(72.0),
                avg: Some(79.25),
                max: Some(87.0),
            })
        });

    let test_app = spawn_app(Arc::new(climate_db)).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1.0/temperature?start=2017-08-23&end=2017-08-23")
        .body(Body::empty())
        .unwrap();

    let response = test_app
        .app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let summary: Value = serde_json::from_slice(&body).unwrap();

    // the average comes back rounded, min and max untouched
    assert_eq!(
        summary,
        json!({"TMIN": 72.0, "TAVG": 79.0, "TMAX": 87.0})
    );
}

#[tokio::test]
async fn open_ended_range_runs_through_the_latest_observation() {
    let mut climate_db = MockClimateStore::new();
    climate_db
        .expect_temperature_stats()
        .withf(|filter| filter.start == date!(2016 - 08 - 23) && filter.end.is_none())
        .times(1)
        .returning(|_| {
            Ok(TemperatureStats {
                min: Some(58.0),
                avg: Some(74.59),
                max: Some(87.0),
            })
        });

    let test_app = spawn_app(Arc::new(climate_db)).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1.0/temperature?start=2016-08-23")
        .body(Body::empty())
        .unwrap();

    let response = test_app
        .app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let summary: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(
        summary,
        json!({"TMIN": 58.0, "TAVG": 75.0, "TMAX": 87.0})
    );
}

#[tokio::test]
async fn range_beyond_the_dataset_returns_null_fields() {
    let mut climate_db = MockClimateStore::new();
    climate_db
        .expect_temperature_stats()
        .times(1)
        .returning(|_| Ok(TemperatureStats::default()));

    let test_app = spawn_app(Arc::new(climate_db)).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1.0/temperature?start=9999-01-01")
        .body(Body::empty())
        .unwrap();

    let response = test_app
        .app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let summary: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(
        summary,
        json!({"TMIN": null, "TAVG": null, "TMAX": null})
    );
}

/// Malformed dates are rejected up front rather than flowing into the query
/// layer and silently matching nothing.
#[tokio::test]
async fn malformed_start_is_rejected_before_the_store_is_queried() {
    // no expectations on the mock, a store call would fail the test
    let climate_db = MockClimateStore::new();
    let test_app = spawn_app(Arc::new(climate_db)).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1.0/temperature?start=not-a-date")
        .body(Body::empty())
        .unwrap();

    let response = test_app
        .app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_end_is_rejected_before_the_store_is_queried() {
    let climate_db = MockClimateStore::new();
    let test_app = spawn_app(Arc::new(climate_db)).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1.0/temperature?start=2016-08-23&end=2017-13-40")
        .body(Body::empty())
        .unwrap();

    let response = test_app
        .app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn inverted_range_is_rejected_not_silently_empty() {
    let climate_db = MockClimateStore::new();
    let test_app = spawn_app(Arc::new(climate_db)).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1.0/temperature?start=2017-08-23&end=2016-08-23")
        .body(Body::empty())
        .unwrap();

    let response = test_app
        .app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let message = String::from_utf8(body.to_vec()).unwrap();
    assert!(message.contains("earlier than start date"));
}

#[tokio::test]
async fn missing_start_is_a_bad_request() {
    let climate_db = MockClimateStore::new();
    let test_app = spawn_app(Arc::new(climate_db)).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1.0/temperature")
        .body(Body::empty())
        .unwrap();

    let response = test_app
        .app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn store_failure_is_surfaced_as_a_server_error() {
    let mut climate_db = MockClimateStore::new();
    climate_db
        .expect_temperature_stats()
        .times(1)
        .returning(|_| Err(store_unavailable()));

    let test_app = spawn_app(Arc::new(climate_db)).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1.0/temperature?start=2016-08-23")
        .body(Body::empty())
        .unwrap();

    let response = test_app
        .app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

/// Repeated identical calls against the static dataset agree with each other
#[tokio::test]
async fn identical_requests_return_identical_results() {
    let mut climate_db = MockClimateStore::new();
    climate_db
        .expect_temperature_stats()
        .times(2)
        .returning(|_| {
            Ok(TemperatureStats {
                min: Some(62.0),
                avg: Some(69.57),
                max: Some(74.0),
            })
        });

    let test_app = spawn_app(Arc::new(climate_db)).await;

    let mut bodies = Vec::new();
    for _ in 0..2 {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/api/v1.0/temperature?start=2017-01-01&end=2017-01-07")
            .body(Body::empty())
            .unwrap();

        let response = test_app
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request.");

        assert!(response.status().is_success());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let summary: Value = serde_json::from_slice(&body).unwrap();
        bodies.push(summary);
    }

    assert_eq!(bodies[0], bodies[1]);
}
