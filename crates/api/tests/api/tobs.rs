use crate::helpers::{spawn_app, MockClimateStore};
use axum::{
    body::{to_bytes, Body},
    http::Request,
};
use climate_api::{TemperatureReading, MOST_ACTIVE_STATION, WINDOW_END, WINDOW_START};
use hyper::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::test]
async fn tobs_is_pinned_to_the_most_active_station_and_window() {
    let mut climate_db = MockClimateStore::new();
    climate_db
        .expect_temperature()
        .withf(|filter| {
            filter.start == WINDOW_START
                && filter.end == Some(WINDOW_END)
                && filter.station.as_deref() == Some(MOST_ACTIVE_STATION)
        })
        .times(1)
        .returning(|_| Ok(mock_temperature_series()));

    let test_app = spawn_app(Arc::new(climate_db)).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1.0/tobs")
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
    let readings: Value = serde_json::from_slice(&body).unwrap();

    // order from the store is preserved, sorted by date
    assert_eq!(
        readings,
        json!([
            {"date": "2016-08-23", "temperature": 77.0},
            {"date": "2016-08-24", "temperature": 77.0},
            {"date": "2016-08-25", "temperature": 80.0},
        ])
    );
}

fn mock_temperature_series() -> Vec<TemperatureReading> {
    vec![
        TemperatureReading {
            date: String::from("2016-08-23"),
            temperature: 77.0,
        },
        TemperatureReading {
            date: String::from("2016-08-24"),
            temperature: 77.0,
        },
        TemperatureReading {
            date: String::from("2016-08-25"),
            temperature: 80.0,
        },
    ]
}
