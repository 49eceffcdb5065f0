use crate::helpers::{spawn_app, MockClimateStore};
use axum::{
    body::{to_bytes, Body},
    http::Request,
};
use hyper::Method;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::test]
async fn index_lists_the_available_routes() {
    let climate_db = MockClimateStore::new();
    let test_app = spawn_app(Arc::new(climate_db)).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/")
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
    let index: Value = serde_json::from_slice(&body).unwrap();

    let routes: Vec<String> = index["routes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r.as_str().unwrap().to_owned())
        .collect();

    assert_eq!(routes.len(), 4);
    assert!(routes
        .iter()
        .any(|r| r == "http://localhost:9420/api/v1.0/precipitation"));
    assert!(routes
        .iter()
        .any(|r| r == "http://localhost:9420/api/v1.0/tobs"));
}
