use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use devcamper_api::config::AppConfig;
use devcamper_api::database::MemoryStore;
use devcamper_api::geocoder::NoopGeocoder;
use devcamper_api::server::app;
use devcamper_api::state::AppState;

fn router() -> Router {
    app(AppState::new(AppConfig::development(), Arc::new(MemoryStore::new()), Arc::new(NoopGeocoder)))
}

async fn call(router: &Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
    Ok((status, body))
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn health_and_root() -> Result<()> {
    let router = router();
    let (status, body) = call(&router, Request::get("/health").body(Body::empty())?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("ok"));

    let (status, body) = call(&router, Request::get("/").body(Body::empty())?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], json!("DevCamper API"));
    Ok(())
}

#[tokio::test]
async fn empty_listing_envelope() -> Result<()> {
    let router = router();
    let (status, body) = call(&router, Request::get("/api/v1/bootcamps").body(Body::empty())?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "count": 0, "pagination": {}, "data": [] }));
    Ok(())
}

#[tokio::test]
async fn without_geocoder_bootcamps_keep_their_address() -> Result<()> {
    let router = router();
    let register = json!({ "name": "Pub", "email": "pub@devcamper.io", "password": "123456", "role": "publisher" });
    let (status, body) = call(&router, json_request("POST", "/api/v1/auth/register", None, register)).await?;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let bootcamp = json!({ "name": "Offline", "description": "d", "address": "Somewhere", "careers": ["Other"] });
    let (status, body) = call(&router, json_request("POST", "/api/v1/bootcamps", Some(&token), bootcamp)).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["address"], json!("Somewhere"));
    assert!(body["data"].get("location").is_none());
    assert_eq!(body["data"]["averageCost"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn malformed_bodies_and_validation() -> Result<()> {
    let router = router();
    let register = json!({ "name": "Pub", "email": "pub@devcamper.io", "password": "123456", "role": "publisher" });
    let (_, body) = call(&router, json_request("POST", "/api/v1/auth/register", None, register)).await?;
    let token = body["token"].as_str().unwrap().to_string();

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/bootcamps")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from("{not json"))?;
    let (status, body) = call(&router, request).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("INVALID_JSON"));

    let (status, body) = call(&router, json_request("POST", "/api/v1/bootcamps", Some(&token), json!({}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("VALIDATION_ERROR"));
    assert!(body["fieldErrors"]["name"].is_string());
    Ok(())
}
