#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

use devcamper_api::config::AppConfig;
use devcamper_api::database::MemoryStore;
use devcamper_api::geocoder::{GeoLocation, StaticGeocoder};
use devcamper_api::server;
use devcamper_api::state::AppState;

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
}

/// Addresses the test geocoder can resolve
pub const BOSTON: &str = "233 Bay State Rd Boston MA 02215";
pub const PROVIDENCE: &str = "45 Upper College Rd Kingston RI 02881";

fn location(lat: f64, lng: f64, zipcode: &str) -> GeoLocation {
    GeoLocation {
        latitude: lat,
        longitude: lng,
        formatted_address: zipcode.to_string(),
        street: None,
        city: None,
        state: None,
        zipcode: Some(zipcode.to_string()),
        country: Some("US".to_string()),
    }
}

impl TestServer {
    /// Start an isolated in-process server on a free port, backed by a fresh in-memory store
    pub async fn start() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let geocoder = StaticGeocoder::new()
            .with(BOSTON, location(42.35, -71.1, "02215"))
            .with(PROVIDENCE, location(41.48, -71.53, "02881"))
            .with("02118", location(42.34, -71.07, "02118"));
        let state = AppState::new(AppConfig::development(), Arc::new(MemoryStore::new()), Arc::new(geocoder));

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, server::app(state)).await;
        });

        let server = Self { port, base_url, client: reqwest::Client::new() };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn api(&self, path: &str) -> String {
        self.url(&format!("/api/v1{}", path))
    }

    /// Register a user with the given role and return its token
    pub async fn register(&self, name: &str, role: &str) -> Result<String> {
        let body = json!({
            "name": name,
            "email": format!("{}@devcamper.io", name.to_lowercase()),
            "password": "123456",
            "role": role
        });
        let res = self.client.post(self.api("/auth/register")).json(&body).send().await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "register failed: {}", res.status());
        let body: Value = res.json().await?;
        body["token"].as_str().map(str::to_string).context("no token in register response")
    }

    pub async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.client.get(self.api(path)).send().await?;
        Ok((res.status(), res.json().await?))
    }

    pub async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        token: &str,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut req = self.client.request(method, self.api(path)).bearer_auth(token);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await?;
        Ok((res.status(), res.json().await?))
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(reqwest::Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(reqwest::Method::PUT, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.send(reqwest::Method::DELETE, path, token, None).await
    }

    /// Create a bootcamp as the given publisher and return its id
    pub async fn create_bootcamp(&self, token: &str, name: &str, address: &str) -> Result<String> {
        let body = json!({
            "name": name,
            "description": format!("{} teaches everything", name),
            "address": address,
            "careers": ["Web Development", "UI/UX"],
            "housing": true
        });
        let (status, body) = self.post("/bootcamps", token, body).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create bootcamp failed: {} {}", status, body);
        body["data"]["_id"].as_str().map(str::to_string).context("no bootcamp id")
    }

    pub async fn create_course(&self, token: &str, bootcamp: &str, title: &str, tuition: u64, weeks: u32) -> Result<String> {
        let body = json!({
            "title": title,
            "description": "Hands-on course",
            "weeks": weeks,
            "tuition": tuition,
            "minimumSkill": "beginner"
        });
        let (status, body) = self.post(&format!("/bootcamps/{}/courses", bootcamp), token, body).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create course failed: {} {}", status, body);
        body["data"]["_id"].as_str().map(str::to_string).context("no course id")
    }
}
