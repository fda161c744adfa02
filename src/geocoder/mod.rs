use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::GeocoderConfig;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Geocoding is not configured")]
    NotConfigured,

    #[error("No results for '{0}'")]
    NoResults(String),

    #[error("Geocoder request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected geocoder response: {0}")]
    InvalidResponse(String),
}

/// A resolved address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

impl GeoLocation {
    /// GeoJSON point plus address parts, as stored on a bootcamp
    pub fn to_geojson(&self) -> Value {
        json!({
            "type": "Point",
            "coordinates": [self.longitude, self.latitude],
            "formattedAddress": self.formatted_address,
            "street": self.street,
            "city": self.city,
            "state": self.state,
            "zipcode": self.zipcode,
            "country": self.country,
        })
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<GeoLocation, GeocodeError>;

    /// Whether lookups can succeed at all
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Build the geocoder the configuration asks for
pub fn from_config(config: &GeocoderConfig) -> Box<dyn Geocoder> {
    match &config.api_key {
        Some(key) if !key.is_empty() => Box::new(MapQuestGeocoder::new(config.base_url.clone(), key.clone())),
        _ => {
            tracing::info!("No geocoder API key configured; bootcamps keep their plain address");
            Box::new(NoopGeocoder)
        }
    }
}

/// MapQuest geocoding API client
pub struct MapQuestGeocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MapQuestGeocoder {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MapQuestResponse {
    results: Vec<MapQuestResult>,
}

#[derive(Debug, Deserialize)]
struct MapQuestResult {
    locations: Vec<MapQuestLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapQuestLocation {
    lat_lng: LatLng,
    street: Option<String>,
    admin_area5: Option<String>,
    admin_area3: Option<String>,
    postal_code: Option<String>,
    admin_area1: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<MapQuestLocation> for GeoLocation {
    fn from(loc: MapQuestLocation) -> Self {
        let street = non_empty(loc.street);
        let city = non_empty(loc.admin_area5);
        let state = non_empty(loc.admin_area3);
        let zipcode = non_empty(loc.postal_code);
        let country = non_empty(loc.admin_area1);

        let state_zip = [state.as_deref(), zipcode.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let formatted_address = [street.as_deref(), city.as_deref(), Some(state_zip.as_str()), country.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            latitude: loc.lat_lng.lat,
            longitude: loc.lat_lng.lng,
            formatted_address,
            street,
            city,
            state,
            zipcode,
            country,
        }
    }
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeoLocation, GeocodeError> {
        let response: MapQuestResponse = self
            .client
            .get(&self.base_url)
            .query(&[("key", self.api_key.as_str()), ("location", address), ("maxResults", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let location = response
            .results
            .into_iter()
            .next()
            .and_then(|r| r.locations.into_iter().next())
            .ok_or_else(|| GeocodeError::NoResults(address.to_string()))?;
        tracing::debug!("Geocoded '{}' to {}, {}", address, location.lat_lng.lat, location.lat_lng.lng);
        Ok(location.into())
    }
}

/// Geocoder used when no API key is configured
pub struct NoopGeocoder;

#[async_trait]
impl Geocoder for NoopGeocoder {
    async fn geocode(&self, _address: &str) -> Result<GeoLocation, GeocodeError> {
        Err(GeocodeError::NotConfigured)
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Fixed address table, for tests and offline seeding
#[derive(Default)]
pub struct StaticGeocoder {
    entries: HashMap<String, GeoLocation>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, address: &str, location: GeoLocation) -> Self {
        self.entries.insert(address.to_string(), location);
        self
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeoLocation, GeocodeError> {
        self.entries
            .get(address)
            .cloned()
            .ok_or_else(|| GeocodeError::NoResults(address.to_string()))
    }
}
