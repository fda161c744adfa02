use std::sync::Arc;

use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::database::document::{get_path, id_of, Document};
use crate::database::models::{BootcampInput, Role};
use crate::database::{AdvancedResults, Repository, SharedStore};
use crate::error::ApiError;
use crate::filter::{Condition, FindQuery, Populate, QueryParams};
use crate::geocoder::Geocoder;
use crate::middleware::AuthUser;
use crate::observer::{ChangeEvent, ObserverPipeline};
use crate::services::ensure_owner;
use crate::state::AppState;
use crate::types::Collection;

/// Earth radius in miles, for converting a search distance to radians
pub const EARTH_RADIUS_MILES: f64 = 3963.0;

pub struct BootcampService {
    store: SharedStore,
    pipeline: Arc<ObserverPipeline>,
    geocoder: Arc<dyn Geocoder>,
    repository: Repository,
}

impl BootcampService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            pipeline: state.pipeline.clone(),
            geocoder: state.geocoder.clone(),
            repository: Repository::new(state.store.clone(), Collection::Bootcamps),
        }
    }

    pub async fn list(&self, params: &QueryParams) -> Result<AdvancedResults, ApiError> {
        Ok(self
            .repository
            .advanced_results(params, Some(&Populate::bootcamp_courses()))
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Document, ApiError> {
        Ok(self.repository.select_404(id).await?)
    }

    /// Publishers may own a single bootcamp; admins any number
    pub async fn create(&self, actor: &AuthUser, input: BootcampInput) -> Result<Document, ApiError> {
        actor.require_role(&[Role::Publisher, Role::Admin])?;
        input.validate_create()?;

        if !actor.is_admin() {
            let owned = self
                .repository
                .count(&[Condition::eq("user", actor.id.to_string())])
                .await?;
            if owned > 0 {
                return Err(ApiError::bad_request(format!(
                    "The user with ID {} has already published a bootcamp",
                    actor.id
                )));
            }
        }

        let mut doc = input.into_document(actor.id);
        self.locate(&mut doc).await?;

        let created = self.store.insert(Collection::Bootcamps, doc).await?;
        info!("Bootcamp {:?} created by {}", id_of(&created), actor.id);
        self.pipeline.notify(ChangeEvent::created(Collection::Bootcamps, created.clone())).await;
        Ok(created)
    }

    pub async fn update(&self, actor: &AuthUser, id: Uuid, input: BootcampInput) -> Result<Document, ApiError> {
        actor.require_role(&[Role::Publisher, Role::Admin])?;
        input.validate_update()?;

        let before = self.repository.select_404(id).await?;
        ensure_owner(&before, actor, "update", "bootcamp")?;

        let mut patch = input.to_patch();
        self.locate(&mut patch).await?;

        let after = self
            .store
            .update_by_id(Collection::Bootcamps, id, patch)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("No bootcamp found with id {}", id)))?;
        self.pipeline.notify(ChangeEvent::updated(Collection::Bootcamps, before, after.clone())).await;
        Ok(after)
    }

    /// Deleting a bootcamp cascades to its courses and reviews
    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> Result<(), ApiError> {
        actor.require_role(&[Role::Publisher, Role::Admin])?;

        let existing = self.repository.select_404(id).await?;
        ensure_owner(&existing, actor, "delete", "bootcamp")?;

        if let Some(removed) = self.store.delete_by_id(Collection::Bootcamps, id).await? {
            info!("Bootcamp {} deleted by {}", id, actor.id);
            self.pipeline.notify(ChangeEvent::deleted(Collection::Bootcamps, removed)).await;
        }
        Ok(())
    }

    /// Bootcamps whose location lies within `distance` miles of the zipcode
    pub async fn within_radius(&self, zipcode: &str, distance: f64) -> Result<Vec<Document>, ApiError> {
        if !distance.is_finite() || distance < 0.0 {
            return Err(ApiError::bad_request(format!("Invalid distance '{}'", distance)));
        }
        let origin = self.geocoder.geocode(zipcode).await?;
        let radius = distance / EARTH_RADIUS_MILES;

        let bootcamps = self.store.find(&FindQuery::all(Collection::Bootcamps)).await?;
        Ok(bootcamps
            .into_iter()
            .filter(|doc| {
                coordinates(doc).is_some_and(|(lng, lat)| {
                    angular_distance(origin.latitude, origin.longitude, lat, lng) <= radius
                })
            })
            .collect())
    }

    /// Replace `address` with a geocoded `location` when a geocoder is available
    async fn locate(&self, doc: &mut Document) -> Result<(), ApiError> {
        if !self.geocoder.is_enabled() {
            return Ok(());
        }
        let Some(address) = doc.get("address").and_then(Value::as_str).map(str::to_string) else {
            return Ok(());
        };
        let location = self.geocoder.geocode(&address).await?;
        doc.insert("location".to_string(), location.to_geojson());
        doc.remove("address");
        Ok(())
    }
}

/// `[longitude, latitude]` of a GeoJSON point
fn coordinates(doc: &Document) -> Option<(f64, f64)> {
    let coords = get_path(doc, "location.coordinates")?.as_array()?;
    Some((coords.first()?.as_f64()?, coords.get(1)?.as_f64()?))
}

/// Central angle between two points, in radians (haversine)
pub fn angular_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}
