use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::database::document::Document;
use crate::database::models::{CourseInput, Role};
use crate::database::{AdvancedResults, Repository, SharedStore};
use crate::error::ApiError;
use crate::filter::{Populate, QueryParams};
use crate::middleware::AuthUser;
use crate::observer::{ChangeEvent, ObserverPipeline};
use crate::services::ensure_owner;
use crate::state::AppState;
use crate::types::Collection;

pub struct CourseService {
    store: SharedStore,
    pipeline: Arc<ObserverPipeline>,
    courses: Repository,
    bootcamps: Repository,
}

impl CourseService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            pipeline: state.pipeline.clone(),
            courses: Repository::new(state.store.clone(), Collection::Courses),
            bootcamps: Repository::new(state.store.clone(), Collection::Bootcamps),
        }
    }

    /// Advanced-results listing across all bootcamps
    pub async fn list(&self, params: &QueryParams) -> Result<AdvancedResults, ApiError> {
        Ok(self
            .courses
            .advanced_results(params, Some(&Populate::bootcamp_summary()))
            .await?)
    }

    /// Advanced-results listing scoped to one bootcamp
    pub async fn list_for_bootcamp(&self, bootcamp_id: Uuid, params: &QueryParams) -> Result<AdvancedResults, ApiError> {
        let params = params.scoped("bootcamp", bootcamp_id.to_string());
        Ok(self
            .courses
            .advanced_results(&params, Some(&Populate::bootcamp_summary()))
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Document, ApiError> {
        let course = self.courses.select_404(id).await?;
        let mut populated = self
            .courses
            .populate(vec![course], &Populate::bootcamp_summary())
            .await?;
        populated
            .pop()
            .ok_or_else(|| ApiError::not_found(format!("No course found with id {}", id)))
    }

    /// Add a course to an existing bootcamp owned by the actor
    pub async fn create(&self, actor: &AuthUser, bootcamp_id: Uuid, input: CourseInput) -> Result<Document, ApiError> {
        actor.require_role(&[Role::Publisher, Role::Admin])?;

        // The parent must exist before anything is written
        let bootcamp = self.bootcamps.select_404(bootcamp_id).await?;
        ensure_owner(&bootcamp, actor, "add a course to", "bootcamp")?;
        input.validate_create()?;

        let created = self
            .store
            .insert(Collection::Courses, input.into_document(bootcamp_id, actor.id))
            .await?;
        info!("Course added to bootcamp {} by {}", bootcamp_id, actor.id);
        self.pipeline.notify(ChangeEvent::created(Collection::Courses, created.clone())).await;
        Ok(created)
    }

    pub async fn update(&self, actor: &AuthUser, id: Uuid, input: CourseInput) -> Result<Document, ApiError> {
        actor.require_role(&[Role::Publisher, Role::Admin])?;
        input.validate_update()?;

        let before = self.courses.select_404(id).await?;
        ensure_owner(&before, actor, "update", "course")?;

        let after = self
            .store
            .update_by_id(Collection::Courses, id, input.to_patch())
            .await?
            .ok_or_else(|| ApiError::not_found(format!("No course found with id {}", id)))?;
        self.pipeline.notify(ChangeEvent::updated(Collection::Courses, before, after.clone())).await;
        Ok(after)
    }

    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> Result<(), ApiError> {
        actor.require_role(&[Role::Publisher, Role::Admin])?;

        let existing = self.courses.select_404(id).await?;
        ensure_owner(&existing, actor, "delete", "course")?;

        if let Some(removed) = self.store.delete_by_id(Collection::Courses, id).await? {
            self.pipeline.notify(ChangeEvent::deleted(Collection::Courses, removed)).await;
        }
        Ok(())
    }
}
