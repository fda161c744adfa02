use std::sync::Arc;

use uuid::Uuid;

use crate::database::document::Document;
use crate::database::models::{ReviewInput, Role};
use crate::database::{AdvancedResults, DatabaseError, Repository, SharedStore};
use crate::error::ApiError;
use crate::filter::{Populate, QueryParams};
use crate::middleware::AuthUser;
use crate::observer::{ChangeEvent, ObserverPipeline};
use crate::services::ensure_owner;
use crate::state::AppState;
use crate::types::Collection;

pub struct ReviewService {
    store: SharedStore,
    pipeline: Arc<ObserverPipeline>,
    reviews: Repository,
    bootcamps: Repository,
}

impl ReviewService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            pipeline: state.pipeline.clone(),
            reviews: Repository::new(state.store.clone(), Collection::Reviews),
            bootcamps: Repository::new(state.store.clone(), Collection::Bootcamps),
        }
    }

    pub async fn list(&self, params: &QueryParams) -> Result<AdvancedResults, ApiError> {
        Ok(self
            .reviews
            .advanced_results(params, Some(&Populate::bootcamp_summary()))
            .await?)
    }

    pub async fn list_for_bootcamp(&self, bootcamp_id: Uuid, params: &QueryParams) -> Result<AdvancedResults, ApiError> {
        let params = params.scoped("bootcamp", bootcamp_id.to_string());
        Ok(self
            .reviews
            .advanced_results(&params, Some(&Populate::bootcamp_summary()))
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Document, ApiError> {
        let review = self.reviews.select_404(id).await?;
        self.reviews
            .populate(vec![review], &Populate::bootcamp_summary())
            .await?
            .pop()
            .ok_or_else(|| ApiError::not_found(format!("No review found with id {}", id)))
    }

    /// One review per user per bootcamp
    pub async fn create(&self, actor: &AuthUser, bootcamp_id: Uuid, input: ReviewInput) -> Result<Document, ApiError> {
        actor.require_role(&[Role::User, Role::Admin])?;

        self.bootcamps.select_404(bootcamp_id).await?;
        input.validate_create()?;

        let created = self
            .store
            .insert(Collection::Reviews, input.into_document(bootcamp_id, actor.id))
            .await
            .map_err(|err| match err {
                DatabaseError::Duplicate(_) => {
                    ApiError::conflict(format!("User {} has already reviewed this bootcamp", actor.id))
                }
                other => other.into(),
            })?;
        tracing::info!("Review added to bootcamp {} by {}", bootcamp_id, actor.id);
        self.pipeline.notify(ChangeEvent::created(Collection::Reviews, created.clone())).await;
        Ok(created)
    }

    pub async fn update(&self, actor: &AuthUser, id: Uuid, input: ReviewInput) -> Result<Document, ApiError> {
        actor.require_role(&[Role::User, Role::Admin])?;
        input.validate_update()?;

        let before = self.reviews.select_404(id).await?;
        ensure_owner(&before, actor, "update", "review")?;

        let after = self
            .store
            .update_by_id(Collection::Reviews, id, input.to_patch())
            .await?
            .ok_or_else(|| ApiError::not_found(format!("No review found with id {}", id)))?;
        self.pipeline.notify(ChangeEvent::updated(Collection::Reviews, before, after.clone())).await;
        Ok(after)
    }

    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> Result<(), ApiError> {
        actor.require_role(&[Role::User, Role::Admin])?;

        let existing = self.reviews.select_404(id).await?;
        ensure_owner(&existing, actor, "delete", "review")?;

        if let Some(removed) = self.store.delete_by_id(Collection::Reviews, id).await? {
            self.pipeline.notify(ChangeEvent::deleted(Collection::Reviews, removed)).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::document::id_of;
    use serde_json::json;

    fn actor(role: Role) -> AuthUser {
        AuthUser { id: Uuid::new_v4(), role, name: "t".into() }
    }

    fn review(rating: u8) -> ReviewInput {
        serde_json::from_value(json!({ "title": "Solid", "text": "Learned a lot", "rating": rating })).unwrap()
    }

    async fn bootcamp(state: &AppState) -> Uuid {
        let doc = json!({ "name": "Devworks", "user": Uuid::new_v4().to_string() }).as_object().unwrap().clone();
        id_of(&state.store.insert(Collection::Bootcamps, doc).await.unwrap()).unwrap()
    }

    async fn average_rating(state: &AppState, id: Uuid) -> Option<f64> {
        state
            .store
            .find_by_id(Collection::Bootcamps, id)
            .await
            .unwrap()
            .unwrap()
            .get("averageRating")
            .and_then(|v| v.as_f64())
    }

    #[tokio::test]
    async fn ratings_from_three_users() {
        let state = AppState::in_memory(AppConfig::development());
        let service = ReviewService::new(&state);
        let id = bootcamp(&state).await;

        for rating in [8, 7, 7] {
            service.create(&actor(Role::User), id, review(rating)).await.unwrap();
        }
        assert_eq!(average_rating(&state, id).await, Some(7.33));
    }

    #[tokio::test]
    async fn second_review_by_same_user_conflicts() {
        let state = AppState::in_memory(AppConfig::development());
        let service = ReviewService::new(&state);
        let id = bootcamp(&state).await;
        let author = actor(Role::User);

        service.create(&author, id, review(8)).await.unwrap();
        let err = service.create(&author, id, review(2)).await.unwrap_err();
        assert_eq!(err.status_code(), 409);
        assert_eq!(average_rating(&state, id).await, Some(8.0));
    }

    #[tokio::test]
    async fn publishers_can_not_review() {
        let state = AppState::in_memory(AppConfig::development());
        let service = ReviewService::new(&state);
        let id = bootcamp(&state).await;
        let err = service.create(&actor(Role::Publisher), id, review(8)).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn only_the_author_edits() {
        let state = AppState::in_memory(AppConfig::development());
        let service = ReviewService::new(&state);
        let id = bootcamp(&state).await;
        let author = actor(Role::User);
        let created = service.create(&author, id, review(4)).await.unwrap();
        let review_id = id_of(&created).unwrap();

        let err = service.update(&actor(Role::User), review_id, review(10)).await.unwrap_err();
        assert_eq!(err.status_code(), 403);

        service.update(&author, review_id, review(10)).await.unwrap();
        assert_eq!(average_rating(&state, id).await, Some(10.0));

        service.delete(&actor(Role::Admin), review_id).await.unwrap();
        assert_eq!(average_rating(&state, id).await, None);
    }
}
