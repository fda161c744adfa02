use uuid::Uuid;

use crate::auth::{generate_jwt, hash_password, verify_password, AuthError};
use crate::config::SecurityConfig;
use crate::database::document::Document;
use crate::database::models::{LoginInput, Role, UserInput};
use crate::database::{AdvancedResults, Repository, SharedStore};
use crate::error::ApiError;
use crate::filter::{Condition, QueryParams};
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::types::Collection;

/// A signed token and the user it was issued to
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub user: Document,
}

pub struct UserService {
    store: SharedStore,
    security: SecurityConfig,
    users: Repository,
}

impl UserService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            security: state.config.security.clone(),
            users: Repository::new(state.store.clone(), Collection::Users),
        }
    }

    pub async fn register(&self, input: UserInput) -> Result<IssuedToken, ApiError> {
        input.validate_register()?;
        let user = self.insert_user(&input).await?;
        tracing::info!("Registered user {}", user.get("email").and_then(|v| v.as_str()).unwrap_or_default());
        self.issue(user)
    }

    pub async fn login(&self, input: LoginInput) -> Result<IssuedToken, ApiError> {
        let (Some(email), Some(password)) = (input.email, input.password) else {
            return Err(ApiError::bad_request("Please provide an email and password"));
        };

        let user = self
            .users
            .select_one(vec![Condition::eq("email", email.trim().to_lowercase())])
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let stored = user.get("password").and_then(|v| v.as_str()).unwrap_or_default();
        let valid = verify_password(&password, stored).unwrap_or_else(|e| {
            tracing::warn!("Stored password for {} is unusable: {}", email, e);
            false
        });
        if !valid {
            return Err(AuthError::InvalidCredentials.into());
        }
        self.issue(user)
    }

    pub async fn me(&self, actor: &AuthUser) -> Result<Document, ApiError> {
        Ok(self.users.select_404(actor.id).await?)
    }

    pub async fn list(&self, actor: &AuthUser, params: &QueryParams) -> Result<AdvancedResults, ApiError> {
        actor.require_role(&[Role::Admin])?;
        let mut params = params.clone();
        // Hidden fields can not be matched through filters
        let hidden = Collection::Users.hidden_fields();
        params.criteria.conditions.retain(|c| !hidden.contains(&c.field.as_str()));
        Ok(self.users.advanced_results(&params, None).await?)
    }

    pub async fn get(&self, actor: &AuthUser, id: Uuid) -> Result<Document, ApiError> {
        actor.require_role(&[Role::Admin])?;
        Ok(self.users.select_404(id).await?)
    }

    pub async fn create(&self, actor: &AuthUser, input: UserInput) -> Result<Document, ApiError> {
        actor.require_role(&[Role::Admin])?;
        input.validate_create()?;
        self.insert_user(&input).await
    }

    pub async fn update(&self, actor: &AuthUser, id: Uuid, input: UserInput) -> Result<Document, ApiError> {
        actor.require_role(&[Role::Admin])?;
        input.validate_update()?;

        let mut patch = input.profile_patch();
        if let Some(password) = &input.password {
            patch.insert("password".to_string(), hash_password(password)?.into());
        }
        self.store
            .update_by_id(Collection::Users, id, patch)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("No user found with id {}", id)))
    }

    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> Result<(), ApiError> {
        actor.require_role(&[Role::Admin])?;
        self.store
            .delete_by_id(Collection::Users, id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("No user found with id {}", id)))?;
        Ok(())
    }

    async fn insert_user(&self, input: &UserInput) -> Result<Document, ApiError> {
        let mut doc = input.profile_patch();
        doc.insert("role".to_string(), input.role().as_str().into());
        let password = input.password.as_deref().unwrap_or_default();
        doc.insert("password".to_string(), hash_password(password)?.into());
        Ok(self.store.insert(Collection::Users, doc).await?)
    }

    fn issue(&self, user: Document) -> Result<IssuedToken, ApiError> {
        let id = crate::database::document::id_of(&user)
            .ok_or_else(|| ApiError::internal_server_error("Stored user has no id"))?;
        let token = generate_jwt(&self.security, id, Role::of(&user))?;
        Ok(IssuedToken { token, user })
    }
}
