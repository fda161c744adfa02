pub mod bootcamp_service;
pub mod course_service;
pub mod review_service;
pub mod user_service;

pub use bootcamp_service::BootcampService;
pub use course_service::CourseService;
pub use review_service::ReviewService;
pub use user_service::UserService;

use uuid::Uuid;

use crate::database::document::{reference, Document};
use crate::error::ApiError;
use crate::middleware::AuthUser;

/// Path ids that are not UUIDs can never match a document
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(format!("No {} found with id {}", what, raw)))
}

/// Only the document's `user` or an admin may modify it
pub fn ensure_owner(doc: &Document, actor: &AuthUser, action: &str, what: &str) -> Result<(), ApiError> {
    if actor.is_admin() || reference(doc, "user") == Some(actor.id) {
        return Ok(());
    }
    Err(ApiError::forbidden(format!(
        "User {} is not authorized to {} this {}",
        actor.id, action, what
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Role;
    use serde_json::json;

    #[test]
    fn owner_or_admin() {
        let owner = AuthUser { id: Uuid::new_v4(), role: Role::Publisher, name: "p".into() };
        let admin = AuthUser { id: Uuid::new_v4(), role: Role::Admin, name: "a".into() };
        let other = AuthUser { id: Uuid::new_v4(), role: Role::Publisher, name: "o".into() };
        let doc = json!({ "user": owner.id.to_string() }).as_object().unwrap().clone();

        assert!(ensure_owner(&doc, &owner, "update", "bootcamp").is_ok());
        assert!(ensure_owner(&doc, &admin, "update", "bootcamp").is_ok());
        assert_eq!(ensure_owner(&doc, &other, "update", "bootcamp").unwrap_err().status_code(), 403);
    }

    #[test]
    fn malformed_ids_are_not_found() {
        assert_eq!(parse_id("abc", "bootcamp").unwrap_err().status_code(), 404);
        assert!(parse_id(&Uuid::new_v4().to_string(), "bootcamp").is_ok());
    }
}
