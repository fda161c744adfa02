use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{is_valid_email, slugify, to_patch, trimmed, ValidationErrors};
use crate::database::document::Document;

pub const CAREERS: [&str; 6] = [
    "Web Development",
    "Mobile Development",
    "UI/UX",
    "Data Science",
    "Business",
    "Other",
];

pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

/// Client-writable bootcamp fields. Denormalized aggregates, `slug` and `user` are never
/// taken from the request.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootcampInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub careers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub housing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_assistance: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_guarantee: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept_gi: Option<bool>,
}

impl BootcampInput {
    fn normalized(&self) -> Self {
        Self {
            name: trimmed(&self.name),
            address: trimmed(&self.address),
            ..self.clone()
        }
    }

    pub fn validate_create(&self) -> Result<(), ValidationErrors> {
        let input = self.normalized();
        let mut errors = ValidationErrors::default();
        errors.require("name", &input.name, "Please add a name");
        errors.require("description", &input.description, "Please add a description");
        errors.require("address", &input.address, "Please add an address");
        errors.require("careers", &input.careers, "Please add at least one career");
        input.check_fields(&mut errors);
        errors.into_result()
    }

    pub fn validate_update(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let input = self.normalized();
        if self.name.is_some() && input.name.is_none() {
            errors.add("name", "Please add a name");
        }
        input.check_fields(&mut errors);
        errors.into_result()
    }

    fn check_fields(&self, errors: &mut ValidationErrors) {
        errors.max_len("name", &self.name, 50);
        errors.max_len("description", &self.description, 500);
        errors.max_len("phone", &self.phone, 20);

        if let Some(website) = &self.website {
            let valid = url::Url::parse(website)
                .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some_and(|h| h.contains('.')))
                .unwrap_or(false);
            if !valid {
                errors.add("website", "Please use a valid URL with HTTP or HTTPS");
            }
        }
        if let Some(email) = &self.email {
            if !is_valid_email(email) {
                errors.add("email", "Please add a valid email");
            }
        }
        if let Some(careers) = &self.careers {
            if careers.is_empty() {
                errors.add("careers", "Please add at least one career");
            } else if let Some(bad) = careers.iter().find(|c| !CAREERS.contains(&c.as_str())) {
                errors.add("careers", format!("'{}' is not a valid career", bad));
            }
        }
    }

    /// Patch of the supplied fields; a new name also refreshes the slug
    pub fn to_patch(&self) -> Document {
        let input = self.normalized();
        let mut patch = to_patch(&input);
        if let Some(name) = &input.name {
            patch.insert("slug".to_string(), Value::String(slugify(name)));
        }
        patch
    }

    /// Full document for a new bootcamp owned by `owner`
    pub fn into_document(self, owner: Uuid) -> Document {
        let mut doc = self.to_patch();
        doc.insert("photo".to_string(), Value::String(DEFAULT_PHOTO.to_string()));
        for flag in ["housing", "jobAssistance", "jobGuarantee", "acceptGi"] {
            doc.entry(flag.to_string()).or_insert(Value::Bool(false));
        }
        doc.insert("user".to_string(), Value::String(owner.to_string()));
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(value: Value) -> BootcampInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn builds_document_with_defaults_and_slug() {
        let owner = Uuid::new_v4();
        let doc = input(json!({
            "name": "  Devworks Bootcamp ",
            "description": "Full stack",
            "address": "233 Bay State Rd Boston MA 02215",
            "careers": ["Web Development"],
            "housing": true,
            "averageCost": 5
        }))
        .into_document(owner);

        assert_eq!(doc["name"], json!("Devworks Bootcamp"));
        assert_eq!(doc["slug"], json!("devworks-bootcamp"));
        assert_eq!(doc["housing"], json!(true));
        assert_eq!(doc["acceptGi"], json!(false));
        assert_eq!(doc["photo"], json!(DEFAULT_PHOTO));
        assert_eq!(doc["user"], json!(owner.to_string()));
        assert!(doc.get("averageCost").is_none());
    }

    #[test]
    fn create_requires_fields() {
        let errors = input(json!({ "name": " " })).validate_create().unwrap_err();
        for field in ["name", "description", "address", "careers"] {
            assert!(errors.field_errors.contains_key(field), "{}", field);
        }
    }

    #[test]
    fn rejects_bad_values() {
        let errors = input(json!({
            "website": "ftp://devworks.com",
            "email": "nope",
            "careers": ["Cooking"],
            "phone": "1".repeat(21)
        }))
        .validate_update()
        .unwrap_err();
        for field in ["website", "email", "careers", "phone"] {
            assert!(errors.field_errors.contains_key(field), "{}", field);
        }
        assert!(input(json!({ "website": "https://devworks.com" })).validate_update().is_ok());
    }

    #[test]
    fn patch_contains_only_supplied_fields() {
        let patch = input(json!({ "description": "New" })).to_patch();
        assert_eq!(Value::Object(patch), json!({ "description": "New" }));
    }
}
