use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use uuid::Uuid;

use super::{to_patch, trimmed, ValidationErrors};
use crate::database::document::Document;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<Number>,
}

impl ReviewInput {
    pub fn validate_create(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.require("title", &trimmed(&self.title), "Please add a title for the review");
        errors.require("text", &self.text, "Please add some text");
        errors.require("rating", &self.rating, "Please add a rating between 1 and 10");
        self.check_fields(&mut errors);
        errors.into_result()
    }

    pub fn validate_update(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.title.is_some() && trimmed(&self.title).is_none() {
            errors.add("title", "Please add a title for the review");
        }
        self.check_fields(&mut errors);
        errors.into_result()
    }

    fn check_fields(&self, errors: &mut ValidationErrors) {
        errors.max_len("title", &self.title, 100);
        if let Some(rating) = &self.rating {
            if !rating.as_f64().is_some_and(|r| (1.0..=10.0).contains(&r)) {
                errors.add("rating", "Please add a rating between 1 and 10");
            }
        }
    }

    pub fn to_patch(&self) -> Document {
        to_patch(&Self { title: trimmed(&self.title), ..self.clone() })
    }

    pub fn into_document(self, bootcamp: Uuid, author: Uuid) -> Document {
        let mut doc = self.to_patch();
        doc.insert("bootcamp".to_string(), Value::String(bootcamp.to_string()));
        doc.insert("user".to_string(), Value::String(author.to_string()));
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(value: Value) -> ReviewInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn rating_bounds() {
        for rating in [0, 11] {
            let errors = input(json!({ "rating": rating })).validate_update().unwrap_err();
            assert!(errors.field_errors.contains_key("rating"));
        }
        assert!(input(json!({ "rating": 1 })).validate_update().is_ok());
        assert!(input(json!({ "rating": 10 })).validate_update().is_ok());
    }

    #[test]
    fn create_requires_text_and_rating() {
        let errors = input(json!({ "title": "Great" })).validate_create().unwrap_err();
        assert!(errors.field_errors.contains_key("text"));
        assert!(errors.field_errors.contains_key("rating"));
        assert!(!errors.field_errors.contains_key("title"));
    }
}
