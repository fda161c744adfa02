use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use uuid::Uuid;

use super::{to_patch, trimmed, ValidationErrors};
use crate::database::document::Document;

pub const MINIMUM_SKILLS: [&str; 3] = ["beginner", "intermediate", "advanced"];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weeks: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tuition: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_skill: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scholarship_available: Option<bool>,
}

impl CourseInput {
    pub fn validate_create(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.require("title", &trimmed(&self.title), "Please add a course title");
        errors.require("description", &self.description, "Please add a description");
        errors.require("weeks", &self.weeks, "Please add number of weeks");
        errors.require("tuition", &self.tuition, "Please add a tuition cost");
        errors.require("minimumSkill", &self.minimum_skill, "Please add a minimum skill");
        self.check_fields(&mut errors);
        errors.into_result()
    }

    pub fn validate_update(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.title.is_some() && trimmed(&self.title).is_none() {
            errors.add("title", "Please add a course title");
        }
        self.check_fields(&mut errors);
        errors.into_result()
    }

    fn check_fields(&self, errors: &mut ValidationErrors) {
        if let Some(tuition) = &self.tuition {
            if tuition.as_f64().map_or(true, |t| t < 0.0) {
                errors.add("tuition", "Tuition can not be negative");
            }
        }
        if let Some(skill) = &self.minimum_skill {
            if !MINIMUM_SKILLS.contains(&skill.as_str()) {
                errors.add("minimumSkill", "Minimum skill must be beginner, intermediate or advanced");
            }
        }
        if self.weeks == Some(0) {
            errors.add("weeks", "Weeks must be at least 1");
        }
    }

    pub fn to_patch(&self) -> Document {
        to_patch(&Self { title: trimmed(&self.title), ..self.clone() })
    }

    pub fn into_document(self, bootcamp: Uuid, owner: Uuid) -> Document {
        let mut doc = self.to_patch();
        doc.entry("scholarshipAvailable".to_string()).or_insert(Value::Bool(false));
        doc.insert("bootcamp".to_string(), Value::String(bootcamp.to_string()));
        doc.insert("user".to_string(), Value::String(owner.to_string()));
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validates_and_builds() {
        let input: CourseInput = serde_json::from_value(json!({
            "title": "Front End Web Development",
            "description": "HTML, CSS and JavaScript",
            "weeks": 8,
            "tuition": 8000,
            "minimumSkill": "beginner"
        }))
        .unwrap();
        assert!(input.validate_create().is_ok());

        let (bootcamp, owner) = (Uuid::new_v4(), Uuid::new_v4());
        let doc = input.into_document(bootcamp, owner);
        assert_eq!(doc["tuition"], json!(8000));
        assert_eq!(doc["scholarshipAvailable"], json!(false));
        assert_eq!(doc["bootcamp"], json!(bootcamp.to_string()));
    }

    #[test]
    fn rejects_unknown_skill_and_negative_tuition() {
        let input: CourseInput = serde_json::from_value(json!({ "tuition": -1, "minimumSkill": "expert" })).unwrap();
        let errors = input.validate_update().unwrap_err();
        assert!(errors.field_errors.contains_key("tuition"));
        assert!(errors.field_errors.contains_key("minimumSkill"));
    }
}
