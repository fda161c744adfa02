pub mod bootcamp;
pub mod course;
pub mod review;
pub mod user;

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::database::document::Document;

pub use bootcamp::BootcampInput;
pub use course::CourseInput;
pub use review::ReviewInput;
pub use user::{LoginInput, Role, UserInput};

/// Field-level validation failures for a request body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    pub field_errors: HashMap<String, String>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.field_errors.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn require<T>(&mut self, field: &str, value: &Option<T>, message: &str) {
        if value.is_none() {
            self.add(field, message);
        }
    }

    pub fn max_len(&mut self, field: &str, value: &Option<String>, max: usize) {
        if let Some(v) = value {
            if v.chars().count() > max {
                self.add(field, format!("{} can not be more than {} characters", field, max));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.field_errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut messages: Vec<&str> = self.field_errors.values().map(String::as_str).collect();
        messages.sort_unstable();
        write!(f, "{}", messages.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Serialize an input struct into a patch of its present fields
pub(crate) fn to_patch<T: Serialize>(input: &T) -> Document {
    match serde_json::to_value(input) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => Document::new(),
    }
}

/// Trim a string, treating blank as absent
pub(crate) fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// `local@domain.tld` with word characters, dots and dashes
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let valid_part = |part: &str| {
        !part.is_empty()
            && !part.starts_with(['.', '-'])
            && !part.ends_with(['.', '-'])
            && part.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '-')
    };
    let Some((_, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    valid_part(local) && valid_part(domain) && (2..=3).contains(&tld.len()) && tld.chars().all(char::is_alphanumeric)
}

/// Lowercase, with every run of non-alphanumerics collapsed to a single `-`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
