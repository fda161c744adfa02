use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{is_valid_email, trimmed, ValidationErrors};
use crate::database::document::Document;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Publisher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Publisher => "publisher",
            Role::Admin => "admin",
        }
    }

    /// Read the role stored on a user document; absent means `user`
    pub fn of(doc: &Document) -> Role {
        doc.get("role")
            .and_then(Value::as_str)
            .and_then(|r| r.parse().ok())
            .unwrap_or(Role::User)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "publisher" => Ok(Role::Publisher),
            "admin" => Ok(Role::Admin),
            other => Err(format!("'{}' is not a valid role", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registration and admin user bodies. The password arrives in clear text and is
/// hashed by the user service before it is stored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

impl UserInput {
    /// Self-registration: only `user` and `publisher` may be chosen
    pub fn validate_register(&self) -> Result<(), ValidationErrors> {
        let mut errors = self.required();
        if let Some(role) = &self.role {
            match role.parse::<Role>() {
                Ok(Role::Admin) => errors.add("role", "The admin role can not be self-assigned"),
                Ok(_) => {}
                Err(message) => errors.add("role", message),
            }
        }
        self.check_fields(&mut errors);
        errors.into_result()
    }

    /// Admin-created users may carry any role
    pub fn validate_create(&self) -> Result<(), ValidationErrors> {
        let mut errors = self.required();
        self.check_role(&mut errors);
        self.check_fields(&mut errors);
        errors.into_result()
    }

    pub fn validate_update(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.name.is_some() && trimmed(&self.name).is_none() {
            errors.add("name", "Please add a name");
        }
        self.check_role(&mut errors);
        self.check_fields(&mut errors);
        errors.into_result()
    }

    fn required(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::default();
        errors.require("name", &trimmed(&self.name), "Please add a name");
        errors.require("email", &self.email, "Please add an email");
        errors.require("password", &self.password, "Please add a password");
        errors
    }

    fn check_role(&self, errors: &mut ValidationErrors) {
        if let Some(Err(message)) = self.role.as_deref().map(str::parse::<Role>) {
            errors.add("role", message);
        }
    }

    fn check_fields(&self, errors: &mut ValidationErrors) {
        if let Some(email) = &self.email {
            if !is_valid_email(email) {
                errors.add("email", "Please add a valid email");
            }
        }
        if let Some(password) = &self.password {
            if password.chars().count() < MIN_PASSWORD_LEN {
                errors.add("password", format!("Password must be at least {} characters", MIN_PASSWORD_LEN));
            }
        }
    }

    pub fn role(&self) -> Role {
        self.role.as_deref().and_then(|r| r.parse().ok()).unwrap_or(Role::User)
    }

    /// Patch of the supplied profile fields; the password is handled separately
    pub fn profile_patch(&self) -> Document {
        let mut patch = Document::new();
        if let Some(name) = trimmed(&self.name) {
            patch.insert("name".to_string(), Value::String(name));
        }
        if let Some(email) = &self.email {
            patch.insert("email".to_string(), Value::String(email.trim().to_lowercase()));
        }
        if self.role.is_some() {
            patch.insert("role".to_string(), Value::String(self.role().as_str().to_string()));
        }
        patch
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}
