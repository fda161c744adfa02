/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

/// Write operations that trigger post-write observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

/// Document collections known to the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Bootcamps,
    Courses,
    Reviews,
    Users,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Bootcamps,
        Collection::Courses,
        Collection::Reviews,
        Collection::Users,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Bootcamps => "bootcamps",
            Collection::Courses => "courses",
            Collection::Reviews => "reviews",
            Collection::Users => "users",
        }
    }

    /// Field sets that must be unique across the collection
    pub fn unique_keys(&self) -> &'static [&'static [&'static str]] {
        match self {
            Collection::Bootcamps => &[&["name"]],
            Collection::Users => &[&["email"]],
            // One review per user per bootcamp
            Collection::Reviews => &[&["bootcamp", "user"]],
            Collection::Courses => &[],
        }
    }

    /// Fields that are never returned to API clients
    pub fn hidden_fields(&self) -> &'static [&'static str] {
        match self {
            Collection::Users => &["password"],
            _ => &[],
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
