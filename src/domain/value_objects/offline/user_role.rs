use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    User,
    /// Field-level worker.
    Flw,
    Admin,
    Unknown(String),
}

impl UserRole {
    pub fn as_str(&self) -> &str {
        match self {
            UserRole::User => "user",
            UserRole::Flw => "flw",
            UserRole::Admin => "admin",
            UserRole::Unknown(value) => value.as_str(),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for UserRole {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "user" => UserRole::User,
            "flw" => UserRole::Flw,
            "admin" => UserRole::Admin,
            _ => UserRole::Unknown(value.to_string()),
        }
    }
}
