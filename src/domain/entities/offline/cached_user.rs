use crate::domain::value_objects::{UserId, UserRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last known authenticated profile, used to stamp captures made offline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedUserData {
    pub user_id: UserId,
    pub role: UserRole,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub cached_at: DateTime<Utc>,
}

impl CachedUserData {
    pub fn new(user_id: UserId, role: UserRole) -> Self {
        Self {
            user_id,
            role,
            name: None,
            email: None,
            phone: None,
            cached_at: Utc::now(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_contact(mut self, email: Option<String>, phone: Option<String>) -> Self {
        self.email = email;
        self.phone = phone;
        self
    }
}
