use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Client-assigned identifier of a captured result (`local_id` column).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalResultId(String);

impl LocalResultId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn new(value: String) -> Result<Self, String> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(value: &str) -> Result<(), String> {
        if value.trim().is_empty() {
            return Err("Local result ID cannot be empty".to_string());
        }
        Ok(())
    }
}

impl fmt::Display for LocalResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<LocalResultId> for String {
    fn from(id: LocalResultId) -> Self {
        id.0
    }
}
