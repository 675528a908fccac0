use serde::{Deserialize, Serialize};
use std::fmt;

/// Upload state of a captured result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Pending,
    Synced,
    Unknown(String),
}

impl SyncState {
    pub fn as_str(&self) -> &str {
        match self {
            SyncState::Pending => "pending",
            SyncState::Synced => "synced",
            SyncState::Unknown(value) => value.as_str(),
        }
    }

    pub fn is_synced(&self) -> bool {
        matches!(self, SyncState::Synced)
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for SyncState {
    fn from(value: &str) -> Self {
        match value {
            "pending" => SyncState::Pending,
            "synced" => SyncState::Synced,
            other => SyncState::Unknown(other.to_string()),
        }
    }
}
