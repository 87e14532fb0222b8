use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of the most recent reconciliation pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    /// A pass is in progress (or none has finished yet).
    Unknown,
    Ok,
    ServerDown,
    ServerInvalid,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Unknown => "unknown",
            SyncStatus::Ok => "ok",
            SyncStatus::ServerDown => "server-down",
            SyncStatus::ServerInvalid => "server-invalid",
        }
    }

    pub fn parse_status(s: &str) -> Option<Self> {
        match s {
            "unknown" => Some(SyncStatus::Unknown),
            "ok" => Some(SyncStatus::Ok),
            "server-down" => Some(SyncStatus::ServerDown),
            "server-invalid" => Some(SyncStatus::ServerInvalid),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SyncStatus::Unknown)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A story as parsed from the remote feed, before it lands in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStory {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub position: i64,
}

/// A story row from the local store, including the local favorite flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Story {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub position: i64,
    pub favorite: bool,
    pub synced_at: DateTime<Utc>,
}

/// What a single reconciliation pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub status: SyncStatus,
    pub before: u64,
    pub after: u64,
    pub new_stories: u64,
    pub restored_favorites: u64,
}

impl SyncReport {
    pub(crate) fn failed(status: SyncStatus) -> Self {
        Self {
            status,
            before: 0,
            after: 0,
            new_stories: 0,
            restored_favorites: 0,
        }
    }
}
