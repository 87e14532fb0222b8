//! View models returned by repositories.
//!
//! Keep these structs focused on the data returned by queries. Business logic
//! lives in `sync`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::SyncStatus;

/// Counts observed while replacing the story table in one transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    /// Favorites flagged before the replacement started.
    pub favorites_before: u64,
    pub before: u64,
    pub after: u64,
    pub restored_favorites: u64,
}

/// Contents of the persisted status slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncState {
    pub status: SyncStatus,
    pub updated_at: DateTime<Utc>,
}
