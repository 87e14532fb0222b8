//! Persistence seam for the reconciliation pass.
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::db::{self, Pool, ReplaceOutcome};
use crate::model::{NewStory, Story, SyncStatus};

/// Favorites from `previous` whose story is still present in `fresh`.
pub fn retained_favorites(previous: &[i64], fresh: &[NewStory]) -> Vec<i64> {
    let previous: BTreeSet<i64> = previous.iter().copied().collect();
    let fresh: BTreeSet<i64> = fresh.iter().map(|s| s.id).collect();
    previous.intersection(&fresh).copied().collect()
}

/// Content store holding the story mirror and its favorite overlay.
#[async_trait]
pub trait StoryStore: Send + Sync {
    async fn favorite_ids(&self) -> Result<Vec<i64>>;

    async fn count(&self) -> Result<u64>;

    async fn delete_all(&self) -> Result<u64>;

    /// Returns the number of stories present after the insert.
    async fn insert_all(&self, stories: &[NewStory]) -> Result<u64>;

    /// Returns how many of `ids` were found and flagged.
    async fn mark_favorites(&self, ids: &[i64]) -> Result<u64>;

    /// Snapshot favorites, count, delete, insert and reapply the favorites
    /// still present. The default runs the primitives one after another;
    /// stores with transactions should do the whole sequence atomically.
    async fn replace_all(&self, stories: &[NewStory]) -> Result<ReplaceOutcome> {
        let previous = self.favorite_ids().await?;
        let keep = retained_favorites(&previous, stories);
        let before = self.count().await?;
        self.delete_all().await?;
        let after = self.insert_all(stories).await?;
        let restored_favorites = if keep.is_empty() {
            0
        } else {
            self.mark_favorites(&keep).await?
        };
        Ok(ReplaceOutcome {
            favorites_before: previous.len() as u64,
            before,
            after,
            restored_favorites,
        })
    }
}

/// Receives every sync status transition, in order.
#[async_trait]
pub trait StatusObserver: Send + Sync {
    async fn status_changed(&self, status: SyncStatus) -> Result<()>;
}

/// SQLite-backed store; also persists the sync status slot.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: Pool,
}

impl SqliteStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn list_stories(&self) -> Result<Vec<Story>> {
        db::list_stories(&self.pool).await
    }

    pub async fn list_favorites(&self) -> Result<Vec<Story>> {
        db::list_favorites(&self.pool).await
    }

    pub async fn get_story(&self, id: i64) -> Result<Option<Story>> {
        db::get_story(&self.pool, id).await
    }

    pub async fn set_favorite(&self, id: i64, favorite: bool) -> Result<bool> {
        db::set_favorite(&self.pool, id, favorite).await
    }

    pub async fn sync_state(&self) -> Result<db::SyncState> {
        db::get_sync_state(&self.pool).await
    }
}

#[async_trait]
impl StoryStore for SqliteStore {
    async fn favorite_ids(&self) -> Result<Vec<i64>> {
        db::favorite_story_ids(&self.pool).await
    }

    async fn count(&self) -> Result<u64> {
        db::count_stories(&self.pool).await
    }

    async fn delete_all(&self) -> Result<u64> {
        db::delete_all_stories(&self.pool).await
    }

    async fn insert_all(&self, stories: &[NewStory]) -> Result<u64> {
        db::insert_stories(&self.pool, stories).await
    }

    async fn mark_favorites(&self, ids: &[i64]) -> Result<u64> {
        db::mark_favorites(&self.pool, ids).await
    }

    async fn replace_all(&self, stories: &[NewStory]) -> Result<ReplaceOutcome> {
        db::replace_stories(&self.pool, stories).await
    }
}

#[async_trait]
impl StatusObserver for SqliteStore {
    async fn status_changed(&self, status: SyncStatus) -> Result<()> {
        db::set_sync_status(&self.pool, status).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(id: i64) -> NewStory {
        NewStory {
            id,
            title: format!("#{}", id),
            body: String::new(),
            image_url: None,
            category: None,
            position: 0,
        }
    }

    #[test]
    fn retained_favorites_is_an_intersection() {
        let fresh = vec![story(7), story(8), story(10)];
        assert_eq!(retained_favorites(&[7, 9], &fresh), vec![7]);
        assert!(retained_favorites(&[], &fresh).is_empty());
        assert!(retained_favorites(&[1, 2], &[]).is_empty());
    }
}
