//! One-shot reconciliation of the local story mirror with the remote feed.
//!
//! A pass walks `unknown -> {ok | server-down | server-invalid}`:
//!
//! 1. publish `unknown`
//! 2. fetch the feed; transport failure or empty body ends in `server-down`
//! 3. parse it; a malformed payload ends in `server-invalid`
//! 4. hand the stories to the store, which snapshots favorite IDs, replaces
//!    every story and reapplies the favorites that still exist
//! 5. log how many stories are new, publish `ok`
//!
//! The store is not touched unless both fetch and parse succeed.
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use crate::feed::{self, FeedClient};
use crate::model::{SyncReport, SyncStatus};
use crate::store::{StatusObserver, StoryStore};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to publish sync status: {0:#}")]
    Status(anyhow::Error),
    #[error("failed to update the story store: {0:#}")]
    Store(anyhow::Error),
}

/// Stories added by a pass, or `None` when nothing should be reported.
/// A first sync (`before == 0`) never counts as new.
pub fn new_story_count(before: u64, after: u64) -> Option<u64> {
    if before > 0 && after > before {
        Some(after - before)
    } else {
        None
    }
}

/// Runs reconciliation passes, at most one at a time.
pub struct Syncer {
    feed: Arc<dyn FeedClient>,
    store: Arc<dyn StoryStore>,
    observer: Arc<dyn StatusObserver>,
    running: Mutex<()>,
}

impl Syncer {
    pub fn new(
        feed: Arc<dyn FeedClient>,
        store: Arc<dyn StoryStore>,
        observer: Arc<dyn StatusObserver>,
    ) -> Self {
        Self {
            feed,
            store,
            observer,
            running: Mutex::new(()),
        }
    }

    /// Run a pass, waiting for any pass already in flight to finish first.
    pub async fn run_pass(&self) -> Result<SyncReport, SyncError> {
        let _running = self.running.lock().await;
        self.pass().await
    }

    /// Run a pass unless one is already in flight, in which case `None`.
    pub async fn try_run_pass(&self) -> Option<Result<SyncReport, SyncError>> {
        let _running = self.running.try_lock().ok()?;
        Some(self.pass().await)
    }

    async fn publish(&self, status: SyncStatus) -> Result<(), SyncError> {
        self.observer
            .status_changed(status)
            .await
            .map_err(SyncError::Status)
    }

    async fn fail(&self, status: SyncStatus) -> Result<SyncReport, SyncError> {
        self.publish(status).await?;
        Ok(SyncReport::failed(status))
    }

    #[instrument(skip_all)]
    async fn pass(&self) -> Result<SyncReport, SyncError> {
        info!("syncing stories");
        self.publish(SyncStatus::Unknown).await?;

        let raw = match self.feed.fetch_feed().await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                warn!("feed body was empty");
                return self.fail(SyncStatus::ServerDown).await;
            }
            Err(err) => {
                warn!(%err, "feed unreachable");
                return self.fail(SyncStatus::ServerDown).await;
            }
        };

        let stories = match feed::parse(&raw) {
            Ok(stories) => stories,
            Err(err) => {
                warn!(%err, "feed payload rejected");
                return self.fail(SyncStatus::ServerInvalid).await;
            }
        };

        let outcome = match self.store.replace_all(&stories).await {
            Ok(res) => res,
            Err(err) => {
                error!(?err, "story store update failed");
                // Keep the slot terminal even though the pass is reported as an error.
                if let Err(status_err) = self
                    .observer
                    .status_changed(SyncStatus::ServerInvalid)
                    .await
                {
                    error!(?status_err, "failed to publish sync status");
                }
                return Err(SyncError::Store(err));
            }
        };

        if outcome.restored_favorites < outcome.favorites_before {
            info!(
                kept = outcome.restored_favorites,
                dropped = outcome.favorites_before - outcome.restored_favorites,
                "favorites missing from the refreshed feed were dropped"
            );
        }

        let new_stories = new_story_count(outcome.before, outcome.after);
        match new_stories {
            Some(1) => info!(new_stories = 1, "1 new story added"),
            Some(n) => info!(new_stories = n, "{} new stories added", n),
            None => {}
        }

        self.publish(SyncStatus::Ok).await?;
        info!(
            before = outcome.before,
            after = outcome.after,
            restored_favorites = outcome.restored_favorites,
            "stories synced"
        );
        Ok(SyncReport {
            status: SyncStatus::Ok,
            before: outcome.before,
            after: outcome.after,
            new_stories: new_stories.unwrap_or(0),
            restored_favorites: outcome.restored_favorites,
        })
    }
}
