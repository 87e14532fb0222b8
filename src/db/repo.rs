use super::model::{ReplaceOutcome, SyncState};
use crate::model::{NewStory, Story, SyncStatus};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::instrument;

pub type Pool = SqlitePool;

/// Bound parameters per `IN (...)` chunk, well under SQLite's variable limit.
const ID_CHUNK: usize = 500;

const STORY_COLUMNS: &str =
    "id, title, body, image_url, category, position, favorite, synced_at";

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized)
        .await
        .with_context(|| format!("failed to open {}", normalized))?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// For a file-backed SQLite URL, expand a leading `~/`, ensure the parent
/// directory exists and ask SQLite to create the file. In-memory URLs pass
/// through untouched.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = format!("sqlite://{}", expanded_path);
    match query_part {
        Some(q) if q.contains("mode=") => {
            rebuilt.push('?');
            rebuilt.push_str(q);
        }
        Some(q) => {
            rebuilt.push('?');
            rebuilt.push_str(q);
            rebuilt.push_str("&mode=rwc");
        }
        None => rebuilt.push_str("?mode=rwc"),
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

async fn favorite_ids_conn(conn: &mut SqliteConnection) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM stories WHERE favorite = 1 ORDER BY id")
        .fetch_all(conn)
        .await?;
    Ok(ids)
}

async fn count_conn(conn: &mut SqliteConnection) -> Result<u64> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stories")
        .fetch_one(conn)
        .await?;
    Ok(n as u64)
}

async fn delete_all_conn(conn: &mut SqliteConnection) -> Result<u64> {
    let res = sqlx::query("DELETE FROM stories").execute(conn).await?;
    Ok(res.rows_affected())
}

/// Insert with replace-on-conflict so a repeated ID keeps its last payload
/// entry. Returns the row count afterwards.
async fn insert_all_conn(conn: &mut SqliteConnection, stories: &[NewStory]) -> Result<u64> {
    let now = Utc::now();
    for s in stories {
        sqlx::query(
            "INSERT OR REPLACE INTO stories (id, title, body, image_url, category, position, favorite, synced_at) VALUES (?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(s.id)
        .bind(&s.title)
        .bind(&s.body)
        .bind(&s.image_url)
        .bind(&s.category)
        .bind(s.position)
        .bind(now)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("failed to insert story {}", s.id))?;
    }
    count_conn(conn).await
}

async fn mark_favorites_conn(conn: &mut SqliteConnection, ids: &[i64]) -> Result<u64> {
    let mut updated = 0;
    for chunk in ids.chunks(ID_CHUNK) {
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE stories SET favorite = 1 WHERE id IN (");
        let mut sep = qb.separated(", ");
        for id in chunk {
            sep.push_bind(*id);
        }
        sep.push_unseparated(")");
        updated += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(updated)
}

#[instrument(skip_all)]
pub async fn favorite_story_ids(pool: &Pool) -> Result<Vec<i64>> {
    let mut conn = pool.acquire().await?;
    favorite_ids_conn(&mut conn).await
}

#[instrument(skip_all)]
pub async fn count_stories(pool: &Pool) -> Result<u64> {
    let mut conn = pool.acquire().await?;
    count_conn(&mut conn).await
}

#[instrument(skip_all)]
pub async fn delete_all_stories(pool: &Pool) -> Result<u64> {
    let mut conn = pool.acquire().await?;
    delete_all_conn(&mut conn).await
}

#[instrument(skip_all)]
pub async fn insert_stories(pool: &Pool, stories: &[NewStory]) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let after = insert_all_conn(&mut tx, stories).await?;
    tx.commit().await?;
    Ok(after)
}

/// Set the favorite flag on every listed ID that exists. Returns rows updated.
#[instrument(skip_all)]
pub async fn mark_favorites(pool: &Pool, ids: &[i64]) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let updated = mark_favorites_conn(&mut tx, ids).await?;
    tx.commit().await?;
    Ok(updated)
}

/// Snapshot the favorites, delete every story, insert `stories` and flag the
/// snapshot IDs that came back, all in one transaction. Readers never see the
/// empty table in between, and a favorite set before the transaction opens is
/// part of the snapshot.
#[instrument(skip_all, fields(incoming = stories.len()))]
pub async fn replace_stories(pool: &Pool, stories: &[NewStory]) -> Result<ReplaceOutcome> {
    let mut tx = pool.begin().await?;
    let previous = favorite_ids_conn(&mut tx).await?;
    let before = count_conn(&mut tx).await?;
    delete_all_conn(&mut tx).await?;
    let after = insert_all_conn(&mut tx, stories).await?;
    // Only IDs present in the fresh rows match the update.
    let restored_favorites = if previous.is_empty() {
        0
    } else {
        mark_favorites_conn(&mut tx, &previous).await?
    };
    tx.commit().await.context("failed to commit story replacement")?;
    Ok(ReplaceOutcome {
        favorites_before: previous.len() as u64,
        before,
        after,
        restored_favorites,
    })
}

#[instrument(skip_all)]
pub async fn list_stories(pool: &Pool) -> Result<Vec<Story>> {
    let rows = sqlx::query_as::<_, Story>(&format!(
        "SELECT {} FROM stories ORDER BY position ASC, id ASC",
        STORY_COLUMNS
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[instrument(skip_all)]
pub async fn list_favorites(pool: &Pool) -> Result<Vec<Story>> {
    let rows = sqlx::query_as::<_, Story>(&format!(
        "SELECT {} FROM stories WHERE favorite = 1 ORDER BY position ASC, id ASC",
        STORY_COLUMNS
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[instrument(skip_all)]
pub async fn get_story(pool: &Pool, id: i64) -> Result<Option<Story>> {
    let row = sqlx::query_as::<_, Story>(&format!(
        "SELECT {} FROM stories WHERE id = ?",
        STORY_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Returns false when no story has that ID.
#[instrument(skip_all)]
pub async fn set_favorite(pool: &Pool, id: i64, favorite: bool) -> Result<bool> {
    let res = sqlx::query("UPDATE stories SET favorite = ? WHERE id = ?")
        .bind(favorite)
        .bind(id)
        .execute(pool)
        .await
        .context("failed to update favorite flag")?;
    Ok(res.rows_affected() > 0)
}

#[instrument(skip_all)]
pub async fn get_sync_state(pool: &Pool) -> Result<SyncState> {
    let row = sqlx::query("SELECT status, updated_at FROM sync_state WHERE id = 1")
        .fetch_one(pool)
        .await?;
    let raw: String = row.get("status");
    let status = SyncStatus::parse_status(&raw)
        .ok_or_else(|| anyhow!("sync_state has unknown status {}", raw))?;
    let updated_at: DateTime<Utc> = row.get("updated_at");
    Ok(SyncState { status, updated_at })
}

#[instrument(skip_all)]
pub async fn set_sync_status(pool: &Pool, status: SyncStatus) -> Result<()> {
    sqlx::query(
        "INSERT INTO sync_state (id, status, updated_at) VALUES (1, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET status = excluded.status, updated_at = excluded.updated_at",
    )
    .bind(status.as_str())
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("failed to persist sync status")?;
    Ok(())
}
