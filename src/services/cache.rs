//! TTL-keyed record cache over an embedded SQLite store.
//!
//! Expiry is evaluated at read time; the periodic sweep only reclaims rows
//! whose deadline has passed. Cache failures degrade to a miss upstream and
//! never fail a request.

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tokio::task::JoinHandle;

use crate::models::PostRecord;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS posts (
    id            TEXT PRIMARY KEY,
    video_url     TEXT,
    thumbnail_url TEXT,
    username      TEXT NOT NULL DEFAULT '',
    profile_url   TEXT NOT NULL DEFAULT '',
    permalink     TEXT NOT NULL DEFAULT '',
    likes         INTEGER NOT NULL DEFAULT 0,
    comments      INTEGER NOT NULL DEFAULT 0,
    views         INTEGER NOT NULL DEFAULT 0,
    expires_at    INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_posts_expires_at ON posts (expires_at);
"#;

pub struct RecordCache {
    pool: SqlitePool,
}

impl RecordCache {
    /// Create the cache, applying the schema if this is a fresh store.
    pub async fn init(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Look up a record by id. Rows whose deadline has passed count as a
    /// miss even if the sweeper has not reclaimed them yet.
    pub async fn get(&self, id: &str) -> Result<Option<PostRecord>, sqlx::Error> {
        sqlx::query_as::<_, PostRecord>(
            r#"
            SELECT id, video_url, thumbnail_url, username, profile_url, permalink,
                   likes, comments, views, expires_at
            FROM posts
            WHERE id = ?1 AND expires_at > ?2
            "#,
        )
        .bind(id)
        .bind(chrono::Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await
    }

    /// Upsert by id. Exactly one row per id exists at any time; an expired
    /// row is simply replaced by the fresh resolution.
    pub async fn put(&self, record: &PostRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, video_url, thumbnail_url, username, profile_url,
                               permalink, likes, comments, views, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT (id) DO UPDATE SET
                video_url = excluded.video_url,
                thumbnail_url = excluded.thumbnail_url,
                username = excluded.username,
                profile_url = excluded.profile_url,
                permalink = excluded.permalink,
                likes = excluded.likes,
                comments = excluded.comments,
                views = excluded.views,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(&record.id)
        .bind(&record.video_url)
        .bind(&record.thumbnail_url)
        .bind(&record.username)
        .bind(&record.profile_url)
        .bind(&record.permalink)
        .bind(record.likes)
        .bind(record.comments)
        .bind(record.views)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete all records past their deadline. Returns the reclaimed count.
    pub async fn sweep(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM posts WHERE expires_at <= ?1")
            .bind(chrono::Utc::now().timestamp())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Run the reclamation sweep on a fixed interval, independent of
    /// request traffic.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; nothing to reclaim yet.
            interval.tick().await;

            loop {
                interval.tick().await;
                match self.sweep().await {
                    Ok(0) => {}
                    Ok(reclaimed) => {
                        tracing::debug!(reclaimed, "swept expired cache records");
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "cache sweep failed");
                    }
                }
            }
        })
    }
}
