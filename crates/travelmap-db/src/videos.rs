//! Database operations for the `videos` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

const VIDEO_COLUMNS: &str = "id, external_id, channel_id, title, description, thumbnail_url, \
     video_url, uploaded_at, view_count, like_count, comment_count, duration, \
     processed, ocr_processed, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VideoRow {
    pub id: i64,
    pub external_id: String,
    pub channel_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub duration: Option<String>,
    pub processed: bool,
    pub ocr_processed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewVideo<'a> {
    pub external_id: &'a str,
    pub channel_id: i64,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub thumbnail_url: Option<&'a str>,
    pub video_url: Option<&'a str>,
    pub uploaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct VideoStats {
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub duration: Option<String>,
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_video_by_external_id(
    pool: &PgPool,
    external_id: &str,
) -> Result<Option<VideoRow>, DbError> {
    let row = sqlx::query_as::<_, VideoRow>(&format!(
        "SELECT {VIDEO_COLUMNS} FROM videos WHERE external_id = $1"
    ))
    .bind(external_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn video_exists(pool: &PgPool, external_id: &str) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM videos WHERE external_id = $1)",
    )
    .bind(external_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Inserts a video. Returns `None` without touching the table when the
/// `external_id` is already stored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_video(
    pool: &PgPool,
    video: &NewVideo<'_>,
) -> Result<Option<VideoRow>, DbError> {
    let row = sqlx::query_as::<_, VideoRow>(&format!(
        "INSERT INTO videos \
             (external_id, channel_id, title, description, thumbnail_url, video_url, uploaded_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (external_id) DO NOTHING \
         RETURNING {VIDEO_COLUMNS}"
    ))
    .bind(video.external_id)
    .bind(video.channel_id)
    .bind(video.title)
    .bind(video.description)
    .bind(video.thumbnail_url)
    .bind(video.video_url)
    .bind(video.uploaded_at)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Videos not yet through detail refresh and detection, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_unprocessed_videos(pool: &PgPool) -> Result<Vec<VideoRow>, DbError> {
    let rows = sqlx::query_as::<_, VideoRow>(&format!(
        "SELECT {VIDEO_COLUMNS} FROM videos WHERE processed = FALSE ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no video has `id`, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn update_video_stats(pool: &PgPool, id: i64, stats: &VideoStats) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE videos \
         SET view_count = $1, like_count = $2, comment_count = $3, \
             duration = COALESCE($4, duration), updated_at = NOW() \
         WHERE id = $5",
    )
    .bind(stats.view_count)
    .bind(stats.like_count)
    .bind(stats.comment_count)
    .bind(stats.duration.as_deref())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no video has `id`, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn mark_video_processed(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result =
        sqlx::query("UPDATE videos SET processed = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
