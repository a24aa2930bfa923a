//! Database operations for the `country_tags` table.
//!
//! `(video_id, country_code)` is unique; inserts never overwrite an existing
//! tag and updates go through [`update_country_tag`].

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

const TAG_COLUMNS: &str = "id, video_id, country_code, country_name, emoji, continent, \
     detection_method, confidence, visit_order, notes, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CountryTagRow {
    pub id: i64,
    pub video_id: i64,
    pub country_code: String,
    pub country_name: String,
    pub emoji: Option<String>,
    pub continent: String,
    pub detection_method: String,
    pub confidence: f64,
    pub visit_order: Option<i32>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCountryTag<'a> {
    pub video_id: i64,
    pub country_code: &'a str,
    pub country_name: &'a str,
    pub emoji: Option<&'a str>,
    pub continent: &'a str,
    pub detection_method: &'a str,
    pub confidence: f64,
}

/// Replacement descriptor fields for an existing tag.
#[derive(Debug, Clone)]
pub struct TagUpdate<'a> {
    pub country_name: &'a str,
    pub emoji: Option<&'a str>,
    pub continent: &'a str,
    pub detection_method: &'a str,
    pub confidence: f64,
}

/// Tags for one video, ordered by `visit_order` then creation.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_tags_for_video(
    pool: &PgPool,
    video_id: i64,
) -> Result<Vec<CountryTagRow>, DbError> {
    let rows = sqlx::query_as::<_, CountryTagRow>(&format!(
        "SELECT {TAG_COLUMNS} FROM country_tags \
         WHERE video_id = $1 \
         ORDER BY visit_order NULLS LAST, id"
    ))
    .bind(video_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Inserts a tag; returns `None` if the video already has one for that code.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a missing video).
pub async fn insert_country_tag(
    pool: &PgPool,
    tag: &NewCountryTag<'_>,
) -> Result<Option<CountryTagRow>, DbError> {
    let row = sqlx::query_as::<_, CountryTagRow>(&format!(
        "INSERT INTO country_tags \
             (video_id, country_code, country_name, emoji, continent, detection_method, confidence) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (video_id, country_code) DO NOTHING \
         RETURNING {TAG_COLUMNS}"
    ))
    .bind(tag.video_id)
    .bind(tag.country_code)
    .bind(tag.country_name)
    .bind(tag.emoji)
    .bind(tag.continent)
    .bind(tag.detection_method)
    .bind(tag.confidence)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Rewrites the descriptor fields of tag `id` in place.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no tag has `id`, or [`DbError::Sqlx`] if
/// the update fails.
pub async fn update_country_tag(
    pool: &PgPool,
    id: i64,
    update: &TagUpdate<'_>,
) -> Result<CountryTagRow, DbError> {
    let row = sqlx::query_as::<_, CountryTagRow>(&format!(
        "UPDATE country_tags \
         SET country_name = $1, emoji = $2, continent = $3, \
             detection_method = $4, confidence = $5, updated_at = NOW() \
         WHERE id = $6 \
         RETURNING {TAG_COLUMNS}"
    ))
    .bind(update.country_name)
    .bind(update.emoji)
    .bind(update.continent)
    .bind(update.detection_method)
    .bind(update.confidence)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}
