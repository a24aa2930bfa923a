//! Database operations for the `channels` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

const CHANNEL_COLUMNS: &str = "id, external_id, name, search_query, description, channel_url, \
     profile_image_url, subscriber_count, view_count, video_count, gender, \
     created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChannelRow {
    pub id: i64,
    pub external_id: String,
    pub name: String,
    pub search_query: Option<String>,
    pub description: Option<String>,
    pub channel_url: Option<String>,
    pub profile_image_url: Option<String>,
    pub subscriber_count: i64,
    pub view_count: i64,
    pub video_count: i64,
    pub gender: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewChannel<'a> {
    pub external_id: &'a str,
    pub name: &'a str,
    pub search_query: Option<&'a str>,
    pub description: Option<&'a str>,
    pub channel_url: Option<&'a str>,
    pub profile_image_url: Option<&'a str>,
    pub subscriber_count: i64,
    pub view_count: i64,
    pub video_count: i64,
    pub gender: Option<&'a str>,
}

/// Upstream counters refreshed by the update workflow.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelStats {
    pub subscriber_count: i64,
    pub view_count: i64,
    pub video_count: i64,
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_channel_by_external_id(
    pool: &PgPool,
    external_id: &str,
) -> Result<Option<ChannelRow>, DbError> {
    let row = sqlx::query_as::<_, ChannelRow>(&format!(
        "SELECT {CHANNEL_COLUMNS} FROM channels WHERE external_id = $1"
    ))
    .bind(external_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts a channel unless one with the same `external_id` already exists.
///
/// Returns the stored row and whether this call created it. An existing row
/// is returned unchanged.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert or follow-up lookup fails.
pub async fn insert_channel(
    pool: &PgPool,
    channel: &NewChannel<'_>,
) -> Result<(ChannelRow, bool), DbError> {
    let inserted = sqlx::query_as::<_, ChannelRow>(&format!(
        "INSERT INTO channels \
             (external_id, name, search_query, description, channel_url, \
              profile_image_url, subscriber_count, view_count, video_count, gender) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (external_id) DO NOTHING \
         RETURNING {CHANNEL_COLUMNS}"
    ))
    .bind(channel.external_id)
    .bind(channel.name)
    .bind(channel.search_query)
    .bind(channel.description)
    .bind(channel.channel_url)
    .bind(channel.profile_image_url)
    .bind(channel.subscriber_count)
    .bind(channel.view_count)
    .bind(channel.video_count)
    .bind(channel.gender)
    .fetch_optional(pool)
    .await?;

    if let Some(row) = inserted {
        return Ok((row, true));
    }

    let existing = get_channel_by_external_id(pool, channel.external_id)
        .await?
        .ok_or(DbError::NotFound)?;
    Ok((existing, false))
}

/// Returns all channels in insertion order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_channels(pool: &PgPool) -> Result<Vec<ChannelRow>, DbError> {
    let rows = sqlx::query_as::<_, ChannelRow>(&format!(
        "SELECT {CHANNEL_COLUMNS} FROM channels ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Overwrites the upstream counters for a channel.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no channel has `id`, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn update_channel_stats(
    pool: &PgPool,
    id: i64,
    stats: ChannelStats,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE channels \
         SET subscriber_count = $1, view_count = $2, video_count = $3, updated_at = NOW() \
         WHERE id = $4",
    )
    .bind(stats.subscriber_count)
    .bind(stats.view_count)
    .bind(stats.video_count)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
