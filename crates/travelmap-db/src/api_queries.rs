//! Read-model queries used by `travelmap-server` endpoints.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{CountryTagRow, DbError};

/// Video with its owning channel, as listed by the API.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VideoCardRow {
    pub id: i64,
    pub external_id: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub duration: Option<String>,
    pub processed: bool,
    pub channel_id: i64,
    pub channel_name: String,
    pub channel_external_id: String,
    pub channel_profile_image_url: Option<String>,
    pub channel_gender: Option<String>,
}

/// Input filters shared by the video list and the map aggregation.
///
/// `limit`/`offset` only apply to [`list_videos_page`].
#[derive(Debug, Clone, Default)]
pub struct VideoFilters<'a> {
    pub channel_id: Option<i64>,
    pub country_code: Option<&'a str>,
    pub gender: Option<&'a str>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

/// One country on the map with the channels that visited it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MapCountryRow {
    pub country_code: String,
    pub country_name: String,
    pub emoji: Option<String>,
    pub continent: String,
    pub visit_count: i64,
    pub channel_count: i64,
    pub channel_names: Vec<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CountryOptionRow {
    pub country_code: String,
    pub country_name: String,
}

/// Distinct values for the filter panel.
#[derive(Debug, Clone, Default)]
pub struct FilterValues {
    pub countries: Vec<CountryOptionRow>,
    pub genders: Vec<String>,
    pub years: Vec<i32>,
    pub continents: Vec<String>,
}

const VIDEO_CARD_SELECT: &str = "SELECT \
         v.id, v.external_id, v.title, v.thumbnail_url, v.video_url, v.uploaded_at, \
         v.view_count, v.like_count, v.comment_count, v.duration, v.processed, \
         c.id AS channel_id, c.name AS channel_name, c.external_id AS channel_external_id, \
         c.profile_image_url AS channel_profile_image_url, c.gender AS channel_gender \
     FROM videos v \
     JOIN channels c ON c.id = v.channel_id";

// Binds $1..$5 in `VideoFilters` field order.
const VIDEO_FILTER_WHERE: &str = "WHERE ($1::BIGINT IS NULL OR v.channel_id = $1) \
       AND ($2::TEXT IS NULL OR EXISTS ( \
             SELECT 1 FROM country_tags ft \
             WHERE ft.video_id = v.id AND ft.country_code = $2)) \
       AND ($3::TEXT IS NULL OR c.gender = $3) \
       AND ($4::timestamptz IS NULL OR v.uploaded_at >= $4) \
       AND ($5::timestamptz IS NULL OR v.uploaded_at <= $5)";

/// Returns one page of videos, newest upload first, plus the unpaged total.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn list_videos_page(
    pool: &PgPool,
    filters: &VideoFilters<'_>,
) -> Result<(Vec<VideoCardRow>, i64), DbError> {
    let rows = sqlx::query_as::<_, VideoCardRow>(&format!(
        "{VIDEO_CARD_SELECT} {VIDEO_FILTER_WHERE} \
         ORDER BY v.uploaded_at DESC NULLS LAST, v.id DESC \
         LIMIT $6 OFFSET $7"
    ))
    .bind(filters.channel_id)
    .bind(filters.country_code)
    .bind(filters.gender)
    .bind(filters.from)
    .bind(filters.to)
    .bind(filters.limit)
    .bind(filters.offset)
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM videos v JOIN channels c ON c.id = v.channel_id {VIDEO_FILTER_WHERE}"
    ))
    .bind(filters.channel_id)
    .bind(filters.country_code)
    .bind(filters.gender)
    .bind(filters.from)
    .bind(filters.to)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_video_detail(pool: &PgPool, id: i64) -> Result<Option<VideoCardRow>, DbError> {
    let row = sqlx::query_as::<_, VideoCardRow>(&format!("{VIDEO_CARD_SELECT} WHERE v.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Tags for a batch of videos, grouped by video in id order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_tags_for_videos(
    pool: &PgPool,
    video_ids: &[i64],
) -> Result<Vec<CountryTagRow>, DbError> {
    if video_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, CountryTagRow>(
        "SELECT id, video_id, country_code, country_name, emoji, continent, \
                detection_method, confidence, visit_order, notes, created_at, updated_at \
         FROM country_tags \
         WHERE video_id = ANY($1) \
         ORDER BY video_id, visit_order NULLS LAST, id",
    )
    .bind(video_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Per-country visit counts for the map, most visited first.
///
/// A visit is one tagged video; `channel_names` is sorted alphabetically.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_map_countries(
    pool: &PgPool,
    filters: &VideoFilters<'_>,
) -> Result<Vec<MapCountryRow>, DbError> {
    let rows = sqlx::query_as::<_, MapCountryRow>(
        "SELECT \
             t.country_code, \
             MIN(t.country_name) AS country_name, \
             MIN(t.emoji) AS emoji, \
             MIN(t.continent) AS continent, \
             COUNT(DISTINCT t.video_id) AS visit_count, \
             COUNT(DISTINCT c.id) AS channel_count, \
             ARRAY_AGG(DISTINCT c.name ORDER BY c.name) AS channel_names \
         FROM country_tags t \
         JOIN videos v ON v.id = t.video_id \
         JOIN channels c ON c.id = v.channel_id \
         WHERE ($1::BIGINT IS NULL OR v.channel_id = $1) \
           AND ($2::TEXT IS NULL OR t.country_code = $2) \
           AND ($3::TEXT IS NULL OR c.gender = $3) \
           AND ($4::timestamptz IS NULL OR v.uploaded_at >= $4) \
           AND ($5::timestamptz IS NULL OR v.uploaded_at <= $5) \
         GROUP BY t.country_code \
         ORDER BY visit_count DESC, t.country_code",
    )
    .bind(filters.channel_id)
    .bind(filters.country_code)
    .bind(filters.gender)
    .bind(filters.from)
    .bind(filters.to)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if any query fails.
pub async fn list_filter_values(pool: &PgPool) -> Result<FilterValues, DbError> {
    let countries = sqlx::query_as::<_, CountryOptionRow>(
        "SELECT country_code, MIN(country_name) AS country_name \
         FROM country_tags \
         GROUP BY country_code \
         ORDER BY MIN(country_name)",
    )
    .fetch_all(pool)
    .await?;

    let genders = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT gender FROM channels WHERE gender IS NOT NULL ORDER BY gender",
    )
    .fetch_all(pool)
    .await?;

    let years = sqlx::query_scalar::<_, i32>(
        "SELECT DISTINCT EXTRACT(YEAR FROM uploaded_at)::INTEGER AS year \
         FROM videos \
         WHERE uploaded_at IS NOT NULL \
         ORDER BY year DESC",
    )
    .fetch_all(pool)
    .await?;

    let continents = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT continent FROM country_tags ORDER BY continent",
    )
    .fetch_all(pool)
    .await?;

    Ok(FilterValues {
        countries,
        genders,
        years,
        continents,
    })
}
