use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use travelmap_db::{CountryTagRow, VideoCardRow, VideoFilters};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Filters shared by the video list, map and country endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct VideoQuery {
    pub channel_id: Option<i64>,
    pub country_code: Option<String>,
    pub gender: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

impl VideoQuery {
    pub(super) fn normalized_country(&self) -> Option<String> {
        self.country_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_ascii_uppercase)
    }

    pub(super) fn normalized_gender(&self) -> Option<&str> {
        self.gender
            .as_deref()
            .map(str::trim)
            .filter(|gender| !gender.is_empty())
    }

    /// `(page, size)` with the page floored at zero and size clamped.
    pub(super) fn paging(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(0).max(0);
        let size = self
            .size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        (page, size)
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ChannelSummary {
    id: i64,
    external_id: String,
    name: String,
    profile_image_url: Option<String>,
    gender: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct CountryTagItem {
    country_code: String,
    country_name: String,
    emoji: Option<String>,
    continent: String,
    detection_method: String,
    confidence: f64,
}

impl From<CountryTagRow> for CountryTagItem {
    fn from(row: CountryTagRow) -> Self {
        Self {
            country_code: row.country_code,
            country_name: row.country_name,
            emoji: row.emoji,
            continent: row.continent,
            detection_method: row.detection_method,
            confidence: row.confidence,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct VideoItem {
    id: i64,
    external_id: String,
    title: String,
    video_url: Option<String>,
    thumbnail_url: Option<String>,
    uploaded_at: Option<DateTime<Utc>>,
    view_count: i64,
    like_count: i64,
    comment_count: i64,
    duration: Option<String>,
    processed: bool,
    channel: ChannelSummary,
    countries: Vec<CountryTagItem>,
}

impl VideoItem {
    fn from_row(row: VideoCardRow, countries: Vec<CountryTagItem>) -> Self {
        Self {
            id: row.id,
            external_id: row.external_id,
            title: row.title,
            video_url: row.video_url,
            thumbnail_url: row.thumbnail_url,
            uploaded_at: row.uploaded_at,
            view_count: row.view_count,
            like_count: row.like_count,
            comment_count: row.comment_count,
            duration: row.duration,
            processed: row.processed,
            channel: ChannelSummary {
                id: row.channel_id,
                external_id: row.channel_external_id,
                name: row.channel_name,
                profile_image_url: row.channel_profile_image_url,
                gender: row.channel_gender,
            },
            countries,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct VideoPage {
    items: Vec<VideoItem>,
    page: i64,
    size: i64,
    total: i64,
    total_pages: i64,
}

fn total_pages(total: i64, size: i64) -> i64 {
    if total <= 0 {
        0
    } else {
        (total + size - 1) / size
    }
}

/// Attaches each video's tags, preserving the row order.
async fn with_tags(
    state: &AppState,
    req_id: &RequestId,
    rows: Vec<VideoCardRow>,
) -> Result<Vec<VideoItem>, ApiError> {
    let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
    let tags = travelmap_db::list_tags_for_videos(&state.pool, &ids)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let mut by_video: HashMap<i64, Vec<CountryTagItem>> = HashMap::new();
    for tag in tags {
        by_video.entry(tag.video_id).or_default().push(tag.into());
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let countries = by_video.remove(&row.id).unwrap_or_default();
            VideoItem::from_row(row, countries)
        })
        .collect())
}

async fn video_page(
    state: &AppState,
    req_id: &RequestId,
    query: &VideoQuery,
    country_code: Option<&str>,
) -> Result<VideoPage, ApiError> {
    let (page, size) = query.paging();
    let filters = VideoFilters {
        channel_id: query.channel_id,
        country_code,
        gender: query.normalized_gender(),
        from: query.start_date,
        to: query.end_date,
        limit: size,
        offset: page.saturating_mul(size),
    };

    let (rows, total) = travelmap_db::list_videos_page(&state.pool, &filters)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let items = with_tags(state, req_id, rows).await?;

    Ok(VideoPage {
        items,
        page,
        size,
        total,
        total_pages: total_pages(total, size),
    })
}

pub(super) async fn list_videos(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<VideoQuery>,
) -> Result<Json<ApiResponse<VideoPage>>, ApiError> {
    let country = query.normalized_country();
    let page = video_page(&state, &req_id, &query, country.as_deref()).await?;
    Ok(ApiResponse::new(req_id.0, page))
}

pub(super) async fn list_country_videos(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(code): Path<String>,
    Query(query): Query<VideoQuery>,
) -> Result<Json<ApiResponse<VideoPage>>, ApiError> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() != 2 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "country code must be two letters",
        ));
    }

    let page = video_page(&state, &req_id, &query, Some(&code)).await?;
    Ok(ApiResponse::new(req_id.0, page))
}

pub(super) async fn get_video(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<VideoItem>>, ApiError> {
    let not_found =
        || ApiError::new(req_id.0.clone(), "not_found", format!("video {id} not found"));

    let row = travelmap_db::get_video_detail(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(not_found)?;

    let item = with_tags(&state, &req_id, vec![row])
        .await?
        .pop()
        .ok_or_else(not_found)?;

    Ok(ApiResponse::new(req_id.0, item))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_defaults_and_bounds() {
        assert_eq!(VideoQuery::default().paging(), (0, 20));

        let query = VideoQuery {
            page: Some(-3),
            size: Some(500),
            ..VideoQuery::default()
        };
        assert_eq!(query.paging(), (0, 100));

        let query = VideoQuery {
            page: Some(2),
            size: Some(0),
            ..VideoQuery::default()
        };
        assert_eq!(query.paging(), (2, 1));
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(21, 20), 2);
    }

    #[test]
    fn country_filter_is_upper_cased_and_blank_ignored() {
        let query = VideoQuery {
            country_code: Some(" jp ".to_string()),
            gender: Some("  ".to_string()),
            ..VideoQuery::default()
        };
        assert_eq!(query.normalized_country().as_deref(), Some("JP"));
        assert!(query.normalized_gender().is_none());
    }
}
