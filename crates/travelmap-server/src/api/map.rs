use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Serialize;
use travelmap_db::{MapCountryRow, VideoFilters};

use crate::middleware::RequestId;

use super::{map_db_error, videos::VideoQuery, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct MapCountryItem {
    country_code: String,
    country_name: String,
    emoji: Option<String>,
    continent: String,
    visit_count: i64,
    channel_count: i64,
    channels: Vec<String>,
}

impl From<MapCountryRow> for MapCountryItem {
    fn from(row: MapCountryRow) -> Self {
        Self {
            country_code: row.country_code,
            country_name: row.country_name,
            emoji: row.emoji,
            continent: row.continent,
            visit_count: row.visit_count,
            channel_count: row.channel_count,
            channels: row.channel_names,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct MapData {
    countries: Vec<MapCountryItem>,
    total_visits: i64,
}

/// Per-country visit totals for the world map. Paging parameters are ignored.
pub(super) async fn get_map_data(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<VideoQuery>,
) -> Result<Json<ApiResponse<MapData>>, ApiError> {
    let country = query.normalized_country();
    let filters = VideoFilters {
        channel_id: query.channel_id,
        country_code: country.as_deref(),
        gender: query.normalized_gender(),
        from: query.start_date,
        to: query.end_date,
        limit: 0,
        offset: 0,
    };

    let rows = travelmap_db::list_map_countries(&state.pool, &filters)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let total_visits = rows.iter().map(|row| row.visit_count).sum();
    let countries = rows.into_iter().map(MapCountryItem::from).collect();

    Ok(ApiResponse::new(
        req_id.0,
        MapData {
            countries,
            total_visits,
        },
    ))
}
