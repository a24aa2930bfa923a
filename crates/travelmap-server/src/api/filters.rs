use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct ChannelOption {
    id: i64,
    external_id: String,
    name: String,
    gender: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct CountryOption {
    country_code: String,
    country_name: String,
}

#[derive(Debug, Serialize)]
pub(super) struct FilterOptions {
    channels: Vec<ChannelOption>,
    countries: Vec<CountryOption>,
    genders: Vec<String>,
    years: Vec<i32>,
    continents: Vec<String>,
}

pub(super) async fn get_filters(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<FilterOptions>>, ApiError> {
    let channels = travelmap_db::list_channels(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let values = travelmap_db::list_filter_values(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = FilterOptions {
        channels: channels
            .into_iter()
            .map(|row| ChannelOption {
                id: row.id,
                external_id: row.external_id,
                name: row.name,
                gender: row.gender,
            })
            .collect(),
        countries: values
            .countries
            .into_iter()
            .map(|row| CountryOption {
                country_code: row.country_code,
                country_name: row.country_name,
            })
            .collect(),
        genders: values.genders,
        years: values.years,
        continents: values.continents,
    };

    Ok(ApiResponse::new(req_id.0, data))
}
