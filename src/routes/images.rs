use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Deserialize;

use super::{extract::ApiQuery, page_size};
use crate::{error::GameError, models::Image, AppState};

const DEFAULT_IMAGE_COUNT: i64 = 1;

#[derive(Debug, Deserialize)]
pub struct RandomImageQuery {
    pub region: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImagesQuery {
    pub region: Option<String>,
    pub country: Option<String>,
    pub count: Option<i64>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// One random image from the region, or `null` when the pool is empty
pub async fn random_image(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<RandomImageQuery>,
) -> Json<Option<Image>> {
    Json(state.corpus.random_image(non_blank(&query.region)).cloned())
}

/// Distinct images matching the filters, in random order
pub async fn list_images(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ImagesQuery>,
) -> Result<Json<Vec<Image>>, GameError> {
    let count = page_size("count", query.count)?.unwrap_or(DEFAULT_IMAGE_COUNT);
    let images = state
        .corpus
        .sample(
            non_blank(&query.region),
            non_blank(&query.country),
            count as usize,
        )
        .into_iter()
        .cloned()
        .collect();

    Ok(Json(images))
}
