//! Batch API handlers
//!
//! GET/POST /batch/specification, GET /batch/validity, GET /batch/status,
//! POST /batch/publish, POST /batch/stop, title loading helpers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::input::{split_title_input, BatchSpecification, SpecificationEvent, Validity};
use crate::session::{ControllerStatus, PagePileLoad};
use crate::AppState;

/// Specification together with its derived validity
#[derive(Debug, Serialize)]
pub struct SpecificationResponse {
    pub specification: BatchSpecification,
    pub validity: Validity,
}

/// POST /batch/publish request
#[derive(Debug, Default, Deserialize)]
pub struct PublishRequest {
    #[serde(default)]
    pub dry_run: bool,
}

/// POST /batch/publish response
#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub run_id: Uuid,
    pub files: usize,
    pub statements_per_file: usize,
    pub dry_run: bool,
}

/// POST /batch/stop response
#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub stop_requested: bool,
}

/// POST /batch/titles request: pasted text, split like the file input does
#[derive(Debug, Deserialize)]
pub struct TitlesRequest {
    pub input: String,
}

#[derive(Debug, Serialize)]
pub struct TitlesResponse {
    pub added: usize,
    pub titles: usize,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct PagePileRequest {
    pub id: u64,
    #[serde(default)]
    pub confirm_large: bool,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    pub prefix: String,
}

/// GET /batch/specification
pub async fn get_specification(
    State(state): State<AppState>,
) -> Json<SpecificationResponse> {
    Json(SpecificationResponse {
        specification: state.controller.specification().await,
        validity: state.controller.validity().await,
    })
}

/// POST /batch/specification
///
/// Apply one specification event. Refused (409) while a batch is saving.
pub async fn apply_event(
    State(state): State<AppState>,
    Json(event): Json<SpecificationEvent>,
) -> ApiResult<Json<SpecificationResponse>> {
    let validity = state.controller.dispatch(event).await?;
    Ok(Json(SpecificationResponse {
        specification: state.controller.specification().await,
        validity,
    }))
}

/// GET /batch/validity
pub async fn get_validity(State(state): State<AppState>) -> Json<Validity> {
    Json(state.controller.validity().await)
}

/// GET /batch/status
pub async fn get_status(State(state): State<AppState>) -> Json<ControllerStatus> {
    Json(state.controller.status().await)
}

/// POST /batch/publish
///
/// Starts the batch in the background and returns 202 Accepted with the run
/// ID. Progress is reported on `/batch/events`.
pub async fn publish(
    State(state): State<AppState>,
    request: Option<Json<PublishRequest>>,
) -> ApiResult<(StatusCode, Json<PublishResponse>)> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let spec = state.controller.specification().await;
    let run_id = state.controller.publish(request.dry_run).await?;

    tracing::info!(
        run_id = %run_id,
        files = spec.titles().len(),
        dry_run = request.dry_run,
        "Batch published"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(PublishResponse {
            run_id,
            files: spec.titles().len(),
            statements_per_file: spec.statements_per_entity(),
            dry_run: request.dry_run,
        }),
    ))
}

/// POST /batch/stop
pub async fn stop(State(state): State<AppState>) -> ApiResult<Json<StopResponse>> {
    state.controller.stop().await?;
    Ok(Json(StopResponse {
        stop_requested: true,
    }))
}

/// POST /batch/titles
pub async fn add_titles(
    State(state): State<AppState>,
    Json(request): Json<TitlesRequest>,
) -> ApiResult<Json<TitlesResponse>> {
    let titles = split_title_input(&request.input);
    let before = state.controller.specification().await.titles().len();
    state
        .controller
        .dispatch(SpecificationEvent::AddTitles { titles })
        .await?;
    let after = state.controller.specification().await.titles().len();

    Ok(Json(TitlesResponse {
        added: after - before,
        titles: after,
    }))
}

/// POST /batch/titles/category
pub async fn load_category(
    State(state): State<AppState>,
    Json(request): Json<CategoryRequest>,
) -> ApiResult<Json<TitlesResponse>> {
    if request.category.trim().is_empty() {
        return Err(ApiError::BadRequest("Category must not be empty".to_string()));
    }
    let added = state.controller.load_category(request.category.trim()).await?;
    let titles = state.controller.specification().await.titles().len();
    Ok(Json(TitlesResponse { added, titles }))
}

/// POST /batch/titles/pagepile
///
/// Large piles are only loaded with `confirm_large`; otherwise the response
/// reports `needs_confirmation`.
pub async fn load_pagepile(
    State(state): State<AppState>,
    Json(request): Json<PagePileRequest>,
) -> ApiResult<Json<PagePileLoad>> {
    let client = state
        .pagepile
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("PagePile loading is not configured".to_string()))?;

    let pile = client.fetch(request.id).await?;
    let load = state
        .controller
        .load_pagepile(pile, request.confirm_large)
        .await?;
    Ok(Json(load))
}

/// GET /batch/suggestions?prefix=
pub async fn suggestions(
    State(state): State<AppState>,
    Query(query): Query<SuggestionQuery>,
) -> ApiResult<Json<Vec<String>>> {
    if query.prefix.trim().is_empty() {
        return Ok(Json(Vec::new()));
    }
    Ok(Json(state.controller.suggestions(&query.prefix).await?))
}

/// Build batch routes
pub fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/batch/specification", get(get_specification).post(apply_event))
        .route("/batch/validity", get(get_validity))
        .route("/batch/status", get(get_status))
        .route("/batch/publish", post(publish))
        .route("/batch/stop", post(stop))
        .route("/batch/titles", post(add_titles))
        .route("/batch/titles/category", post(load_category))
        .route("/batch/titles/pagepile", post(load_pagepile))
        .route("/batch/suggestions", get(suggestions))
}
