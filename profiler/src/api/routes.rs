use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde_json::Value;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::models::{ApiResponse, EntityQuery, EntitySummary, ProfileRequest, ReportCreated, ReportQuery};
use crate::render::{RenderedReport, SortKey};
use crate::services::{AppError, DEFAULT_CONTEXT, ProfilerService, REPORT_NOT_OPEN};

pub async fn list_entities(
    Query(query): Query<EntityQuery>,
    State(service): State<Arc<ProfilerService>>,
) -> Result<Json<ApiResponse<Vec<EntitySummary>>>, AppError> {
    let filter = query.filter.unwrap_or_default();
    let entities = service.list_entities(DEFAULT_CONTEXT, &filter).await?;
    Ok(Json(ApiResponse::success(
        entities.into_iter().map(EntitySummary::from).collect(),
    )))
}

pub async fn create_report(
    State(service): State<Arc<ProfilerService>>,
    Json(request): Json<ProfileRequest>,
) -> Result<Json<ApiResponse<ReportCreated>>, AppError> {
    let selection = request.selection()?;
    let filter = request.filter.unwrap_or_default();
    let report_id = service.profile(DEFAULT_CONTEXT, &selection, &filter).await?;
    Ok(Json(ApiResponse::success(ReportCreated { report_id })))
}

pub async fn submit_distribution(
    State(service): State<Arc<ProfilerService>>,
    Json(payload): Json<Value>,
) -> Result<Json<ApiResponse<ReportCreated>>, AppError> {
    let report_id = service.submit(payload).await?;
    Ok(Json(ApiResponse::success(ReportCreated { report_id })))
}

/// Opens (first call consumes the stored report) and renders a report.
pub async fn get_report(
    Path(report_id): Path<String>,
    Query(query): Query<ReportQuery>,
    State(service): State<Arc<ProfilerService>>,
) -> Result<Json<ApiResponse<RenderedReport>>, AppError> {
    let sort = query.sort_state()?;
    let rendered = service.open_report(&report_id, sort).await?;
    Ok(Json(ApiResponse::success(rendered)))
}

/// Header click: re-sorts an open report, flipping direction on the active key.
pub async fn sort_report(
    Path((report_id, key)): Path<(String, String)>,
    State(service): State<Arc<ProfilerService>>,
) -> Result<Json<ApiResponse<RenderedReport>>, AppError> {
    let key = key.parse::<SortKey>()?;
    let rendered = service.sort_report(&report_id, key)?;
    Ok(Json(ApiResponse::success(rendered)))
}

pub async fn close_report(
    Path(report_id): Path<String>,
    State(service): State<Arc<ProfilerService>>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    if !service.close_report(&report_id) {
        return Err(common::Error::NotFound(REPORT_NOT_OPEN.to_string()).into());
    }
    Ok(Json(ApiResponse::success(report_id)))
}

// Define all API routes
pub fn routes(service: Arc<ProfilerService>) -> Router {
    Router::new()
        .route("/api/entities", get(list_entities))
        .route("/api/reports", post(create_report))
        .route("/api/reports/distribution", post(submit_distribution))
        .route("/api/reports/{id}", get(get_report).delete(close_report))
        .route("/api/reports/{id}/sort/{key}", post(sort_report))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
