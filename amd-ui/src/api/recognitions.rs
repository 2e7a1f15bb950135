//! Recognition log browsing: filtered listing and single-request resolution

use amd_common::models::Recognition;
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::auth::CurrentUser;
use super::ApiError;
use crate::db::recognitions::{self, RecognitionFilter, ResolvedRecognition};
use crate::pagination::{self, DEFAULT_PAGE_LIMIT};
use crate::AppState;

/// Query parameters for the recognition listing
#[derive(Debug, Deserialize)]
pub struct RecognitionQuery {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Only honored for administrative callers; other callers always get
    /// their own rows
    pub user_id: Option<String>,
    pub campaign_id: Option<String>,
    pub request_uuid: Option<String>,
    pub extension: Option<String>,
    pub prediction: Option<String>,
    /// Closed interval on the creation timestamp, RFC 3339
    pub from: Option<String>,
    pub to: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

/// Listing response with pagination metadata
#[derive(Debug, Serialize)]
pub struct RecognitionListResponse {
    pub recognitions: Vec<Recognition>,
    pub total_count: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
    pub start_page: i64,
    pub end_page: i64,
}

/// GET /api/recognitions
///
/// Finalized recognitions matching the filters, newest first, one page at a
/// time. Non-administrative callers are always scoped to their own rows.
pub async fn list_recognitions(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<RecognitionQuery>,
) -> Result<Json<RecognitionListResponse>, ApiError> {
    let limit = query.limit.max(1);
    let page = query.page.max(1);
    let offset = pagination::page_offset(page, limit);

    let filter = build_filter(
        query.user_id,
        query.campaign_id,
        query.request_uuid,
        query.extension,
        query.prediction,
        query.from,
        query.to,
    )?;

    let (rows, total_count) =
        recognitions::list_finalized(&state.db, &filter, current.scope(), Some((limit, offset)))
            .await?;

    let total_pages = pagination::total_pages(total_count, limit);
    let (start_page, end_page) = pagination::display_window(page, total_pages);

    Ok(Json(RecognitionListResponse {
        recognitions: rows,
        total_count,
        page,
        limit,
        total_pages,
        start_page,
        end_page,
    }))
}

/// GET /api/recognitions/:id
///
/// A single recognition with its outcome resolved across all attempts that
/// share its request uuid. 404 for a missing row and for a row the caller is
/// not allowed to see.
pub async fn get_recognition(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(recognition_id): Path<i64>,
) -> Result<Json<ResolvedRecognition>, ApiError> {
    let resolved = recognitions::resolve(&state.db, recognition_id, current.scope()).await?;

    match resolved {
        Some(resolved) => Ok(Json(resolved)),
        None => Err(ApiError::NotFound),
    }
}

/// Assemble the engine filter from raw query values.
///
/// Blank values count as absent; malformed ids and timestamps are rejected
/// rather than silently dropped.
pub(crate) fn build_filter(
    user_id: Option<String>,
    campaign_id: Option<String>,
    request_uuid: Option<String>,
    extension: Option<String>,
    prediction: Option<String>,
    from: Option<String>,
    to: Option<String>,
) -> Result<RecognitionFilter, ApiError> {
    Ok(RecognitionFilter {
        user_id: parse_id("user_id", user_id)?,
        campaign_id: parse_id("campaign_id", campaign_id)?,
        request_uuid,
        extension,
        prediction,
        created_from: parse_time("from", from)?,
        created_to: parse_time("to", to)?,
    })
}

fn parse_id(name: &str, value: Option<String>) -> Result<Option<i64>, ApiError> {
    match value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("{} must be an integer: {}", name, raw))),
        None => Ok(None),
    }
}

fn parse_time(name: &str, value: Option<String>) -> Result<Option<DateTime<Utc>>, ApiError> {
    match value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|_| {
                ApiError::BadRequest(format!("{} must be an RFC 3339 timestamp: {}", name, raw))
            }),
        None => Ok(None),
    }
}
