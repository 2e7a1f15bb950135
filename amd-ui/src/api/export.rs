//! CSV export of the recognition log
//!
//! Runs the same filter predicate as the listing endpoint, unpaginated, and
//! streams the full result as a CSV attachment.

use amd_common::models::Permission;
use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Extension,
};
use serde::Deserialize;

use super::auth::CurrentUser;
use super::recognitions::build_filter;
use super::ApiError;
use crate::db::recognitions;
use crate::AppState;

/// Export filters: the listing filters without pagination
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub user_id: Option<String>,
    pub campaign_id: Option<String>,
    pub request_uuid: Option<String>,
    pub extension: Option<String>,
    pub prediction: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// GET /api/recognitions/export
///
/// Requires the export permission (administrators hold it implicitly).
pub async fn export_recognitions(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    if !current.has_permission(Permission::RecognitionsExport) {
        return Err(ApiError::Forbidden);
    }

    let filter = build_filter(
        query.user_id,
        query.campaign_id,
        query.request_uuid,
        query.extension,
        query.prediction,
        query.from,
        query.to,
    )?;

    let (rows, _) = recognitions::list_finalized(&state.db, &filter, current.scope(), None).await?;

    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());

    writer
        .write_record([
            "id",
            "created_at",
            "request_uuid",
            "audio_uuid",
            "prediction",
            "confidence",
            "extension",
            "campaign_id",
            "company_id",
            "application_id",
            "user_id",
        ])
        .map_err(|e| ApiError::Internal(format!("CSV write failed: {}", e)))?;

    for row in &rows {
        writer
            .write_record([
                row.id.to_string(),
                row.created_at.to_rfc3339(),
                row.request_uuid.clone().unwrap_or_default(),
                row.audio_uuid.clone().unwrap_or_default(),
                row.prediction.clone(),
                row.confidence.to_string(),
                row.extension.clone().unwrap_or_default(),
                row.campaign_id.map(|v| v.to_string()).unwrap_or_default(),
                row.company_id.map(|v| v.to_string()).unwrap_or_default(),
                row.application_id.map(|v| v.to_string()).unwrap_or_default(),
                row.user_id.map(|v| v.to_string()).unwrap_or_default(),
            ])
            .map_err(|e| ApiError::Internal(format!("CSV write failed: {}", e)))?;
    }

    let data = writer
        .into_inner()
        .map_err(|e| ApiError::Internal(format!("CSV write failed: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"recognitions.csv\"",
            ),
        ],
        data,
    )
        .into_response())
}
