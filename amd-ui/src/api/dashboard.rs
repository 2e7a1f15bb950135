//! Dashboard endpoint

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::auth::CurrentUser;
use super::ApiError;
use crate::db::dashboard::{self, DashboardCounts};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    /// Only honored for administrative callers
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    /// The user whose counts are shown
    pub user_id: i64,
    pub dashboard: DashboardCounts,
}

/// GET /api/dashboard
///
/// Administrators may select any user; everyone else gets their own counts.
pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let target_user_id = if current.is_admin() {
        query.user_id.unwrap_or(current.user_id)
    } else {
        current.user_id
    };

    let counts = dashboard::load_user_dashboard(&state.db, target_user_id).await?;

    Ok(Json(DashboardResponse {
        user_id: target_user_id,
        dashboard: counts,
    }))
}
