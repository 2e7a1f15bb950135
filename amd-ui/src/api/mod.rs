//! HTTP API handlers for amd-ui

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

pub mod auth;
pub mod dashboard;
pub mod export;
pub mod health;
pub mod license;
pub mod recognitions;
pub mod users;

pub use auth::{login, logout, session_middleware, CurrentUser};
pub use dashboard::get_dashboard;
pub use export::export_recognitions;
pub use health::health_routes;
pub use license::{license_create_user, license_get_user, license_increment};
pub use recognitions::{get_recognition, list_recognitions};
pub use users::{create_user, get_profile, get_user, list_simple_users, list_users, update_user};

/// Error responses shared by the administrative handlers.
///
/// Not-found and storage faults are distinguishable on the wire (404 vs 500);
/// faults are logged here so the fact that a query failed is never silently
/// presented as an empty result.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Forbidden,
    NotFound,
    Conflict(String),
    Database(String),
    Internal(String),
}

impl From<amd_common::Error> for ApiError {
    fn from(err: amd_common::Error) -> Self {
        match err {
            amd_common::Error::Database(e) => ApiError::Database(e.to_string()),
            amd_common::Error::NotFound(_) => ApiError::NotFound,
            amd_common::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Database(msg) => {
                error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
