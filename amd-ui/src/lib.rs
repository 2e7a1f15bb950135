//! amd-ui library - administrative HTTP service
//!
//! JSON API for operators and administrators of the voicemail/AMD platform:
//! session login, user and tariff administration, recognition log browsing
//! with filters and pagination, dashboards, CSV export, and the provisioning
//! API used by the external license server.

use amd_common::config::RecognizerDefaults;
use axum::Router;
use sqlx::SqlitePool;

pub mod api;
pub mod db;
pub mod pagination;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Access token required from the external license server
    pub license_token: String,
    /// Recognizer defaults applied to provisioned accounts
    pub recognizer: RecognizerDefaults,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, license_token: String, recognizer: RecognizerDefaults) -> Self {
        Self {
            db,
            license_token,
            recognizer,
        }
    }
}

/// Build application router
///
/// Session-protected routes require a Bearer token from `POST /auth/login`;
/// the license-server routes authenticate per request via `access_token`;
/// `/health` and `/auth/login` are public.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};
    use tower_http::trace::TraceLayer;

    // Protected routes (require a valid session)
    let protected = Router::new()
        .route("/auth/logout", post(api::logout))
        .route("/api/dashboard", get(api::get_dashboard))
        .route("/api/profile", get(api::get_profile))
        .route("/api/users", get(api::list_users).post(api::create_user))
        .route("/api/users/simple", get(api::list_simple_users))
        .route("/api/users/:id", get(api::get_user).put(api::update_user))
        .route("/api/recognitions", get(api::list_recognitions))
        .route("/api/recognitions/export", get(api::export_recognitions))
        .route("/api/recognitions/:id", get(api::get_recognition))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::session_middleware,
        ));

    // License-server provisioning API (access_token query parameter)
    let license = Router::new()
        .route("/api/user", post(api::license_create_user))
        .route("/api/user/:uuid", get(api::license_get_user))
        .route("/api/user/:uuid/license", post(api::license_increment));

    // Public routes (no authentication)
    let public = Router::new()
        .route("/auth/login", post(api::login))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(license)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
