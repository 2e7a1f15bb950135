//! User administration: listing, detail, create, update, profile

use amd_common::auth::{generate_salt, hash_password};
use amd_common::models::{Permission, ROLE_GUEST_ID};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::auth::CurrentUser;
use super::ApiError;
use crate::db::users::{
    self, NewUser, RecognitionParams, SimpleUser, TariffParams, UserDetail, UserSummary, UserUpdate,
};
use crate::pagination::{self, DEFAULT_PAGE_LIMIT};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserSummary>,
    pub total_count: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
    pub start_page: i64,
    pub end_page: i64,
}

/// Account form payload for create and update.
///
/// On update, an empty password keeps the stored credential.
#[derive(Debug, Deserialize)]
pub struct UserPayload {
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub api_key: Option<String>,
    pub audience: Option<String>,
    #[serde(default)]
    pub tariff: TariffPayload,
    #[serde(default)]
    pub recognition: RecognitionPayload,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TariffPayload {
    pub active: bool,
    pub total: i64,
    pub used: i64,
}

impl Default for TariffPayload {
    fn default() -> Self {
        Self {
            active: false,
            total: 0,
            used: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RecognitionPayload {
    pub encoding: String,
    pub rate: i64,
    pub interim: bool,
    pub interval_length: f64,
    pub predictions: i64,
    pub prediction_criteria: String,
}

impl Default for RecognitionPayload {
    fn default() -> Self {
        Self {
            encoding: "slin".to_string(),
            rate: 8000,
            interim: false,
            interval_length: 2.0,
            predictions: 2,
            prediction_criteria: String::new(),
        }
    }
}

/// GET /api/users (admin only)
pub async fn list_users(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<PageQuery>,
) -> Result<Json<UserListResponse>, ApiError> {
    if !current.is_admin() {
        return Err(ApiError::Forbidden);
    }

    let limit = query.limit.max(1);
    let page = query.page.max(1);
    let offset = pagination::page_offset(page, limit);

    let rows = users::list_users(&state.db, limit, offset).await?;
    let total_count = users::count_users(&state.db).await?;

    let total_pages = pagination::total_pages(total_count, limit);
    let (start_page, end_page) = pagination::display_window(page, total_pages);

    Ok(Json(UserListResponse {
        users: rows,
        total_count,
        page,
        limit,
        total_pages,
        start_page,
        end_page,
    }))
}

/// GET /api/users/simple (admin only) - dropdown entries for filters
pub async fn list_simple_users(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<SimpleUser>>, ApiError> {
    if !current.is_admin() {
        return Err(ApiError::Forbidden);
    }

    let rows = users::list_simple_users(&state.db).await?;
    Ok(Json(rows))
}

/// GET /api/users/:id (admin or self)
pub async fn get_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserDetail>, ApiError> {
    if !current.is_admin() && current.user_id != user_id {
        return Err(ApiError::Forbidden);
    }

    load_detail(&state, user_id).await
}

/// GET /api/profile - the caller's own detail
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<UserDetail>, ApiError> {
    load_detail(&state, current.user_id).await
}

/// POST /api/users (admin with the user-create permission)
pub async fn create_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<UserPayload>,
) -> Result<Json<UserDetail>, ApiError> {
    if !current.is_admin() || !current.has_permission(Permission::UsersCreate) {
        return Err(ApiError::Forbidden);
    }

    let username = payload.username.trim().to_string();
    if username.is_empty() {
        return Err(ApiError::BadRequest("username is required".to_string()));
    }
    if payload.password.is_empty() {
        return Err(ApiError::BadRequest("password is required".to_string()));
    }

    let existing =
        users::find_by_username(&state.db, &username, payload.email.as_deref()).await?;
    if existing.is_some() {
        return Err(ApiError::Conflict(format!(
            "User with username {} or email {} already exists",
            username,
            payload.email.as_deref().unwrap_or("")
        )));
    }

    let salt = generate_salt();
    let hash = hash_password(&payload.password, &salt);

    let new_user = NewUser {
        username,
        password_hash: hash,
        password_salt: salt,
        first_name: payload.first_name,
        last_name: payload.last_name,
        email: payload.email,
        phone: payload.phone,
        api_key: payload.api_key,
        uuid: None,
        audience: payload.audience,
        role_id: ROLE_GUEST_ID,
        tariff: TariffParams {
            active: payload.tariff.active,
            total: payload.tariff.total,
            used: payload.tariff.used,
        },
        recognition: RecognitionParams {
            encoding: payload.recognition.encoding,
            rate: payload.recognition.rate,
            interim: payload.recognition.interim,
            interval_length: payload.recognition.interval_length,
            predictions: payload.recognition.predictions,
            prediction_criteria: payload.recognition.prediction_criteria,
        },
    };

    let user_id = users::insert_user(&state.db, &new_user).await?;

    load_detail(&state, user_id).await
}

/// PUT /api/users/:id (admin with the user-edit permission, or self)
pub async fn update_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<i64>,
    Json(payload): Json<UserPayload>,
) -> Result<Json<UserDetail>, ApiError> {
    let editing_self = current.user_id == user_id;
    let admin_edit = current.is_admin() && current.has_permission(Permission::UsersEdit);
    if !admin_edit && !editing_self {
        return Err(ApiError::Forbidden);
    }

    let username = payload.username.trim().to_string();
    if username.is_empty() {
        return Err(ApiError::BadRequest("username is required".to_string()));
    }

    // Empty password keeps the stored credential
    let password = if payload.password.is_empty() {
        None
    } else {
        let salt = generate_salt();
        let hash = hash_password(&payload.password, &salt);
        Some((hash, salt))
    };

    let update = UserUpdate {
        username,
        password,
        first_name: payload.first_name,
        last_name: payload.last_name,
        email: payload.email,
        phone: payload.phone,
        api_key: payload.api_key,
        audience: payload.audience,
        tariff: TariffParams {
            active: payload.tariff.active,
            total: payload.tariff.total,
            used: payload.tariff.used,
        },
        recognition: RecognitionParams {
            encoding: payload.recognition.encoding,
            rate: payload.recognition.rate,
            interim: payload.recognition.interim,
            interval_length: payload.recognition.interval_length,
            predictions: payload.recognition.predictions,
            prediction_criteria: payload.recognition.prediction_criteria,
        },
    };

    match users::update_user(&state.db, user_id, &update).await? {
        Some(()) => load_detail(&state, user_id).await,
        None => Err(ApiError::NotFound),
    }
}

async fn load_detail(state: &AppState, user_id: i64) -> Result<Json<UserDetail>, ApiError> {
    match users::load_user_detail(&state.db, user_id).await? {
        Some(detail) => Ok(Json(detail)),
        None => Err(ApiError::NotFound),
    }
}
