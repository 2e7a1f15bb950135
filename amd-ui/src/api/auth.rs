//! Session authentication: login, logout, and the session middleware
//!
//! Protected routes receive a [`CurrentUser`] extension computed once per
//! request from the Bearer token. Authorization is carried as an explicit
//! value from here on; handlers never consult ambient state.

use amd_common::auth::verify_password;
use amd_common::models::Permission;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::db::recognitions::OwnerScope;
use crate::db::{sessions, users};
use crate::AppState;

/// Authenticated caller, attached to every protected request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub permissions: Vec<i64>,
}

/// Raw session token of the current request (needed for logout)
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == amd_common::models::ROLE_ADMIN
    }

    /// Query scope derived from the caller's role
    pub fn scope(&self) -> OwnerScope {
        if self.is_admin() {
            OwnerScope::Unrestricted
        } else {
            OwnerScope::User(self.user_id)
        }
    }

    /// Administrators implicitly hold every permission
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.is_admin() || self.permissions.contains(&permission.id())
    }
}

impl From<sessions::SessionUser> for CurrentUser {
    fn from(session: sessions::SessionUser) -> Self {
        Self {
            user_id: session.user_id,
            username: session.username,
            role: session.role,
            permissions: session.permissions,
        }
    }
}

/// Session middleware for protected routes.
///
/// Expects `Authorization: Bearer <token>`; resolves the token to a user,
/// role, and permission set and attaches them to the request. Returns 401 for
/// a missing, unknown, or expired token.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)?
        .to_string();

    let session_user = sessions::authenticate(&state.db, &token)
        .await
        .map_err(|e| AuthError::Database(e.to_string()))?
        .ok_or(AuthError::InvalidToken)?;

    request
        .extensions_mut()
        .insert(CurrentUser::from(session_user));
    request.extensions_mut().insert(SessionToken(token));

    Ok(next.run(request).await)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub id: i64,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
}

/// POST /auth/login
///
/// Credentials are whitespace-trimmed before verification. Invalid username
/// and invalid password are indistinguishable in the response.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let username = body.username.trim();
    let password = body.password.trim();

    if username.is_empty() || password.is_empty() {
        return Err(AuthError::InvalidCredentials);
    }

    let user = users::find_by_username(&state.db, username, None)
        .await
        .map_err(|e| AuthError::Database(e.to_string()))?;

    let Some(user) = user else {
        warn!("Login failed for unknown username");
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_salt, &user.password_hash) {
        warn!("Login failed for user {}", user.username);
        return Err(AuthError::InvalidCredentials);
    }

    let role = users::load_role(&state.db, user.role_id)
        .await
        .map_err(|e| AuthError::Database(e.to_string()))?
        .map(|role| role.name)
        .unwrap_or_default();

    let token = sessions::create_session(&state.db, user.id)
        .await
        .map_err(|e| AuthError::Database(e.to_string()))?;

    info!("User {} logged in", user.username);

    Ok(Json(LoginResponse {
        token,
        user: LoginUser {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            role,
        },
    }))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    axum::Extension(token): axum::Extension<SessionToken>,
) -> Result<Json<serde_json::Value>, AuthError> {
    sessions::delete_session(&state.db, &token.0)
        .await
        .map_err(|e| AuthError::Database(e.to_string()))?;

    Ok(Json(json!({ "status": "ok" })))
}

/// Authentication error types for HTTP responses
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    InvalidCredentials,
    Database(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Missing token".to_string()),
            AuthError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, "Invalid or expired token".to_string())
            }
            AuthError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid username or password".to_string())
            }
            AuthError::Database(msg) => {
                tracing::error!("Database error during authentication: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
