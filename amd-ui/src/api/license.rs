//! Provisioning API for the external license-management server
//!
//! Authenticated per request by the `access_token` query parameter. The wire
//! contract is fixed by the license server: every response is a 200 with
//! `{"success": bool, "data": ...}`; failures carry a message in `data`.

use amd_common::auth::{generate_salt, hash_password};
use amd_common::models::{Tariff, User, ROLE_GUEST_ID};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::error;

use crate::db::users::{self, NewUser, RecognitionParams, TariffParams};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LicenseResponse {
    pub success: bool,
    pub data: Value,
}

#[derive(Debug, Deserialize)]
pub struct LicenseQuery {
    pub access_token: Option<String>,
    pub count: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LicenseCreateRequest {
    pub uuid: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub audience: Option<String>,
}

fn ok(data: Value) -> Json<LicenseResponse> {
    Json(LicenseResponse {
        success: true,
        data,
    })
}

fn fail(message: &str) -> Json<LicenseResponse> {
    Json(LicenseResponse {
        success: false,
        data: Value::String(message.to_string()),
    })
}

fn check_token(state: &AppState, query: &LicenseQuery) -> Result<(), Json<LicenseResponse>> {
    match query.access_token.as_deref() {
        Some(token) if !token.is_empty() && token == state.license_token => Ok(()),
        _ => Err(fail("Invalid access token")),
    }
}

/// User payload on the license wire: account fields plus tariff, no
/// credential material and no recognizer internals
fn license_user(user: &User, tariff: Option<&Tariff>) -> Value {
    json!({
        "id": user.id,
        "uuid": user.uuid,
        "username": user.username,
        "first_name": user.first_name,
        "last_name": user.last_name,
        "email": user.email,
        "phone": user.phone,
        "audience": user.audience,
        "tariff": tariff.map(|t| json!({
            "id": t.id,
            "active": t.active,
            "total": t.total,
            "used": t.used,
        })),
    })
}

/// GET /api/user/:uuid
pub async fn license_get_user(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Query(query): Query<LicenseQuery>,
) -> Json<LicenseResponse> {
    if let Err(response) = check_token(&state, &query) {
        return response;
    }

    if uuid.trim().is_empty() {
        return fail("Invalid UUID");
    }

    let user = match users::find_by_uuid(&state.db, &uuid).await {
        Ok(user) => user,
        Err(e) => {
            error!("License lookup failed: {}", e);
            return fail("Internal error");
        }
    };

    let Some(user) = user else {
        return fail("User does not exist with requested uuid");
    };

    let tariff = match users::load_tariff(&state.db, user.tariff_id).await {
        Ok(tariff) => tariff,
        Err(e) => {
            error!("License lookup failed: {}", e);
            return fail("Internal error");
        }
    };

    ok(license_user(&user, tariff.as_ref()))
}

/// POST /api/user
///
/// Provisions an account: guest role, a fresh inactive tariff, and the
/// configured default recognizer parameters.
pub async fn license_create_user(
    State(state): State<AppState>,
    Query(query): Query<LicenseQuery>,
    Json(body): Json<LicenseCreateRequest>,
) -> Json<LicenseResponse> {
    if let Err(response) = check_token(&state, &query) {
        return response;
    }

    let Some(uuid) = body.uuid.as_deref().map(str::trim).filter(|v| !v.is_empty()) else {
        return fail("Missing uuid");
    };
    let Some(password) = body.password.as_deref().filter(|v| !v.is_empty()) else {
        return fail("Missing password");
    };
    let Some(username) = body
        .username
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    else {
        return fail("Missing username");
    };

    match users::find_by_uuid(&state.db, uuid).await {
        Ok(Some(_)) => return fail("User already exists"),
        Ok(None) => {}
        Err(e) => {
            error!("License provisioning failed: {}", e);
            return fail("Internal error");
        }
    }

    match users::find_by_username(&state.db, username, body.email.as_deref()).await {
        Ok(Some(_)) => return fail("User already exists with defined email or username"),
        Ok(None) => {}
        Err(e) => {
            error!("License provisioning failed: {}", e);
            return fail("Internal error");
        }
    }

    let salt = generate_salt();
    let hash = hash_password(password, &salt);
    let recognizer = &state.recognizer;

    let new_user = NewUser {
        username: username.to_string(),
        password_hash: hash,
        password_salt: salt,
        first_name: body.first_name,
        last_name: body.last_name,
        email: body.email,
        phone: body.phone,
        api_key: None,
        uuid: Some(uuid.to_string()),
        audience: body.audience,
        role_id: ROLE_GUEST_ID,
        tariff: TariffParams {
            active: false,
            total: 0,
            used: 0,
        },
        recognition: RecognitionParams {
            encoding: recognizer.encoding.clone(),
            rate: recognizer.rate,
            interim: false,
            interval_length: recognizer.interval_length,
            predictions: recognizer.predictions,
            prediction_criteria: recognizer.prediction_criteria.clone(),
        },
    };

    let user_id = match users::insert_user(&state.db, &new_user).await {
        Ok(user_id) => user_id,
        Err(e) => {
            error!("License provisioning failed: {}", e);
            return fail("Internal error");
        }
    };

    match users::load_user(&state.db, user_id).await {
        Ok(Some(user)) => {
            let tariff = users::load_tariff(&state.db, user.tariff_id)
                .await
                .ok()
                .flatten();
            ok(license_user(&user, tariff.as_ref()))
        }
        Ok(None) => fail("Internal error"),
        Err(e) => {
            error!("License provisioning failed: {}", e);
            fail("Internal error")
        }
    }
}

/// POST /api/user/:uuid/license?count=N
///
/// Adds N licenses to the user's tariff total.
pub async fn license_increment(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Query(query): Query<LicenseQuery>,
) -> Json<LicenseResponse> {
    if let Err(response) = check_token(&state, &query) {
        return response;
    }

    if uuid.trim().is_empty() {
        return fail("Invalid UUID");
    }

    let count = query.count.unwrap_or(0);
    if count <= 0 {
        return fail("Invalid license count, should be greater than 0");
    }

    let user = match users::find_by_uuid(&state.db, &uuid).await {
        Ok(user) => user,
        Err(e) => {
            error!("License increment failed: {}", e);
            return fail("Internal error");
        }
    };

    let Some(user) = user else {
        return fail("User does not exist with requested uuid");
    };

    if let Err(e) = users::increment_tariff(&state.db, user.tariff_id, count).await {
        error!("License increment failed: {}", e);
        return fail("Internal error");
    }

    ok(Value::String(
        "Successfully incremented user tariff".to_string(),
    ))
}
