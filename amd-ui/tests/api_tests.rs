//! Integration tests for the amd-ui HTTP API
//!
//! Drives the full router with tower's `oneshot` against a seeded in-memory
//! database: session auth, recognition browsing and resolution, scoping,
//! export, user administration, dashboard, and the license provisioning API.

use amd_common::config::RecognizerDefaults;
use amd_common::db::{create_schema, seed_default_admin, seed_default_roles};
use amd_ui::db::users::{self, NewUser, RecognitionParams, TariffParams};
use amd_ui::{build_router, AppState};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Datelike, Duration, Months, Utc};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot` method

const LICENSE_TOKEN: &str = "test-license-token";

/// Test helper: seeded in-memory database
async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Should connect to in-memory database");

    create_schema(&pool).await.expect("Should create schema");
    seed_default_roles(&pool).await.expect("Should seed roles");
    seed_default_admin(&pool, "password", &RecognizerDefaults::default())
        .await
        .expect("Should seed admin");

    pool
}

/// Test helper: app with test state
fn setup_app(db: SqlitePool) -> Router {
    let state = AppState::new(db, LICENSE_TOKEN.to_string(), RecognizerDefaults::default());
    build_router(state)
}

/// Test helper: GET request with an optional Bearer token
fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Test helper: JSON request with an optional Bearer token
fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

/// Test helper: extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Test helper: log in and return the session token
async fn login(app: &Router, username: &str, password: &str) -> String {
    let request = json_request(
        "POST",
        "/auth/login",
        None,
        json!({ "username": username, "password": password }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    body["token"].as_str().unwrap().to_string()
}

/// Test helper: create a guest account with password "guest-password"
async fn create_guest(pool: &SqlitePool, username: &str, right_id: Option<i64>) -> i64 {
    let salt = amd_common::auth::generate_salt();
    let hash = amd_common::auth::hash_password("guest-password", &salt);

    let user_id = users::insert_user(
        pool,
        &NewUser {
            username: username.to_string(),
            password_hash: hash,
            password_salt: salt,
            first_name: Some("Guest".to_string()),
            last_name: None,
            email: Some(format!("{}@example.net", username)),
            phone: None,
            api_key: None,
            uuid: None,
            audience: None,
            role_id: amd_common::models::ROLE_GUEST_ID,
            tariff: TariffParams {
                active: true,
                total: 100,
                used: 0,
            },
            recognition: RecognitionParams {
                encoding: "slin".to_string(),
                rate: 8000,
                interim: false,
                interval_length: 2.0,
                predictions: 2,
                prediction_criteria: String::new(),
            },
        },
    )
    .await
    .expect("Should insert guest user");

    if let Some(right_id) = right_id {
        sqlx::query("UPDATE users SET right_id = ? WHERE id = ?")
            .bind(right_id)
            .bind(user_id)
            .execute(pool)
            .await
            .unwrap();
    }

    user_id
}

async fn insert_attempt(
    pool: &SqlitePool,
    is_final: bool,
    request_uuid: &str,
    confidence: i64,
    prediction: &str,
    user_id: i64,
) -> i64 {
    sqlx::query(
        r#"
        INSERT INTO recognition (created_at, final, request_uuid, confidence, prediction, user_id)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Utc::now().to_rfc3339())
    .bind(is_final as i64)
    .bind(request_uuid)
    .bind(confidence)
    .bind(prediction)
    .bind(user_id)
    .execute(pool)
    .await
    .expect("Should insert recognition")
    .last_insert_rowid()
}

// =============================================================================
// Health and authentication
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let db = setup_test_db().await;
    let app = setup_app(db);

    let response = app.oneshot(get_request("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "amd-ui");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let db = setup_test_db().await;
    let app = setup_app(db);

    let request = json_request(
        "POST",
        "/auth/login",
        None,
        json!({ "username": "admin", "password": "wrong" }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = json_request(
        "POST",
        "/auth/login",
        None,
        json!({ "username": "", "password": "" }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_trims_whitespace() {
    let db = setup_test_db().await;
    let app = setup_app(db);

    let request = json_request(
        "POST",
        "/auth/login",
        None,
        json!({ "username": "  admin  ", "password": "  password  " }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let db = setup_test_db().await;
    let app = setup_app(db);

    let response = app
        .clone()
        .oneshot(get_request("/api/recognitions", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(get_request("/api/recognitions", Some("bogus")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_invalidates_session() {
    let db = setup_test_db().await;
    let app = setup_app(db);

    let token = login(&app, "admin", "password").await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/auth/logout", Some(&token), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request("/api/recognitions", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Recognition listing
// =============================================================================

#[tokio::test]
async fn test_recognition_listing_pagination_and_filters() {
    let db = setup_test_db().await;
    for i in 0..11 {
        insert_attempt(&db, true, &format!("req-{}", i), 50 + i, "human", 1).await;
    }
    insert_attempt(&db, false, "req-interim", 10, "ring", 1).await;
    let app = setup_app(db);

    let token = login(&app, "admin", "password").await;

    let response = app
        .clone()
        .oneshot(get_request("/api/recognitions?page=2&limit=10", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    // The interim row is invisible; the partial second page holds one row
    assert_eq!(body["total_count"], 11);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["page"], 2);
    assert_eq!(body["start_page"], 1);
    assert_eq!(body["end_page"], 2);
    assert_eq!(body["recognitions"].as_array().unwrap().len(), 1);

    // Newest first on page one
    let response = app
        .clone()
        .oneshot(get_request("/api/recognitions?page=1&limit=10", Some(&token)))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    let rows = body["recognitions"].as_array().unwrap();
    assert_eq!(rows[0]["request_uuid"], "req-10");

    // Equality filter on request uuid
    let response = app
        .oneshot(get_request(
            "/api/recognitions?request_uuid=req-3",
            Some(&token),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total_count"], 1);
    assert_eq!(body["recognitions"][0]["prediction"], "human");
}

#[tokio::test]
async fn test_recognition_listing_rejects_bad_filter_values() {
    let db = setup_test_db().await;
    let app = setup_app(db);
    let token = login(&app, "admin", "password").await;

    let response = app
        .clone()
        .oneshot(get_request("/api/recognitions?user_id=abc", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(get_request("/api/recognitions?from=yesterday", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_guest_listing_is_scoped_to_own_rows() {
    let db = setup_test_db().await;
    let guest = create_guest(&db, "guest1", None).await;
    insert_attempt(&db, true, "req-admin", 80, "human", 1).await;
    insert_attempt(&db, true, "req-guest", 70, "voicemail", guest).await;
    let app = setup_app(db);

    let token = login(&app, "guest1", "guest-password").await;

    // Asking for the admin's rows explicitly changes nothing
    let response = app
        .oneshot(get_request("/api/recognitions?user_id=1", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total_count"], 1);
    assert_eq!(body["recognitions"][0]["request_uuid"], "req-guest");
}

// =============================================================================
// Recognition resolution
// =============================================================================

#[tokio::test]
async fn test_recognition_detail_resolves_outcome() {
    let db = setup_test_db().await;
    insert_attempt(&db, false, "req-a", 90, "ring", 1).await;
    let primary = insert_attempt(&db, false, "req-a", 60, "human", 1).await;
    insert_attempt(&db, true, "req-a", 80, "voicemail", 1).await;
    let app = setup_app(db);

    let token = login(&app, "admin", "password").await;

    let response = app
        .clone()
        .oneshot(get_request(
            &format!("/api/recognitions/{}", primary),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    // (60 + 80) / 2, the ring attempt stays out of the average
    assert_eq!(body["confidence"], 70.0);
    assert_eq!(body["prediction"], "voicemail");
    assert_eq!(body["related"].as_array().unwrap().len(), 3);
    // The stored row itself is returned unmodified
    assert_eq!(body["recognition"]["confidence"], 60);
    assert_eq!(body["recognition"]["prediction"], "human");

    // Identical on a second call
    let response = app
        .oneshot(get_request(
            &format!("/api/recognitions/{}", primary),
            Some(&token),
        ))
        .await
        .unwrap();
    let again = extract_json(response.into_body()).await;
    assert_eq!(body, again);
}

#[tokio::test]
async fn test_recognition_detail_fails_closed_for_guests() {
    let db = setup_test_db().await;
    let _guest = create_guest(&db, "guest1", None).await;
    let admin_row = insert_attempt(&db, true, "req-admin", 80, "human", 1).await;
    let app = setup_app(db);

    let token = login(&app, "guest1", "guest-password").await;

    let foreign = app
        .clone()
        .oneshot(get_request(
            &format!("/api/recognitions/{}", admin_row),
            Some(&token),
        ))
        .await
        .unwrap();
    let missing = app
        .oneshot(get_request("/api/recognitions/99999", Some(&token)))
        .await
        .unwrap();

    // A foreign row and a missing row answer identically
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// CSV export
// =============================================================================

#[tokio::test]
async fn test_export_returns_csv() {
    let db = setup_test_db().await;
    insert_attempt(&db, true, "req-a", 80, "human", 1).await;
    insert_attempt(&db, true, "req-b", 70, "voicemail", 1).await;
    insert_attempt(&db, false, "req-c", 10, "ring", 1).await;
    let app = setup_app(db);

    let token = login(&app, "admin", "password").await;

    let response = app
        .oneshot(get_request("/api/recognitions/export", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/csv"
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    // Header plus the two finalized rows
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("id,created_at,request_uuid"));
    assert!(text.contains("req-a"));
    assert!(!text.contains("req-c"));
}

#[tokio::test]
async fn test_export_requires_permission() {
    let db = setup_test_db().await;

    // One guest without rights, one with the export permission
    let _plain = create_guest(&db, "guest1", None).await;
    let right_id = sqlx::query(
        "INSERT INTO rights (name, permissions) VALUES ('exporter', ?)",
    )
    .bind(
        serde_json::to_string(&[amd_common::models::Permission::RecognitionsExport.id()]).unwrap(),
    )
    .execute(&db)
    .await
    .unwrap()
    .last_insert_rowid();
    let _exporter = create_guest(&db, "guest2", Some(right_id)).await;

    let app = setup_app(db);

    let token = login(&app, "guest1", "guest-password").await;
    let response = app
        .clone()
        .oneshot(get_request("/api/recognitions/export", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let token = login(&app, "guest2", "guest-password").await;
    let response = app
        .oneshot(get_request("/api/recognitions/export", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Dashboard
// =============================================================================

#[tokio::test]
async fn test_dashboard_counts_todays_finalized_rows() {
    let db = setup_test_db().await;
    let guest = create_guest(&db, "guest1", None).await;
    insert_attempt(&db, true, "req-a", 80, "voicemail", 1).await;
    insert_attempt(&db, true, "req-b", 70, "human", 1).await;
    insert_attempt(&db, false, "req-c", 10, "ring", 1).await;
    insert_attempt(&db, true, "req-d", 60, "voicemail", guest).await;
    let app = setup_app(db);

    let token = login(&app, "admin", "password").await;

    let response = app
        .clone()
        .oneshot(get_request("/api/dashboard", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["user_id"], 1);
    assert_eq!(body["dashboard"]["today_total"], 2);
    assert_eq!(body["dashboard"]["today_voicemail"], 1);
    assert_eq!(body["dashboard"]["today_human"], 1);
    assert_eq!(body["dashboard"]["month_total"], 2);

    // Admins may look at another user's board
    let response = app
        .clone()
        .oneshot(get_request(
            &format!("/api/dashboard?user_id={}", guest),
            Some(&token),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["user_id"], guest);
    assert_eq!(body["dashboard"]["today_total"], 1);

    // Guests always get their own board
    let guest_token = login(&app, "guest1", "guest-password").await;
    let response = app
        .oneshot(get_request("/api/dashboard?user_id=1", Some(&guest_token)))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["user_id"], guest);
}

#[tokio::test]
async fn test_dashboard_windows_span_month_boundary() {
    let db = setup_test_db().await;

    let insert_at = |created_at: String| {
        let db = db.clone();
        async move {
            sqlx::query(
                r#"
                INSERT INTO recognition (created_at, final, request_uuid, confidence, prediction, user_id)
                VALUES (?, 1, 'req-window', 50, 'human', 1)
                "#,
            )
            .bind(created_at)
            .execute(&db)
            .await
            .expect("Should insert recognition");
        }
    };

    let now = Utc::now();
    let prev_month_start = now
        .date_naive()
        .with_day(1)
        .unwrap()
        .checked_sub_months(Months::new(1))
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
        .and_utc();

    // Today; six days back (possibly in the previous month); just inside the
    // month window; just before it
    insert_at(now.to_rfc3339()).await;
    insert_at((now - Duration::days(6)).to_rfc3339()).await;
    insert_at(prev_month_start.to_rfc3339()).await;
    insert_at((prev_month_start - Duration::days(1)).to_rfc3339()).await;

    let app = setup_app(db);
    let token = login(&app, "admin", "password").await;

    let response = app
        .oneshot(get_request("/api/dashboard", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["dashboard"]["today_total"], 1);
    // The six-days-ago row counts toward the week even when it falls in the
    // previous month
    assert_eq!(body["dashboard"]["week_total"], 2);
    // The month window starts at the first day of the previous month
    assert_eq!(body["dashboard"]["month_total"], 3);
}

// =============================================================================
// User administration
// =============================================================================

#[tokio::test]
async fn test_user_listing_is_admin_only() {
    let db = setup_test_db().await;
    let _guest = create_guest(&db, "guest1", None).await;
    let app = setup_app(db);

    let token = login(&app, "admin", "password").await;
    let response = app
        .clone()
        .oneshot(get_request("/api/users?page=1&limit=10", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total_count"], 2);
    assert_eq!(body["total_pages"], 1);
    let listed = body["users"].as_array().unwrap();
    assert_eq!(listed.len(), 2);
    // Tariff columns ride along, credentials never do
    assert_eq!(listed[1]["username"], "guest1");
    assert_eq!(listed[1]["active"], true);
    assert_eq!(listed[1]["total"], 100);
    assert!(listed[0].get("password_hash").is_none());

    let guest_token = login(&app, "guest1", "guest-password").await;
    let response = app
        .oneshot(get_request("/api/users", Some(&guest_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_and_update_user() {
    let db = setup_test_db().await;
    let app = setup_app(db);

    let token = login(&app, "admin", "password").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/users",
            Some(&token),
            json!({
                "username": "operator",
                "password": "initial-secret",
                "email": "operator@example.net",
                "tariff": { "active": true, "total": 500, "used": 0 },
                "recognition": { "encoding": "slin", "rate": 8000, "interim": true,
                                 "interval_length": 3.0, "predictions": 3,
                                 "prediction_criteria": "{}" }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let user_id = body["id"].as_i64().unwrap();
    assert_eq!(body["username"], "operator");
    assert_eq!(body["role"]["name"], "guest");
    assert_eq!(body["tariff"]["total"], 500);
    assert_eq!(body["recognition"]["predictions"], 3);

    // Duplicate username is rejected
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/users",
            Some(&token),
            json!({ "username": "operator", "password": "other" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Update with an empty password keeps the credential
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/users/{}", user_id),
            Some(&token),
            json!({
                "username": "operator",
                "password": "",
                "first_name": "Op",
                "tariff": { "active": false, "total": 250, "used": 10 },
                "recognition": { "encoding": "ulaw", "rate": 16000, "interim": false,
                                 "interval_length": 2.0, "predictions": 2,
                                 "prediction_criteria": "" }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["first_name"], "Op");
    assert_eq!(body["tariff"]["total"], 250);
    assert_eq!(body["recognition"]["encoding"], "ulaw");

    // The original password still logs in
    let operator_token = login(&app, "operator", "initial-secret").await;
    let response = app
        .oneshot(get_request("/api/profile", Some(&operator_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["username"], "operator");
}

#[tokio::test]
async fn test_guest_cannot_read_other_users() {
    let db = setup_test_db().await;
    let guest = create_guest(&db, "guest1", None).await;
    let app = setup_app(db);

    let token = login(&app, "guest1", "guest-password").await;

    let response = app
        .clone()
        .oneshot(get_request("/api/users/1", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(get_request(&format!("/api/users/{}", guest), Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// License provisioning API
// =============================================================================

#[tokio::test]
async fn test_license_api_rejects_bad_token() {
    let db = setup_test_db().await;
    let app = setup_app(db);

    let response = app
        .clone()
        .oneshot(get_request("/api/user/some-uuid?access_token=wrong", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["data"], "Invalid access token");

    let response = app
        .oneshot(get_request("/api/user/some-uuid", None))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_license_provisioning_roundtrip() {
    let db = setup_test_db().await;
    let app = setup_app(db);

    // Provision
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/user?access_token={}", LICENSE_TOKEN),
            None,
            json!({
                "uuid": "11111111-2222-3333-4444-555555555555",
                "username": "licensed",
                "password": "from-license-server",
                "email": "licensed@example.net"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["username"], "licensed");
    assert_eq!(body["data"]["tariff"]["total"], 0);
    assert!(body["data"].get("password").is_none());

    // Duplicate uuid is rejected
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/user?access_token={}", LICENSE_TOKEN),
            None,
            json!({
                "uuid": "11111111-2222-3333-4444-555555555555",
                "username": "licensed2",
                "password": "x"
            }),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], false);

    // Fetch
    let response = app
        .clone()
        .oneshot(get_request(
            &format!(
                "/api/user/11111111-2222-3333-4444-555555555555?access_token={}",
                LICENSE_TOKEN
            ),
            None,
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["username"], "licensed");

    // Meter: zero is invalid, five lands on the tariff
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!(
                "/api/user/11111111-2222-3333-4444-555555555555/license?access_token={}&count=0",
                LICENSE_TOKEN
            ),
            None,
            json!({}),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], false);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!(
                "/api/user/11111111-2222-3333-4444-555555555555/license?access_token={}&count=5",
                LICENSE_TOKEN
            ),
            None,
            json!({}),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);

    let response = app
        .oneshot(get_request(
            &format!(
                "/api/user/11111111-2222-3333-4444-555555555555?access_token={}",
                LICENSE_TOKEN
            ),
            None,
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["data"]["tariff"]["total"], 5);
}

#[tokio::test]
async fn test_license_create_requires_fields() {
    let db = setup_test_db().await;
    let app = setup_app(db);

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/api/user?access_token={}", LICENSE_TOKEN),
            None,
            json!({ "username": "incomplete", "password": "x" }),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["data"], "Missing uuid");
}
