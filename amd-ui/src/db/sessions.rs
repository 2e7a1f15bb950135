//! Login session persistence
//!
//! Sessions are server-side rows keyed by an opaque token. Expiry comes from
//! the `session_timeout_seconds` setting; expired rows are deleted lazily on
//! their next lookup.

use amd_common::auth::generate_token;
use amd_common::Result;
use chrono::{Duration, Utc};
use sqlx::{Row, SqlitePool};

const DEFAULT_SESSION_TIMEOUT_SECONDS: i64 = 86400;

/// Authenticated user attached to a valid session
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    /// Permission ids from the user's rights row
    pub permissions: Vec<i64>,
}

/// Create a session for a user and return its token
pub async fn create_session(pool: &SqlitePool, user_id: i64) -> Result<String> {
    let timeout: i64 = sqlx::query_scalar(
        "SELECT CAST(value AS INTEGER) FROM settings WHERE key = 'session_timeout_seconds'",
    )
    .fetch_optional(pool)
    .await?
    .unwrap_or(DEFAULT_SESSION_TIMEOUT_SECONDS);

    let token = generate_token();
    let now = Utc::now();
    let expires_at = now + Duration::seconds(timeout);

    sqlx::query("INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&token)
        .bind(user_id)
        .bind(now.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(pool)
        .await?;

    Ok(token)
}

/// Resolve a session token to its user, role, and permission set.
///
/// Returns `Ok(None)` for an unknown or expired token; an expired row is
/// removed on the way out.
pub async fn authenticate(pool: &SqlitePool, token: &str) -> Result<Option<SessionUser>> {
    let row = sqlx::query(
        r#"
        SELECT s.expires_at, u.id AS user_id, u.username,
               r.name AS role_name, g.permissions
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        LEFT JOIN user_role r ON r.id = u.role_id
        LEFT JOIN rights g ON g.id = u.right_id
        WHERE s.token = ?
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let expires_at: String = row.get("expires_at");
    let expires_at = super::parse_timestamp(&expires_at)?;
    if expires_at <= Utc::now() {
        delete_session(pool, token).await?;
        return Ok(None);
    }

    let permissions = match row.get::<Option<String>, _>("permissions") {
        Some(raw) => serde_json::from_str(&raw).unwrap_or_default(),
        None => Vec::new(),
    };

    Ok(Some(SessionUser {
        user_id: row.get("user_id"),
        username: row.get("username"),
        role: row
            .get::<Option<String>, _>("role_name")
            .unwrap_or_default(),
        permissions,
    }))
}

/// Remove a session (logout or expiry)
pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}
