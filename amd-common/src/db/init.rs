//! Database initialization
//!
//! Creates the SQLite database on first run, applies the schema idempotently,
//! and seeds default roles, settings, and the administrator account. One pool
//! is constructed here at process start and passed explicitly to every
//! consumer; there is no global connection handle.

use std::path::Path;

use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::info;

use crate::auth::{generate_salt, hash_password};
use crate::config::RecognizerDefaults;
use crate::models::{ROLE_ADMIN, ROLE_GUEST};
use crate::Result;

/// Initialize the database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Set busy timeout
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Apply the schema and default settings (idempotent, safe to call repeatedly)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_user_role_table(pool).await?;
    create_rights_table(pool).await?;
    create_tariff_table(pool).await?;
    create_recognition_configuration_table(pool).await?;
    create_users_table(pool).await?;
    create_recognition_table(pool).await?;
    create_sessions_table(pool).await?;
    create_settings_table(pool).await?;

    init_default_settings(pool).await?;

    Ok(())
}

async fn create_user_role_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_role (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_rights_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rights (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT,
            permissions TEXT NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_tariff_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tariff (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 0,
            total INTEGER NOT NULL DEFAULT 0,
            used INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_recognition_configuration_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recognition_configuration (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            encoding TEXT NOT NULL DEFAULT 'slin',
            rate INTEGER NOT NULL DEFAULT 8000,
            interim INTEGER NOT NULL DEFAULT 0,
            interval_length REAL NOT NULL DEFAULT 2.0,
            predictions INTEGER NOT NULL DEFAULT 2,
            prediction_criteria TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            first_name TEXT,
            last_name TEXT,
            email TEXT,
            phone TEXT,
            api_key TEXT,
            uuid TEXT,
            audience TEXT,
            role_id INTEGER NOT NULL REFERENCES user_role(id),
            right_id INTEGER REFERENCES rights(id),
            tariff_id INTEGER NOT NULL REFERENCES tariff(id),
            recognition_id INTEGER NOT NULL REFERENCES recognition_configuration(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_recognition_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recognition (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at TEXT NOT NULL,
            final INTEGER NOT NULL DEFAULT 0,
            request_uuid TEXT,
            audio_uuid TEXT,
            confidence INTEGER NOT NULL DEFAULT 0,
            prediction TEXT NOT NULL DEFAULT 'not_predicted',
            extension TEXT,
            company_id INTEGER,
            campaign_id INTEGER,
            application_id INTEGER,
            user_id INTEGER REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // The listing path filters on final/user and the resolution path walks
    // request_uuid groups; both need indexes to stay usable at log volume.
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_recognition_request_uuid ON recognition(request_uuid)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_recognition_user_final ON recognition(user_id, final)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id),
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores service configuration key-value pairs.
async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize default settings
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "session_timeout_seconds", "86400").await?;

    Ok(())
}

/// Insert a setting if missing; reset a NULL value back to its default
async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value WHERE settings.value IS NULL
        "#,
    )
    .bind(key)
    .bind(default_value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed the `admin` and `guest` roles
pub async fn seed_default_roles(pool: &SqlitePool) -> Result<()> {
    for role in [ROLE_ADMIN, ROLE_GUEST] {
        sqlx::query("INSERT OR IGNORE INTO user_role (name) VALUES (?)")
            .bind(role)
            .execute(pool)
            .await?;
    }

    Ok(())
}

/// Seed the administrator account on first run.
///
/// Creates a fresh tariff and recognition configuration for the account; a
/// transaction keeps the three inserts atomic. Does nothing when an `admin`
/// user already exists.
pub async fn seed_default_admin(
    pool: &SqlitePool,
    password: &str,
    recognizer: &RecognizerDefaults,
) -> Result<()> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = 'admin'")
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Ok(());
    }

    let now = Utc::now().to_rfc3339();
    let salt = generate_salt();
    let hash = hash_password(password, &salt);

    let mut tx = pool.begin().await?;

    let tariff_id = sqlx::query(
        "INSERT INTO tariff (created_at, updated_at, active, total, used) VALUES (?, ?, 1, 1000, 0)",
    )
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let recognition_id = sqlx::query(
        r#"
        INSERT INTO recognition_configuration
            (encoding, rate, interim, interval_length, predictions, prediction_criteria)
        VALUES (?, ?, 0, ?, ?, ?)
        "#,
    )
    .bind(&recognizer.encoding)
    .bind(recognizer.rate)
    .bind(recognizer.interval_length)
    .bind(recognizer.predictions)
    .bind(&recognizer.prediction_criteria)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let admin_role_id: i64 = sqlx::query_scalar("SELECT id FROM user_role WHERE name = ?")
        .bind(ROLE_ADMIN)
        .fetch_one(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO users
            (created_at, updated_at, username, password_hash, password_salt,
             first_name, last_name, email, role_id, tariff_id, recognition_id)
        VALUES (?, ?, 'admin', ?, ?, 'Administrator', 'Administrator', 'amd@localhost', ?, ?, ?)
        "#,
    )
    .bind(&now)
    .bind(&now)
    .bind(&hash)
    .bind(&salt)
    .bind(admin_role_id)
    .bind(tariff_id)
    .bind(recognition_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!("Seeded administrator account");
    Ok(())
}
