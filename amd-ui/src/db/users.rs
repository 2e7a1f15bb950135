//! User, tariff, and recognition-configuration queries
//!
//! Account mutation always goes through a transaction: a user row owns a
//! tariff row and a recognition_configuration row, and the three move
//! together.

use amd_common::models::{RecognitionConfiguration, Tariff, User, UserRole};
use amd_common::Result;
use chrono::Utc;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Tariff fields accepted from the administrative forms
#[derive(Debug, Clone)]
pub struct TariffParams {
    pub active: bool,
    pub total: i64,
    pub used: i64,
}

/// Recognizer fields accepted from the administrative forms
#[derive(Debug, Clone)]
pub struct RecognitionParams {
    pub encoding: String,
    pub rate: i64,
    pub interim: bool,
    pub interval_length: f64,
    pub predictions: i64,
    pub prediction_criteria: String,
}

/// Everything needed to create an account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub password_salt: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub api_key: Option<String>,
    pub uuid: Option<String>,
    pub audience: Option<String>,
    pub role_id: i64,
    pub tariff: TariffParams,
    pub recognition: RecognitionParams,
}

/// Account update; `password` of `None` keeps the stored credential
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub username: String,
    pub password: Option<(String, String)>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub api_key: Option<String>,
    pub audience: Option<String>,
    pub tariff: TariffParams,
    pub recognition: RecognitionParams,
}

/// User with its joined account records, for detail views
#[derive(Debug, Clone, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub role: Option<UserRole>,
    pub tariff: Option<Tariff>,
    pub recognition: Option<RecognitionConfiguration>,
}

/// One row of the administrative user listing (tariff columns joined in)
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub created_at: chrono::DateTime<Utc>,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub api_key: Option<String>,
    pub audience: Option<String>,
    pub role_id: i64,
    pub tariff_id: i64,
    pub active: bool,
    pub total: i64,
    pub used: i64,
}

/// Minimal user entry for filter dropdowns
#[derive(Debug, Clone, Serialize)]
pub struct SimpleUser {
    pub id: i64,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

const USER_COLUMNS: &str = "SELECT id, created_at, updated_at, username, password_hash, \
     password_salt, first_name, last_name, email, phone, api_key, uuid, audience, \
     role_id, right_id, tariff_id, recognition_id FROM users";

/// Find a user by username, or by email when one is supplied
pub async fn find_by_username(
    pool: &SqlitePool,
    username: &str,
    email: Option<&str>,
) -> Result<Option<User>> {
    let row = match email {
        Some(email) => {
            sqlx::query(&format!("{} WHERE username = ? OR email = ?", USER_COLUMNS))
                .bind(username)
                .bind(email)
                .fetch_optional(pool)
                .await?
        }
        None => {
            sqlx::query(&format!("{} WHERE username = ?", USER_COLUMNS))
                .bind(username)
                .fetch_optional(pool)
                .await?
        }
    };

    row.as_ref().map(row_to_user).transpose()
}

pub async fn load_user(pool: &SqlitePool, user_id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", USER_COLUMNS))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_user).transpose()
}

/// Find a user by the license-server correlation uuid
pub async fn find_by_uuid(pool: &SqlitePool, uuid: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("{} WHERE uuid = ?", USER_COLUMNS))
        .bind(uuid)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_user).transpose()
}

pub async fn load_role(pool: &SqlitePool, role_id: i64) -> Result<Option<UserRole>> {
    let row = sqlx::query("SELECT id, name FROM user_role WHERE id = ?")
        .bind(role_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| UserRole {
        id: row.get("id"),
        name: row.get("name"),
    }))
}

pub async fn load_tariff(pool: &SqlitePool, tariff_id: i64) -> Result<Option<Tariff>> {
    let row = sqlx::query(
        "SELECT id, created_at, updated_at, active, total, used FROM tariff WHERE id = ?",
    )
    .bind(tariff_id)
    .fetch_optional(pool)
    .await?;

    row.map(|row| {
        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");
        Ok(Tariff {
            id: row.get("id"),
            created_at: super::parse_timestamp(&created_at)?,
            updated_at: super::parse_timestamp(&updated_at)?,
            active: row.get::<i64, _>("active") != 0,
            total: row.get("total"),
            used: row.get("used"),
        })
    })
    .transpose()
}

pub async fn load_recognition_configuration(
    pool: &SqlitePool,
    recognition_id: i64,
) -> Result<Option<RecognitionConfiguration>> {
    let row = sqlx::query(
        "SELECT id, encoding, rate, interim, interval_length, predictions, prediction_criteria \
         FROM recognition_configuration WHERE id = ?",
    )
    .bind(recognition_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| RecognitionConfiguration {
        id: row.get("id"),
        encoding: row.get("encoding"),
        rate: row.get("rate"),
        interim: row.get::<i64, _>("interim") != 0,
        interval_length: row.get("interval_length"),
        predictions: row.get("predictions"),
        prediction_criteria: row.get("prediction_criteria"),
    }))
}

/// Load a user with its role, tariff, and recognition configuration
pub async fn load_user_detail(pool: &SqlitePool, user_id: i64) -> Result<Option<UserDetail>> {
    let Some(user) = load_user(pool, user_id).await? else {
        return Ok(None);
    };

    let role = load_role(pool, user.role_id).await?;
    let tariff = load_tariff(pool, user.tariff_id).await?;
    let recognition = load_recognition_configuration(pool, user.recognition_id).await?;

    Ok(Some(UserDetail {
        user,
        role,
        tariff,
        recognition,
    }))
}

/// Paginated user listing with tariff columns joined in
pub async fn list_users(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<UserSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT u.id, u.created_at, u.username, u.first_name, u.last_name, u.email,
               u.phone, u.api_key, u.audience, u.role_id, u.tariff_id,
               t.active, t.total, t.used
        FROM users u
        LEFT JOIN tariff t ON t.id = u.tariff_id
        ORDER BY u.id ASC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let created_at: String = row.get("created_at");
            Ok(UserSummary {
                id: row.get("id"),
                created_at: super::parse_timestamp(&created_at)?,
                username: row.get("username"),
                first_name: row.get("first_name"),
                last_name: row.get("last_name"),
                email: row.get("email"),
                phone: row.get("phone"),
                api_key: row.get("api_key"),
                audience: row.get("audience"),
                role_id: row.get("role_id"),
                tariff_id: row.get("tariff_id"),
                active: row.get::<Option<i64>, _>("active").unwrap_or(0) != 0,
                total: row.get::<Option<i64>, _>("total").unwrap_or(0),
                used: row.get::<Option<i64>, _>("used").unwrap_or(0),
            })
        })
        .collect()
}

pub async fn count_users(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// All users as dropdown entries
pub async fn list_simple_users(pool: &SqlitePool) -> Result<Vec<SimpleUser>> {
    let rows = sqlx::query("SELECT id, username, first_name, last_name FROM users ORDER BY id ASC")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| SimpleUser {
            id: row.get("id"),
            username: row.get("username"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
        })
        .collect())
}

/// Create an account with its tariff and recognition configuration
pub async fn insert_user(pool: &SqlitePool, new_user: &NewUser) -> Result<i64> {
    let now = Utc::now().to_rfc3339();

    let mut tx = pool.begin().await?;

    let tariff_id = sqlx::query(
        "INSERT INTO tariff (created_at, updated_at, active, total, used) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&now)
    .bind(&now)
    .bind(new_user.tariff.active as i64)
    .bind(new_user.tariff.total)
    .bind(new_user.tariff.used)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let recognition_id = sqlx::query(
        r#"
        INSERT INTO recognition_configuration
            (encoding, rate, interim, interval_length, predictions, prediction_criteria)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new_user.recognition.encoding)
    .bind(new_user.recognition.rate)
    .bind(new_user.recognition.interim as i64)
    .bind(new_user.recognition.interval_length)
    .bind(new_user.recognition.predictions)
    .bind(&new_user.recognition.prediction_criteria)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let user_id = sqlx::query(
        r#"
        INSERT INTO users
            (created_at, updated_at, username, password_hash, password_salt,
             first_name, last_name, email, phone, api_key, uuid, audience,
             role_id, tariff_id, recognition_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&now)
    .bind(&now)
    .bind(&new_user.username)
    .bind(&new_user.password_hash)
    .bind(&new_user.password_salt)
    .bind(&new_user.first_name)
    .bind(&new_user.last_name)
    .bind(&new_user.email)
    .bind(&new_user.phone)
    .bind(&new_user.api_key)
    .bind(&new_user.uuid)
    .bind(&new_user.audience)
    .bind(new_user.role_id)
    .bind(tariff_id)
    .bind(recognition_id)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    tx.commit().await?;

    Ok(user_id)
}

/// Update an account and its tariff and recognition configuration.
///
/// Returns `Ok(None)` when the user does not exist.
pub async fn update_user(
    pool: &SqlitePool,
    user_id: i64,
    update: &UserUpdate,
) -> Result<Option<()>> {
    let Some(user) = load_user(pool, user_id).await? else {
        return Ok(None);
    };

    let now = Utc::now().to_rfc3339();
    let (password_hash, password_salt) = match &update.password {
        Some((hash, salt)) => (hash.clone(), salt.clone()),
        None => (user.password_hash.clone(), user.password_salt.clone()),
    };

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE users
        SET username = ?, password_hash = ?, password_salt = ?,
            first_name = ?, last_name = ?, email = ?, phone = ?,
            api_key = ?, audience = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&update.username)
    .bind(&password_hash)
    .bind(&password_salt)
    .bind(&update.first_name)
    .bind(&update.last_name)
    .bind(&update.email)
    .bind(&update.phone)
    .bind(&update.api_key)
    .bind(&update.audience)
    .bind(&now)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE tariff SET active = ?, total = ?, used = ?, updated_at = ? WHERE id = ?")
        .bind(update.tariff.active as i64)
        .bind(update.tariff.total)
        .bind(update.tariff.used)
        .bind(&now)
        .bind(user.tariff_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        UPDATE recognition_configuration
        SET encoding = ?, rate = ?, interim = ?, interval_length = ?,
            predictions = ?, prediction_criteria = ?
        WHERE id = ?
        "#,
    )
    .bind(&update.recognition.encoding)
    .bind(update.recognition.rate)
    .bind(update.recognition.interim as i64)
    .bind(update.recognition.interval_length)
    .bind(update.recognition.predictions)
    .bind(&update.recognition.prediction_criteria)
    .bind(user.recognition_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Some(()))
}

/// Add licenses to a tariff (license-server metering path)
pub async fn increment_tariff(pool: &SqlitePool, tariff_id: i64, count: i64) -> Result<()> {
    sqlx::query("UPDATE tariff SET total = total + ?, updated_at = ? WHERE id = ?")
        .bind(count)
        .bind(Utc::now().to_rfc3339())
        .bind(tariff_id)
        .execute(pool)
        .await?;

    Ok(())
}

fn row_to_user(row: &SqliteRow) -> Result<User> {
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(User {
        id: row.get("id"),
        created_at: super::parse_timestamp(&created_at)?,
        updated_at: super::parse_timestamp(&updated_at)?,
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        password_salt: row.get("password_salt"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        phone: row.get("phone"),
        api_key: row.get("api_key"),
        uuid: row.get("uuid"),
        audience: row.get("audience"),
        role_id: row.get("role_id"),
        right_id: row.get("right_id"),
        tariff_id: row.get("tariff_id"),
        recognition_id: row.get("recognition_id"),
    })
}
