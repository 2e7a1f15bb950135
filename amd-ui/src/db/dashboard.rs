//! Dashboard aggregates
//!
//! Counts finalized recognitions for one user across three windows: today,
//! the trailing seven days, and the month window, each split into voicemail
//! and non-voicemail ("human"). A single scan bounded at the first day of the
//! previous month; the bound sits well before the trailing-7-day window, so
//! the week counts span month boundaries. The month window shares that bound
//! and so also starts at the previous month, matching the numbers the
//! operators have always seen.

use amd_common::Result;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

/// Aggregated recognition counts for the dashboard view
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DashboardCounts {
    pub today_total: i64,
    pub today_voicemail: i64,
    pub today_human: i64,
    pub week_total: i64,
    pub week_voicemail: i64,
    pub week_human: i64,
    pub month_total: i64,
    pub month_voicemail: i64,
    pub month_human: i64,
}

/// Load dashboard counts for one user's finalized recognitions
pub async fn load_user_dashboard(pool: &SqlitePool, user_id: i64) -> Result<DashboardCounts> {
    let row = sqlx::query(
        r#"
        SELECT
            SUM(CASE WHEN date(created_at) = date('now') THEN 1 ELSE 0 END) AS today_total,
            SUM(CASE WHEN date(created_at) = date('now') AND prediction = 'voicemail' THEN 1 ELSE 0 END) AS today_voicemail,
            SUM(CASE WHEN date(created_at) = date('now') AND prediction <> 'voicemail' THEN 1 ELSE 0 END) AS today_human,
            SUM(CASE WHEN created_at >= date('now', '-6 days') THEN 1 ELSE 0 END) AS week_total,
            SUM(CASE WHEN created_at >= date('now', '-6 days') AND prediction = 'voicemail' THEN 1 ELSE 0 END) AS week_voicemail,
            SUM(CASE WHEN created_at >= date('now', '-6 days') AND prediction <> 'voicemail' THEN 1 ELSE 0 END) AS week_human,
            SUM(CASE WHEN created_at >= date('now', 'start of month', '-1 month') THEN 1 ELSE 0 END) AS month_total,
            SUM(CASE WHEN created_at >= date('now', 'start of month', '-1 month') AND prediction = 'voicemail' THEN 1 ELSE 0 END) AS month_voicemail,
            SUM(CASE WHEN created_at >= date('now', 'start of month', '-1 month') AND prediction <> 'voicemail' THEN 1 ELSE 0 END) AS month_human
        FROM recognition
        WHERE created_at >= date('now', 'start of month', '-1 month') AND final = 1 AND user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    // SUM over zero rows is NULL; the dashboard shows zeros
    let col = |name: &str| row.get::<Option<i64>, _>(name).unwrap_or(0);

    Ok(DashboardCounts {
        today_total: col("today_total"),
        today_voicemail: col("today_voicemail"),
        today_human: col("today_human"),
        week_total: col("week_total"),
        week_voicemail: col("week_voicemail"),
        week_human: col("week_human"),
        month_total: col("month_total"),
        month_voicemail: col("month_voicemail"),
        month_human: col("month_human"),
    })
}
