//! Recognition query and aggregation engine
//!
//! Answers two kinds of requests: a filtered, paginated listing of finalized
//! recognition attempts (scoped globally or to one owning user), and the
//! resolution of a single request's outcome by combining all attempts that
//! share its correlation uuid.
//!
//! Not-found and storage failure stay distinguishable: lookups return
//! `Ok(None)` for a missing or unauthorized row and `Err` only on a query
//! failure, so the HTTP layer can answer 404 and 500 respectively.

use amd_common::models::Recognition;
use amd_common::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

/// Authorization scope of the calling user.
///
/// A `User` scope restricts every query to that user's rows and always wins
/// over a caller-supplied `user_id` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerScope {
    /// Administrative/supervisory caller: no ownership restriction
    Unrestricted,
    /// Non-privileged caller: only rows owned by this user id
    User(i64),
}

/// Optional equality/range constraints for the listing path.
///
/// Absent or empty values impose no constraint; present values are
/// AND-composed. `final = 1` is always applied on top.
#[derive(Debug, Clone, Default)]
pub struct RecognitionFilter {
    pub user_id: Option<i64>,
    pub campaign_id: Option<i64>,
    pub request_uuid: Option<String>,
    pub extension: Option<String>,
    pub prediction: Option<String>,
    /// Closed interval on the creation timestamp
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

/// A single recognition with its request outcome resolved across all related
/// attempts.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedRecognition {
    /// The primary row as stored
    pub recognition: Recognition,
    /// Averaged confidence across non-"ring" related attempts, or the stored
    /// value when no attempt qualifies
    pub confidence: f64,
    /// Prediction of the last final-flagged related attempt, or the stored
    /// value when none is final
    pub prediction: String,
    /// Every attempt sharing the primary's request uuid, unmodified, in
    /// id-ascending order
    pub related: Vec<Recognition>,
}

const SELECT_COLUMNS: &str = "SELECT id, created_at, final, request_uuid, audio_uuid, \
     confidence, prediction, extension, company_id, campaign_id, application_id, user_id \
     FROM recognition";

/// Append the shared predicate to a query.
///
/// Used by both the listing and the count query so the two can never drift
/// apart. `final = 1` is unconditional; everything else applies only when the
/// filter carries a non-empty value. Ownership scoping overrides any
/// caller-supplied user filter.
fn push_predicate(
    builder: &mut QueryBuilder<'_, Sqlite>,
    filter: &RecognitionFilter,
    scope: OwnerScope,
) {
    builder.push(" WHERE final = 1");

    match scope {
        OwnerScope::User(user_id) => {
            builder.push(" AND user_id = ");
            builder.push_bind(user_id);
        }
        OwnerScope::Unrestricted => {
            if let Some(user_id) = filter.user_id {
                builder.push(" AND user_id = ");
                builder.push_bind(user_id);
            }
        }
    }

    if let Some(campaign_id) = filter.campaign_id {
        builder.push(" AND campaign_id = ");
        builder.push_bind(campaign_id);
    }

    if let Some(request_uuid) = non_empty(filter.request_uuid.as_deref()) {
        builder.push(" AND request_uuid = ");
        builder.push_bind(request_uuid.to_string());
    }

    if let Some(extension) = non_empty(filter.extension.as_deref()) {
        builder.push(" AND extension = ");
        builder.push_bind(extension.to_string());
    }

    if let Some(prediction) = non_empty(filter.prediction.as_deref()) {
        builder.push(" AND prediction = ");
        builder.push_bind(prediction.to_string());
    }

    if let Some(from) = &filter.created_from {
        builder.push(" AND created_at >= ");
        builder.push_bind(from.to_rfc3339());
    }

    if let Some(to) = &filter.created_to {
        builder.push(" AND created_at <= ");
        builder.push_bind(to.to_rfc3339());
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// List finalized recognition attempts matching the filter, newest first.
///
/// `page` is `Some((limit, offset))` for one page or `None` for the full
/// result set (the export path). The returned total count is computed by an
/// independent count query over the identical predicate, so it stays correct
/// when the offset lands on a partial last page.
pub async fn list_finalized(
    pool: &SqlitePool,
    filter: &RecognitionFilter,
    scope: OwnerScope,
    page: Option<(i64, i64)>,
) -> Result<(Vec<Recognition>, i64)> {
    let total_count = count_finalized(pool, filter, scope).await?;

    let mut builder = QueryBuilder::new(SELECT_COLUMNS);
    push_predicate(&mut builder, filter, scope);
    builder.push(" ORDER BY id DESC");

    if let Some((limit, offset)) = page {
        builder.push(" LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);
    }

    let rows = builder.build().fetch_all(pool).await?;
    let recognitions = rows
        .iter()
        .map(row_to_recognition)
        .collect::<Result<Vec<_>>>()?;

    Ok((recognitions, total_count))
}

/// Count finalized recognition attempts matching the filter.
///
/// Shares its predicate with [`list_finalized`]; the count always equals the
/// length of the corresponding unpaginated listing.
pub async fn count_finalized(
    pool: &SqlitePool,
    filter: &RecognitionFilter,
    scope: OwnerScope,
) -> Result<i64> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM recognition");
    push_predicate(&mut builder, filter, scope);

    let count: i64 = builder.build_query_scalar().fetch_one(pool).await?;
    Ok(count)
}

/// Load one recognition by id under the caller's scope.
///
/// A `User` scope fails closed: a row owned by another user yields `Ok(None)`,
/// indistinguishable from a row that does not exist.
pub async fn load_by_id(
    pool: &SqlitePool,
    recognition_id: i64,
    scope: OwnerScope,
) -> Result<Option<Recognition>> {
    let row = match scope {
        OwnerScope::Unrestricted => {
            sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
                .bind(recognition_id)
                .fetch_optional(pool)
                .await?
        }
        OwnerScope::User(user_id) => {
            sqlx::query(&format!("{} WHERE id = ? AND user_id = ?", SELECT_COLUMNS))
                .bind(recognition_id)
                .bind(user_id)
                .fetch_optional(pool)
                .await?
        }
    };

    row.as_ref().map(row_to_recognition).transpose()
}

/// Load every attempt sharing a request uuid, in id-ascending order.
///
/// The explicit ordering defines the iteration order of the aggregation rules
/// below ("last final wins" means the latest-inserted final attempt).
pub async fn load_related(pool: &SqlitePool, request_uuid: &str) -> Result<Vec<Recognition>> {
    let rows = sqlx::query(&format!(
        "{} WHERE request_uuid = ? ORDER BY id ASC",
        SELECT_COLUMNS
    ))
    .bind(request_uuid)
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_recognition).collect()
}

/// Resolve a single request's outcome across all attempts sharing its
/// correlation uuid.
///
/// Returns `Ok(None)` when the row is missing or not visible under the
/// caller's scope.
pub async fn resolve(
    pool: &SqlitePool,
    recognition_id: i64,
    scope: OwnerScope,
) -> Result<Option<ResolvedRecognition>> {
    let Some(recognition) = load_by_id(pool, recognition_id, scope).await? else {
        return Ok(None);
    };

    let related = match recognition.request_uuid.as_deref() {
        Some(request_uuid) => load_related(pool, request_uuid).await?,
        // No correlation uuid: nothing to aggregate against
        None => Vec::new(),
    };

    let (confidence, prediction) = resolve_outcome(&recognition, &related);

    Ok(Some(ResolvedRecognition {
        recognition,
        confidence,
        prediction,
        related,
    }))
}

/// Combine the related attempts into a resolved (confidence, prediction) pair.
///
/// One pass over the attempts in load order:
/// - confidence: average over attempts whose prediction is not "ring"; when
///   every attempt is "ring" (count zero) the primary's stored confidence is
///   kept, which also sidesteps the division. The primary is itself among the
///   related attempts and is excluded by the same rule when it is a "ring".
/// - prediction: the last final-flagged attempt wins; with no final attempt
///   the primary's stored prediction is kept.
fn resolve_outcome(primary: &Recognition, related: &[Recognition]) -> (f64, String) {
    let mut sum: i64 = 0;
    let mut counted: i64 = 0;
    let mut final_prediction: Option<&str> = None;

    for attempt in related {
        if attempt.prediction != "ring" {
            sum += attempt.confidence;
            counted += 1;
        }
        if attempt.is_final {
            final_prediction = Some(attempt.prediction.as_str());
        }
    }

    let confidence = if !related.is_empty() && counted != 0 {
        sum as f64 / counted as f64
    } else {
        primary.confidence as f64
    };

    let prediction = final_prediction
        .map(str::to_string)
        .unwrap_or_else(|| primary.prediction.clone());

    (confidence, prediction)
}

fn row_to_recognition(row: &SqliteRow) -> Result<Recognition> {
    let created_at: String = row.get("created_at");

    Ok(Recognition {
        id: row.get("id"),
        created_at: super::parse_timestamp(&created_at)?,
        is_final: row.get::<i64, _>("final") != 0,
        request_uuid: row.get("request_uuid"),
        audio_uuid: row.get("audio_uuid"),
        confidence: row.get("confidence"),
        prediction: row.get("prediction"),
        extension: row.get("extension"),
        company_id: row.get("company_id"),
        campaign_id: row.get("campaign_id"),
        application_id: row.get("application_id"),
        user_id: row.get("user_id"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(id: i64, prediction: &str, confidence: i64, is_final: bool) -> Recognition {
        Recognition {
            id,
            created_at: Utc::now(),
            is_final,
            request_uuid: Some("req-1".to_string()),
            audio_uuid: None,
            confidence,
            prediction: prediction.to_string(),
            extension: None,
            company_id: None,
            campaign_id: None,
            application_id: None,
            user_id: Some(1),
        }
    }

    #[test]
    fn test_ring_attempts_excluded_from_average() {
        let related = vec![
            attempt(1, "ring", 90, false),
            attempt(2, "human", 60, false),
            attempt(3, "human", 80, false),
        ];
        let primary = related[1].clone();

        let (confidence, prediction) = resolve_outcome(&primary, &related);
        assert_eq!(confidence, 70.0);
        // No attempt is final, so the stored prediction is kept
        assert_eq!(prediction, "human");
    }

    #[test]
    fn test_all_ring_keeps_stored_confidence() {
        let related = vec![attempt(1, "ring", 50, false), attempt(2, "ring", 70, false)];
        let primary = related[0].clone();

        let (confidence, _) = resolve_outcome(&primary, &related);
        assert_eq!(confidence, 50.0);
    }

    #[test]
    fn test_last_final_attempt_wins() {
        let related = vec![
            attempt(1, "voicemail", 40, false),
            attempt(2, "human", 60, true),
            attempt(3, "ring", 10, false),
        ];
        let primary = related[0].clone();

        let (_, prediction) = resolve_outcome(&primary, &related);
        assert_eq!(prediction, "human");
    }

    #[test]
    fn test_multiple_finals_latest_wins() {
        let related = vec![
            attempt(1, "voicemail", 40, true),
            attempt(2, "human", 60, true),
        ];
        let primary = related[0].clone();

        let (_, prediction) = resolve_outcome(&primary, &related);
        assert_eq!(prediction, "human");
    }

    #[test]
    fn test_primary_ring_excludes_itself() {
        // The primary is among the related attempts; when it is a "ring" its
        // own confidence stays out of the average like any other ring.
        let related = vec![attempt(1, "ring", 100, false), attempt(2, "human", 40, true)];
        let primary = related[0].clone();

        let (confidence, prediction) = resolve_outcome(&primary, &related);
        assert_eq!(confidence, 40.0);
        assert_eq!(prediction, "human");
    }

    #[test]
    fn test_empty_related_leaves_primary_untouched() {
        let primary = attempt(7, "voicemail", 33, true);

        let (confidence, prediction) = resolve_outcome(&primary, &[]);
        assert_eq!(confidence, 33.0);
        assert_eq!(prediction, "voicemail");
    }

    #[test]
    fn test_resolution_is_pure() {
        let related = vec![
            attempt(1, "ring", 90, false),
            attempt(2, "human", 60, true),
            attempt(3, "voicemail", 80, false),
        ];
        let primary = related[2].clone();

        let first = resolve_outcome(&primary, &related);
        let second = resolve_outcome(&primary, &related);
        assert_eq!(first, second);
    }
}
