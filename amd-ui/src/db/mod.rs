//! Query layer for the administrative service
//!
//! Timestamps cross the storage boundary as RFC 3339 text; rows are mapped by
//! hand into the shared model structs.

use amd_common::Result;
use chrono::{DateTime, Utc};

pub mod dashboard;
pub mod recognitions;
pub mod sessions;
pub mod users;

/// Parse an RFC 3339 timestamp read back from storage
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| amd_common::Error::Internal(format!("Failed to parse timestamp: {}", e)))
}
