//! Domain model structs shared across the AMD admin crates
//!
//! These mirror the storage schema created in [`crate::db::init`]. Rows are
//! mapped by hand in the query layer; timestamps are RFC 3339 text at the
//! storage boundary and `DateTime<Utc>` in memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One scoring event for a single phone call.
///
/// Multiple rows may share a `request_uuid` (the call is re-scored as more
/// audio arrives); zero or more of them may carry `final = true`. Rows are
/// written by the external recognizer and never mutated here.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recognition {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    /// Conclusive scoring pass for the call
    #[serde(rename = "final")]
    pub is_final: bool,
    /// Correlates all attempts belonging to the same call
    pub request_uuid: Option<String>,
    pub audio_uuid: Option<String>,
    /// Scale defined by the upstream recognizer, no enforced bounds
    pub confidence: i64,
    /// Free-form label: "human", "voicemail", "ring", "not_predicted", ...
    pub prediction: String,
    pub extension: Option<String>,
    pub company_id: Option<i64>,
    pub campaign_id: Option<i64>,
    pub application_id: Option<i64>,
    pub user_id: Option<i64>,
}

/// Account record. Credential material is never serialized.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub password_salt: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub api_key: Option<String>,
    /// License-server correlation id
    pub uuid: Option<String>,
    pub audience: Option<String>,
    pub role_id: i64,
    pub right_id: Option<i64>,
    pub tariff_id: i64,
    pub recognition_id: i64,
}

/// Per-user quota/licensing record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tariff {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub active: bool,
    pub total: i64,
    pub used: i64,
}

/// Per-user recognizer parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionConfiguration {
    pub id: i64,
    pub encoding: String,
    pub rate: i64,
    pub interim: bool,
    pub interval_length: f64,
    pub predictions: i64,
    /// JSON text, opaque to this service
    pub prediction_criteria: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRole {
    pub id: i64,
    pub name: String,
}

/// Named permission set assigned to users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rights {
    pub id: i64,
    pub name: String,
    /// Permission ids, stored as a JSON array
    pub permissions: Vec<i64>,
}

/// Role names seeded at startup
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_GUEST: &str = "guest";

/// Seeded role ids (insertion order in [`crate::db::init`])
pub const ROLE_ADMIN_ID: i64 = 1;
pub const ROLE_GUEST_ID: i64 = 2;

/// Individual permissions grantable through a rights row.
///
/// Administrators implicitly hold every permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    TabUsers,
    TabUsersRights,
    UsersEdit,
    UsersCreate,
    TabRecognitions,
    RecognitionsExport,
    TabProfile,
}

impl Permission {
    /// Stable numeric id used in `rights.permissions`
    pub fn id(self) -> i64 {
        match self {
            Permission::TabUsers => 1,
            Permission::TabUsersRights => 2,
            Permission::UsersEdit => 3,
            Permission::UsersCreate => 4,
            Permission::TabRecognitions => 6,
            Permission::RecognitionsExport => 7,
            Permission::TabProfile => 8,
        }
    }

    pub fn from_id(id: i64) -> Option<Permission> {
        match id {
            1 => Some(Permission::TabUsers),
            2 => Some(Permission::TabUsersRights),
            3 => Some(Permission::UsersEdit),
            4 => Some(Permission::UsersCreate),
            6 => Some(Permission::TabRecognitions),
            7 => Some(Permission::RecognitionsExport),
            8 => Some(Permission::TabProfile),
            _ => None,
        }
    }

    pub fn all() -> [Permission; 7] {
        [
            Permission::TabUsers,
            Permission::TabUsersRights,
            Permission::UsersEdit,
            Permission::UsersCreate,
            Permission::TabRecognitions,
            Permission::RecognitionsExport,
            Permission::TabProfile,
        ]
    }
}
