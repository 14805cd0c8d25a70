use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category shown only to admins in listings. It has no rank in the
/// ordinal model, so `check_access` treats it like any unknown level.
pub const RESTRICTED_CATEGORY: &str = "restricted";

/// Ordinal document access levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccessLevel {
    Public = 0,
    Investor = 1,
    Board = 2,
    Admin = 3,
}

impl AccessLevel {
    pub fn ordinal(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Public => "public",
            AccessLevel::Investor => "investor",
            AccessLevel::Board => "board",
            AccessLevel::Admin => "admin",
        }
    }

    /// Unknown names (including `restricted`) rank as `Public`.
    pub fn from_str_or_public(s: &str) -> Self {
        match s {
            "investor" => AccessLevel::Investor,
            "board" => AccessLevel::Board,
            "admin" => AccessLevel::Admin,
            _ => AccessLevel::Public,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// One of the access level names or `restricted`, as stored by the CMS.
    pub access_level: String,
    pub file_url: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(title: String, access_level: String, file_url: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            description: None,
            access_level,
            file_url,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub access_level: String,
    pub file_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(d: Document) -> Self {
        Self {
            id: d.id,
            title: d.title,
            description: d.description,
            access_level: d.access_level,
            file_url: d.file_url,
            created_at: d.created_at,
        }
    }
}
