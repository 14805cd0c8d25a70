//! Dataroom accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::AccessLevel;

/// Role a user holds in the dataroom.
///
/// Missing or unrecognized values read from storage resolve to `Public`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataroomRole {
    #[default]
    Public,
    Investor,
    Board,
    Admin,
}

impl DataroomRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataroomRole::Public => "public",
            DataroomRole::Investor => "investor",
            DataroomRole::Board => "board",
            DataroomRole::Admin => "admin",
        }
    }

    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "investor" => DataroomRole::Investor,
            "board" => DataroomRole::Board,
            "admin" => DataroomRole::Admin,
            _ => DataroomRole::Public,
        }
    }

    /// The access level this role grants in the ordinal model.
    pub fn access_level(&self) -> AccessLevel {
        match self {
            DataroomRole::Public => AccessLevel::Public,
            DataroomRole::Investor => AccessLevel::Investor,
            DataroomRole::Board => AccessLevel::Board,
            DataroomRole::Admin => AccessLevel::Admin,
        }
    }
}

impl<'de> Deserialize<'de> for DataroomRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .as_deref()
            .map(DataroomRole::from_str_or_default)
            .unwrap_or_default())
    }
}

/// Where an account's credential lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    /// Managed in the CMS with a local password.
    #[default]
    Local,
    /// Managed by the external identity provider; no local password exists.
    External,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub dataroom_role: DataroomRole,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub auth_provider: AuthProvider,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, name: String, dataroom_role: DataroomRole) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            name,
            dataroom_role,
            company: None,
            auth_provider: AuthProvider::Local,
            created_at: Utc::now(),
        }
    }

    /// Account provisioned on first login through the identity provider.
    pub fn external_admin(email: String, name: Option<String>) -> Self {
        let name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email.clone());
        Self {
            auth_provider: AuthProvider::External,
            ..Self::new(email, name, DataroomRole::Admin)
        }
    }

    pub fn is_externally_managed(&self) -> bool {
        self.auth_provider == AuthProvider::External
    }
}
