use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::ids::{id_to_string, to_iso};

pub const COLLECTION: &str = "families";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

/// Stored representation of a family
#[derive(Debug, Clone, FromRow)]
pub struct FamilyRow {
    pub id: Uuid,
    pub name: String,
    pub invite_code: String,
    pub owner_id: String,
    pub settings: Option<Json<FamilySettings>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client-safe family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Family {
    pub id: String,
    pub name: String,
    pub invite_code: String,
    pub owner_id: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<FamilySettings>,
}

impl From<FamilyRow> for Family {
    fn from(row: FamilyRow) -> Self {
        Self {
            id: id_to_string(row.id),
            name: row.name,
            invite_code: row.invite_code,
            owner_id: row.owner_id,
            created_at: to_iso(row.created_at),
            updated_at: to_iso(row.updated_at),
            settings: row.settings.map(|Json(settings)| settings),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewFamily {
    pub name: String,
    pub invite_code: String,
    pub owner_id: String,
}

/// Owner-editable fields
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyUpdate {
    pub name: Option<String>,
    pub settings: Option<FamilySettings>,
}

impl FamilyUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.settings.is_none()
    }
}
