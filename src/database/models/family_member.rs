use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::ids::{id_to_string, to_iso};

pub const COLLECTION: &str = "family_members";

/// Palette offered to new members, in preference order
pub const FAMILY_COLORS: [&str; 10] = [
    "#3b82f6", // Blue
    "#ef4444", // Red
    "#22c55e", // Green
    "#f59e0b", // Amber
    "#8b5cf6", // Violet
    "#ec4899", // Pink
    "#06b6d4", // Cyan
    "#84cc16", // Lime
    "#f97316", // Orange
    "#6366f1", // Indigo
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relationship {
    #[serde(rename = "Self")]
    Myself,
    Spouse,
    Partner,
    Child,
    Parent,
    Sibling,
    Grandparent,
    Grandchild,
    Other,
}

impl Relationship {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relationship::Myself => "Self",
            Relationship::Spouse => "Spouse",
            Relationship::Partner => "Partner",
            Relationship::Child => "Child",
            Relationship::Parent => "Parent",
            Relationship::Sibling => "Sibling",
            Relationship::Grandparent => "Grandparent",
            Relationship::Grandchild => "Grandchild",
            Relationship::Other => "Other",
        }
    }

    /// Stored values outside the enum degrade to `Other`
    pub fn from_stored(value: &str) -> Self {
        match value {
            "Self" => Relationship::Myself,
            "Spouse" => Relationship::Spouse,
            "Partner" => Relationship::Partner,
            "Child" => Relationship::Child,
            "Parent" => Relationship::Parent,
            "Sibling" => Relationship::Sibling,
            "Grandparent" => Relationship::Grandparent,
            "Grandchild" => Relationship::Grandchild,
            _ => Relationship::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardLayout {
    Grid,
    List,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthcarePreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_insurance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medications: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuietHours {
    /// "22:00"
    pub start: String,
    /// "08:00"
    pub end: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub reminder_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet_hours: Option<QuietHours>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compact_view: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_layout: Option<DashboardLayout>,
}

/// Cross-module preferences of one member
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilyPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcare: Option<HealthcarePreferences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<NotificationPreferences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<UiPreferences>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthcarePermissions {
    pub can_view: bool,
    pub can_edit: bool,
    pub can_manage_providers: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModulePermissions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcare: Option<HealthcarePermissions>,
}

/// Free-form per-member data owned by modules
pub type MemberMetadata = Map<String, Value>;

/// Stored representation of a family member
#[derive(Debug, Clone, FromRow)]
pub struct FamilyMemberRow {
    pub id: Uuid,
    pub family_id: Uuid,
    pub user_id: Option<String>,
    pub name: String,
    pub relationship: String,
    pub color: String,
    pub is_default: bool,
    pub preferences: Option<Json<FamilyPreferences>>,
    pub metadata: Option<Json<MemberMetadata>>,
    pub module_permissions: Option<Json<ModulePermissions>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
}

/// Client-safe family member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMember {
    pub id: String,
    pub family_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub name: String,
    pub relationship: Relationship,
    pub color: String,
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<FamilyPreferences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MemberMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_permissions: Option<ModulePermissions>,
    pub created_at: String,
    pub updated_at: String,
    pub created_by: String,
}

impl FamilyMember {
    /// Members backed by an authenticated account
    pub fn has_account(&self) -> bool {
        self.user_id.is_some()
    }
}

impl From<FamilyMemberRow> for FamilyMember {
    fn from(row: FamilyMemberRow) -> Self {
        Self {
            id: id_to_string(row.id),
            family_id: id_to_string(row.family_id),
            user_id: row.user_id,
            name: row.name,
            relationship: Relationship::from_stored(&row.relationship),
            color: row.color,
            is_default: row.is_default,
            preferences: row.preferences.map(|Json(p)| p),
            metadata: row.metadata.map(|Json(m)| m),
            module_permissions: row.module_permissions.map(|Json(p)| p),
            created_at: to_iso(row.created_at),
            updated_at: to_iso(row.updated_at),
            created_by: row.created_by,
        }
    }
}

/// Fully validated member ready for insertion
#[derive(Debug, Clone)]
pub struct NewFamilyMember {
    pub user_id: Option<String>,
    pub name: String,
    pub relationship: Relationship,
    pub color: String,
    pub is_default: bool,
    pub preferences: Option<FamilyPreferences>,
    pub metadata: Option<MemberMetadata>,
    pub module_permissions: Option<ModulePermissions>,
    pub created_by: String,
}

/// Create payload accepted from clients. Account links are never client-supplied.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFamilyMemberInput {
    #[serde(default)]
    pub name: String,
    pub relationship: Option<Relationship>,
    pub color: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    pub preferences: Option<FamilyPreferences>,
    pub metadata: Option<MemberMetadata>,
    pub module_permissions: Option<ModulePermissions>,
}

/// Partial update. The default flag only changes through the set-default action.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMemberUpdate {
    pub name: Option<String>,
    pub relationship: Option<Relationship>,
    pub color: Option<String>,
    pub preferences: Option<FamilyPreferences>,
    pub metadata: Option<MemberMetadata>,
    pub module_permissions: Option<ModulePermissions>,
}
