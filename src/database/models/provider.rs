use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::ids::{id_to_string, references_to_strings, to_iso, to_iso_opt};

pub const COLLECTION: &str = "healthcare_providers";

macro_rules! specialties {
    ($($variant:ident => $label:literal),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Specialty {
            $(#[serde(rename = $label)] $variant,)+
        }

        impl Specialty {
            pub const ALL: &'static [Specialty] = &[$(Specialty::$variant,)+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Specialty::$variant => $label,)+
                }
            }

            /// Stored values outside the list degrade to `Other`
            pub fn from_stored(value: &str) -> Self {
                match value {
                    $($label => Specialty::$variant,)+
                    _ => Specialty::Other,
                }
            }
        }
    };
}

specialties! {
    PrimaryCare => "Primary Care",
    FamilyMedicine => "Family Medicine",
    InternalMedicine => "Internal Medicine",
    Pediatrics => "Pediatrics",
    Cardiology => "Cardiology",
    Dermatology => "Dermatology",
    Endocrinology => "Endocrinology",
    Gastroenterology => "Gastroenterology",
    Neurology => "Neurology",
    Oncology => "Oncology",
    Orthopedics => "Orthopedics",
    Psychiatry => "Psychiatry",
    Radiology => "Radiology",
    Surgery => "Surgery",
    Urology => "Urology",
    Gynecology => "Gynecology",
    Ophthalmology => "Ophthalmology",
    Ent => "ENT (Ear, Nose, Throat)",
    Dentistry => "Dentistry",
    VisionOptometry => "Vision/Optometry",
    MentalHealth => "Mental Health",
    PhysicalTherapy => "Physical Therapy",
    UrgentCare => "Urgent Care",
    EmergencyMedicine => "Emergency Medicine",
    Other => "Other",
}

/// Metadata captured when a provider is added through portal detection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickAddData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    #[serde(default)]
    pub auto_detected: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct ProviderRow {
    pub id: Uuid,
    pub family_id: Uuid,
    pub provider_name: String,
    pub portal_url: String,
    pub specialty: String,
    pub family_member_ids: Vec<Uuid>,
    pub login_username: Option<String>,
    pub notes: Option<String>,
    pub last_used: Option<DateTime<Utc>>,
    pub auto_detected: bool,
    pub quick_add_data: Option<Json<QuickAddData>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
}

/// Client-safe healthcare provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthcareProvider {
    pub id: String,
    pub family_id: String,
    pub provider_name: String,
    pub portal_url: String,
    pub specialty: Specialty,
    pub family_member_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<String>,
    pub auto_detected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_add_data: Option<QuickAddData>,
    pub created_at: String,
    pub updated_at: String,
    pub created_by: String,
}

impl HealthcareProvider {
    pub fn serves(&self, member_id: &str) -> bool {
        self.family_member_ids.iter().any(|id| id == member_id)
    }
}

impl From<ProviderRow> for HealthcareProvider {
    fn from(row: ProviderRow) -> Self {
        Self {
            id: id_to_string(row.id),
            family_id: id_to_string(row.family_id),
            provider_name: row.provider_name,
            portal_url: row.portal_url,
            specialty: Specialty::from_stored(&row.specialty),
            family_member_ids: references_to_strings(&row.family_member_ids),
            login_username: row.login_username,
            notes: row.notes,
            last_used: to_iso_opt(row.last_used),
            auto_detected: row.auto_detected,
            quick_add_data: row.quick_add_data.map(|Json(q)| q),
            created_at: to_iso(row.created_at),
            updated_at: to_iso(row.updated_at),
            created_by: row.created_by,
        }
    }
}

/// Fully validated provider ready for insertion
#[derive(Debug, Clone)]
pub struct NewProvider {
    pub provider_name: String,
    pub portal_url: String,
    pub specialty: Specialty,
    pub family_member_ids: Vec<String>,
    pub login_username: Option<String>,
    pub notes: Option<String>,
    pub auto_detected: bool,
    pub quick_add_data: Option<QuickAddData>,
    pub created_by: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProviderInput {
    #[serde(default)]
    pub provider_name: String,
    #[serde(default)]
    pub portal_url: String,
    pub specialty: Option<Specialty>,
    #[serde(default)]
    pub family_member_ids: Vec<String>,
    pub login_username: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub auto_detected: bool,
    pub quick_add_data: Option<QuickAddData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderUpdateInput {
    pub provider_name: Option<String>,
    pub portal_url: Option<String>,
    pub specialty: Option<Specialty>,
    pub family_member_ids: Option<Vec<String>>,
    pub login_username: Option<String>,
    pub notes: Option<String>,
    pub auto_detected: Option<bool>,
    pub quick_add_data: Option<QuickAddData>,
}

/// Validated change set. For the optional text fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default)]
pub struct ProviderChanges {
    pub provider_name: Option<String>,
    pub portal_url: Option<String>,
    pub specialty: Option<Specialty>,
    pub family_member_ids: Option<Vec<String>>,
    pub login_username: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub auto_detected: Option<bool>,
    pub quick_add_data: Option<QuickAddData>,
}

/// A provider as shown under a member in the grouped view
#[derive(Debug, Clone, Serialize)]
pub struct GroupedProvider {
    #[serde(flatten)]
    pub provider: HealthcareProvider,
    /// Alias of `providerName` kept for older clients
    pub name: String,
}

impl From<HealthcareProvider> for GroupedProvider {
    fn from(provider: HealthcareProvider) -> Self {
        let name = provider.provider_name.clone();
        Self { provider, name }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyGroup {
    pub family_member: super::FamilyMember,
    pub providers: Vec<GroupedProvider>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn specialty_labels_match_wire_format() {
        assert_eq!(Specialty::ALL.len(), 25);
        assert_eq!(serde_json::to_value(Specialty::Ent).unwrap(), json!("ENT (Ear, Nose, Throat)"));
        let parsed: Specialty = serde_json::from_value(json!("Vision/Optometry")).unwrap();
        assert_eq!(parsed, Specialty::VisionOptometry);
        assert_eq!(Specialty::from_stored("Podiatry"), Specialty::Other);
        for specialty in Specialty::ALL {
            assert_eq!(Specialty::from_stored(specialty.as_str()), *specialty);
        }
    }

    #[test]
    fn grouped_provider_carries_name_alias() {
        let provider = HealthcareProvider {
            id: "p1".into(),
            family_id: "f1".into(),
            provider_name: "City Dental".into(),
            portal_url: "https://citydental.example".into(),
            specialty: Specialty::Dentistry,
            family_member_ids: vec!["m1".into()],
            login_username: None,
            notes: None,
            last_used: None,
            auto_detected: false,
            quick_add_data: None,
            created_at: "2025-01-01T00:00:00.000Z".into(),
            updated_at: "2025-01-01T00:00:00.000Z".into(),
            created_by: "u1".into(),
        };
        assert!(provider.serves("m1"));
        let value = serde_json::to_value(GroupedProvider::from(provider)).unwrap();
        assert_eq!(value["name"], "City Dental");
        assert_eq!(value["providerName"], "City Dental");
    }
}
