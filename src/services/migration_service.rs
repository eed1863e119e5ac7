use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use super::error::{ServiceError, ServiceResult};
use super::family_service::{default_family_name, self_member_for, FamilyService};
use super::identity::resolve_family;
use super::member_service::{validate_color, validate_member_name};
use super::provider_service::{validate_notes, validate_portal_url, validate_provider_name};
use crate::auth::AuthUser;
use crate::config::FamilyConfig;
use crate::database::models::{
    NewFamilyMember, NewProvider, QuickAddData, Relationship, Specialty, FAMILY_COLORS,
};
use crate::database::FamilyStore;

/// Data a pre-login version of the app kept on the client. Every field is
/// optional since older clients wrote fewer of them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyFamilyData {
    #[serde(default)]
    pub family_members: Vec<LegacyMember>,
    #[serde(default)]
    pub providers: Vec<LegacyProvider>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyMember {
    pub id: String,
    pub name: String,
    pub relationship: Option<String>,
    pub color: Option<String>,
    pub is_default: bool,
    pub preferences: Option<Value>,
    pub metadata: Option<Value>,
    pub module_permissions: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyProvider {
    pub provider_name: String,
    pub portal_url: String,
    pub specialty: Option<String>,
    pub family_member_ids: Vec<String>,
    pub login_username: Option<String>,
    pub notes: Option<String>,
    pub auto_detected: bool,
    pub quick_add_data: Option<QuickAddData>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    pub family_id: String,
    pub member_count: usize,
    pub provider_count: usize,
}

pub struct MigrationService {
    store: Arc<dyn FamilyStore>,
    families: FamilyService,
}

impl MigrationService {
    pub fn new(store: Arc<dyn FamilyStore>, settings: FamilyConfig) -> Self {
        let families = FamilyService::new(store.clone(), settings);
        Self { store, families }
    }

    /// True while the principal has no family. Whether there is local data
    /// worth migrating is for the client to decide.
    pub async fn check_migration_needed(&self, user: &AuthUser) -> ServiceResult<bool> {
        Ok(resolve_family(self.store.as_ref(), user).await?.is_none())
    }

    /// Create the principal's family and copy the legacy records into it.
    ///
    /// The family and the principal's link are written together. Members and
    /// providers are then copied one at a time; a record that fails is logged
    /// and skipped, and the counts report only what was stored. Provider
    /// references are remapped to the new member ids, and a provider left
    /// without any member is not created.
    pub async fn migrate_family_data(&self, user: &AuthUser, data: LegacyFamilyData) -> ServiceResult<MigrationResult> {
        if resolve_family(self.store.as_ref(), user).await?.is_some() {
            return Err(ServiceError::conflict("User already has a family. Migration not needed."));
        }

        let (family, _) = self
            .families
            .create_family_with(user, default_family_name(user), None)
            .await?;
        info!(
            "Migrating {} members and {} providers into family {}",
            data.family_members.len(),
            data.providers.len(),
            family.id
        );

        let mut id_map: HashMap<String, String> = HashMap::new();
        let mut member_count = 0;
        let mut self_linked = false;
        for (index, legacy) in data.family_members.into_iter().enumerate() {
            let name = legacy.name.clone();
            let Some(member) = legacy_member(user, &legacy, index, &mut self_linked) else {
                warn!("Skipping legacy family member {:?}: invalid record", name);
                continue;
            };
            match self.store.insert_member(&family.id, member).await {
                Ok(created) => {
                    member_count += 1;
                    let legacy_id = legacy.id.trim();
                    if legacy_id.is_empty() {
                        warn!("Legacy family member {} has no id; providers cannot reference it", name);
                    } else if id_map.contains_key(legacy_id) {
                        warn!("Duplicate legacy member id {:?}; references keep the first match", legacy_id);
                    } else {
                        id_map.insert(legacy_id.to_string(), created.id);
                    }
                }
                Err(err) => error!("Failed to migrate family member {}: {}", name, err),
            }
        }

        let mut provider_count = 0;
        for legacy in data.providers {
            let member_ids = remap_references(&legacy.family_member_ids, &id_map);
            if member_ids.is_empty() {
                warn!("Skipping provider {} - no valid family members", legacy.provider_name);
                continue;
            }
            let name = legacy.provider_name.clone();
            let Some(provider) = legacy_provider(user, legacy, member_ids) else {
                warn!("Skipping legacy provider {:?}: invalid record", name);
                continue;
            };
            match self.store.insert_provider(&family.id, provider).await {
                Ok(_) => provider_count += 1,
                Err(err) => error!("Failed to migrate provider {}: {}", name, err),
            }
        }

        let result = MigrationResult {
            family_id: family.id,
            member_count,
            provider_count,
        };
        info!(
            "Migrated family {}: {} members, {} providers",
            result.family_id, result.member_count, result.provider_count
        );
        Ok(result)
    }

    /// Fallback when there is nothing to migrate: a default-named family
    /// with the principal's own member. Returns the family id.
    pub async fn create_minimal_family(&self, user: &AuthUser) -> ServiceResult<String> {
        if resolve_family(self.store.as_ref(), user).await?.is_some() {
            return Err(ServiceError::conflict("User already has a family"));
        }
        let (family, _) = self
            .families
            .create_family_with(user, default_family_name(user), Some(self_member_for(user, FAMILY_COLORS[0])))
            .await?;
        Ok(family.id)
    }
}

/// Convert one legacy member. Only the first "Self" entry is linked to the
/// principal; any later one is copied unlinked.
fn legacy_member(
    user: &AuthUser,
    legacy: &LegacyMember,
    index: usize,
    self_linked: &mut bool,
) -> Option<NewFamilyMember> {
    let name = validate_member_name(&legacy.name).ok()?;
    let relationship = legacy
        .relationship
        .as_deref()
        .map(Relationship::from_stored)
        .unwrap_or(Relationship::Other);
    let color = legacy
        .color
        .as_deref()
        .and_then(|c| validate_color(c).ok())
        .unwrap_or_else(|| FAMILY_COLORS[index % FAMILY_COLORS.len()].to_string());

    let user_id = if relationship == Relationship::Myself {
        if *self_linked {
            warn!("Legacy data has more than one Self member; {} left unlinked", name);
            None
        } else {
            *self_linked = true;
            Some(user.id.clone())
        }
    } else {
        None
    };

    Some(NewFamilyMember {
        user_id,
        name,
        relationship,
        color,
        is_default: legacy.is_default,
        preferences: blob(&legacy.preferences),
        metadata: blob(&legacy.metadata),
        module_permissions: blob(&legacy.module_permissions),
        created_by: user.id.clone(),
    })
}

fn legacy_provider(user: &AuthUser, legacy: LegacyProvider, member_ids: Vec<String>) -> Option<NewProvider> {
    Some(NewProvider {
        provider_name: validate_provider_name(&legacy.provider_name).ok()?,
        portal_url: validate_portal_url(&legacy.portal_url).ok()?,
        specialty: legacy
            .specialty
            .as_deref()
            .map(Specialty::from_stored)
            .unwrap_or(Specialty::Other),
        family_member_ids: member_ids,
        login_username: legacy.login_username.filter(|u| !u.trim().is_empty()),
        notes: legacy.notes.as_deref().and_then(|n| validate_notes(n).ok()).flatten(),
        auto_detected: legacy.auto_detected,
        quick_add_data: legacy.quick_add_data,
        created_by: user.id.clone(),
    })
}

/// Legacy ids mapped onto new member ids; unmapped ones are dropped
fn remap_references(ids: &[String], id_map: &HashMap<String, String>) -> Vec<String> {
    let mut remapped: Vec<String> = Vec::new();
    for new_id in ids.iter().filter_map(|id| id_map.get(id)) {
        if !remapped.contains(new_id) {
            remapped.push(new_id.clone());
        }
    }
    remapped
}

/// Structured blobs that no longer parse are dropped
fn blob<T: serde::de::DeserializeOwned>(value: &Option<Value>) -> Option<T> {
    value.clone().and_then(|v| serde_json::from_value(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::models::FamilyMember;
    use crate::testing::MemoryStore;
    use serde_json::json;

    fn user() -> AuthUser {
        AuthUser { id: "u1".into(), name: Some("Ann".into()), email: None }
    }

    fn service(store: &Arc<MemoryStore>) -> MigrationService {
        MigrationService::new(store.clone(), AppConfig::development().family)
    }

    fn legacy_data() -> LegacyFamilyData {
        serde_json::from_value(json!({
            "familyMembers": [
                { "id": "1", "name": "Ann", "relationship": "Self", "color": "#3b82f6", "isDefault": true },
                { "id": "2", "name": "Emma", "relationship": "Child" },
                { "id": "3", "name": "Noah", "relationship": "Child", "color": "#ef4444" }
            ],
            "providers": [
                { "providerName": "Pediatrics West", "portalUrl": "https://mychart.west.example.org",
                  "specialty": "Pediatrics", "familyMemberIds": ["2"] },
                { "providerName": "Family Dental", "portalUrl": "https://dental.example.org",
                  "specialty": "Dentistry", "familyMemberIds": ["1", "2", "3"] },
                { "providerName": "Ghost", "portalUrl": "https://ghost.example.org",
                  "familyMemberIds": ["99"] }
            ]
        }))
        .unwrap()
    }

    async fn members(store: &Arc<MemoryStore>, family_id: &str) -> Vec<FamilyMember> {
        store.list_members(family_id).await.unwrap()
    }

    #[tokio::test]
    async fn migration_remaps_provider_references() {
        let store = Arc::new(MemoryStore::new());
        let result = service(&store).migrate_family_data(&user(), legacy_data()).await.unwrap();
        assert_eq!(result.member_count, 3);
        assert_eq!(result.provider_count, 2);

        let family = store.family_by_id(&result.family_id).await.unwrap().unwrap();
        assert_eq!(family.name, "Ann's Family");
        assert_eq!(store.user_family_id("u1").await.unwrap().as_deref(), Some(family.id.as_str()));

        let members = members(&store, &family.id).await;
        let ann = members.iter().find(|m| m.name == "Ann").unwrap();
        assert_eq!(ann.user_id.as_deref(), Some("u1"));
        assert!(members.iter().filter(|m| m.name != "Ann").all(|m| m.user_id.is_none()));

        let providers = store.list_providers(&family.id).await.unwrap();
        let dental = providers.iter().find(|p| p.provider_name == "Family Dental").unwrap();
        assert_eq!(dental.family_member_ids.len(), 3);
        assert!(dental.family_member_ids.iter().all(|id| members.iter().any(|m| &m.id == id)));
    }

    #[tokio::test]
    async fn second_migration_is_refused() {
        let store = Arc::new(MemoryStore::new());
        let migrations = service(&store);
        migrations.migrate_family_data(&user(), legacy_data()).await.unwrap();
        let members_before = store.member_count();

        let err = migrations.migrate_family_data(&user(), legacy_data()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(ref msg) if msg.starts_with("User already has a family")));
        assert_eq!(store.family_count(), 1);
        assert_eq!(store.member_count(), members_before);
        assert!(!migrations.check_migration_needed(&user()).await.unwrap());
    }

    #[tokio::test]
    async fn failed_member_drops_only_its_own_providers() {
        let store = Arc::new(MemoryStore::new());
        store.fail_member_inserts_named("Emma");

        let result = service(&store).migrate_family_data(&user(), legacy_data()).await.unwrap();
        assert_eq!(result.member_count, 2);
        assert_eq!(result.provider_count, 1);

        let providers = store.list_providers(&result.family_id).await.unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].provider_name, "Family Dental");
        assert_eq!(providers[0].family_member_ids.len(), 2);
    }

    #[tokio::test]
    async fn failed_provider_does_not_abort_the_rest() {
        let store = Arc::new(MemoryStore::new());
        store.fail_provider_inserts_named("Pediatrics West");

        let result = service(&store).migrate_family_data(&user(), legacy_data()).await.unwrap();
        assert_eq!(result.member_count, 3);
        assert_eq!(result.provider_count, 1);
    }

    #[tokio::test]
    async fn only_the_first_self_entry_is_linked() {
        let store = Arc::new(MemoryStore::new());
        let data: LegacyFamilyData = serde_json::from_value(json!({
            "familyMembers": [
                { "id": "a", "name": "Ann", "relationship": "Self" },
                { "id": "b", "name": "Annie", "relationship": "Self" }
            ]
        }))
        .unwrap();

        let result = service(&store).migrate_family_data(&user(), data).await.unwrap();
        assert_eq!(result.member_count, 2);
        let linked = members(&store, &result.family_id)
            .await
            .into_iter()
            .filter(|m| m.user_id.is_some())
            .count();
        assert_eq!(linked, 1);
    }

    #[tokio::test]
    async fn members_without_unique_ids_are_still_counted() {
        let store = Arc::new(MemoryStore::new());
        let data: LegacyFamilyData = serde_json::from_value(json!({
            "familyMembers": [
                { "name": "Ann", "relationship": "Self" },
                { "name": "Emma", "relationship": "Child" },
                { "id": "x", "name": "Noah", "relationship": "Child" },
                { "id": "x", "name": "Liam", "relationship": "Child" }
            ],
            "providers": [
                { "providerName": "Kids Clinic", "portalUrl": "https://kids.example.org",
                  "specialty": "Pediatrics", "familyMemberIds": ["x"] },
                { "providerName": "Nobody", "portalUrl": "https://nobody.example.org",
                  "specialty": "Other", "familyMemberIds": [""] }
            ]
        }))
        .unwrap();

        let result = service(&store).migrate_family_data(&user(), data).await.unwrap();
        let stored = members(&store, &result.family_id).await;
        assert_eq!(stored.len(), 4);
        assert_eq!(result.member_count, 4);
        assert_eq!(result.provider_count, 1);

        let noah = stored.iter().find(|m| m.name == "Noah").unwrap();
        let providers = store.list_providers(&result.family_id).await.unwrap();
        assert_eq!(providers[0].family_member_ids, vec![noah.id.clone()]);
    }

    #[tokio::test]
    async fn minimal_family_has_only_the_principal() {
        let store = Arc::new(MemoryStore::new());
        let migrations = service(&store);
        assert!(migrations.check_migration_needed(&user()).await.unwrap());

        let family_id = migrations.create_minimal_family(&user()).await.unwrap();
        let members = members(&store, &family_id).await;
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].relationship, Relationship::Myself);
        assert_eq!(members[0].name, "Ann");
        assert!(members[0].is_default);

        let err = migrations.create_minimal_family(&user()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(ref msg) if msg == "User already has a family"));
    }
}
