use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;
use url::Url;

use super::error::{ServiceError, ServiceResult, MEMBER_REFERENCES_INVALID};
use super::identity::FamilyContext;
use crate::database::models::{
    CreateProviderInput, FamilyGroup, GroupedProvider, HealthcareProvider, NewProvider,
    ProviderChanges, ProviderUpdateInput,
};
use crate::database::FamilyStore;

pub const PROVIDER_NAME_MAX_LENGTH: usize = 200;
pub const NOTES_MAX_LENGTH: usize = 500;
pub const RECENT_PROVIDERS_MAX: u32 = 50;
const PROVIDER_NOT_FOUND: &str = "Provider not found";

pub struct ProviderService {
    store: Arc<dyn FamilyStore>,
    recent_limit: u32,
}

impl ProviderService {
    pub fn new(store: Arc<dyn FamilyStore>, recent_limit: u32) -> Self {
        Self { store, recent_limit }
    }

    pub async fn list(&self, ctx: &FamilyContext) -> ServiceResult<Vec<HealthcareProvider>> {
        Ok(self.store.list_providers(ctx.family_id()).await?)
    }

    pub async fn for_member(&self, ctx: &FamilyContext, member_id: &str) -> ServiceResult<Vec<HealthcareProvider>> {
        let member = self
            .store
            .member_by_id(ctx.family_id(), member_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Family member not found"))?;
        Ok(self.store.providers_for_member(ctx.family_id(), &member.id).await?)
    }

    /// Every member with the providers that reference them, in roster order.
    /// Members without providers are included with an empty list.
    pub async fn grouped(&self, ctx: &FamilyContext) -> ServiceResult<Vec<FamilyGroup>> {
        let (members, providers) = tokio::try_join!(
            self.store.list_members(ctx.family_id()),
            self.store.list_providers(ctx.family_id()),
        )?;

        Ok(members
            .into_iter()
            .map(|member| {
                let providers = providers
                    .iter()
                    .filter(|p| p.serves(&member.id))
                    .cloned()
                    .map(GroupedProvider::from)
                    .collect();
                FamilyGroup { family_member: member, providers }
            })
            .collect())
    }

    pub async fn recent(&self, ctx: &FamilyContext, limit: Option<u32>) -> ServiceResult<Vec<HealthcareProvider>> {
        let limit = limit.unwrap_or(self.recent_limit).clamp(1, RECENT_PROVIDERS_MAX);
        Ok(self.store.recent_providers(ctx.family_id(), i64::from(limit)).await?)
    }

    pub async fn create(&self, ctx: &FamilyContext, input: CreateProviderInput) -> ServiceResult<HealthcareProvider> {
        let provider_name = validate_provider_name(&input.provider_name)?;
        let portal_url = validate_portal_url(&input.portal_url)?;
        let specialty = input
            .specialty
            .ok_or_else(|| ServiceError::validation("Specialty is required"))?;
        let family_member_ids = self.check_members(ctx, &input.family_member_ids).await?;
        let notes = input.notes.as_deref().map(validate_notes).transpose()?.flatten();

        let provider = self
            .store
            .insert_provider(
                ctx.family_id(),
                NewProvider {
                    provider_name,
                    portal_url,
                    specialty,
                    family_member_ids,
                    login_username: input.login_username.as_deref().and_then(non_blank),
                    notes,
                    auto_detected: input.auto_detected,
                    quick_add_data: input.quick_add_data,
                    created_by: ctx.user_id().to_string(),
                },
            )
            .await?;
        info!("Created provider {} in family {}", provider.id, ctx.family_id());
        Ok(provider)
    }

    pub async fn update(
        &self,
        ctx: &FamilyContext,
        provider_id: &str,
        input: ProviderUpdateInput,
    ) -> ServiceResult<HealthcareProvider> {
        let family_member_ids = match input.family_member_ids {
            Some(ids) => Some(self.check_members(ctx, &ids).await?),
            None => None,
        };
        let changes = ProviderChanges {
            provider_name: input.provider_name.as_deref().map(validate_provider_name).transpose()?,
            portal_url: input.portal_url.as_deref().map(validate_portal_url).transpose()?,
            specialty: input.specialty,
            family_member_ids,
            login_username: input.login_username.as_deref().map(non_blank),
            notes: input.notes.as_deref().map(validate_notes).transpose()?,
            auto_detected: input.auto_detected,
            quick_add_data: input.quick_add_data,
        };

        self.store
            .update_provider(ctx.family_id(), provider_id, changes)
            .await?
            .ok_or_else(|| ServiceError::not_found(PROVIDER_NOT_FOUND))
    }

    pub async fn delete(&self, ctx: &FamilyContext, provider_id: &str) -> ServiceResult<()> {
        if !self.store.delete_provider(ctx.family_id(), provider_id).await? {
            return Err(ServiceError::not_found(PROVIDER_NOT_FOUND));
        }
        info!("Deleted provider {} from family {}", provider_id, ctx.family_id());
        Ok(())
    }

    /// Stamp `lastUsed` so the provider shows up under recent
    pub async fn mark_used(&self, ctx: &FamilyContext, provider_id: &str) -> ServiceResult<HealthcareProvider> {
        self.store
            .mark_provider_used(ctx.family_id(), provider_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(PROVIDER_NOT_FOUND))
    }

    /// Non-empty, de-duplicated, and every id a member of the caller's family
    async fn check_members(&self, ctx: &FamilyContext, ids: &[String]) -> ServiceResult<Vec<String>> {
        if ids.is_empty() {
            return Err(ServiceError::validation("At least one family member is required"));
        }
        let members = self.store.list_members(ctx.family_id()).await?;
        let known: HashSet<&str> = members.iter().map(|m| m.id.as_str()).collect();
        resolve_member_refs(ids, &known, MEMBER_REFERENCES_INVALID)
    }
}

/// Map client-supplied references onto known member ids, keeping first-seen
/// order and dropping duplicates. Any unknown id fails with `message`.
pub(crate) fn resolve_member_refs(ids: &[String], known: &HashSet<&str>, message: &str) -> ServiceResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(ids.len());
    for id in ids {
        let id = id.trim().to_ascii_lowercase();
        if !known.contains(id.as_str()) {
            return Err(ServiceError::validation(message));
        }
        if seen.insert(id.clone()) {
            resolved.push(id);
        }
    }
    Ok(resolved)
}

pub fn validate_provider_name(name: &str) -> ServiceResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::validation("Provider name is required"));
    }
    if name.chars().count() > PROVIDER_NAME_MAX_LENGTH {
        return Err(ServiceError::validation(format!(
            "Name must be less than {} characters",
            PROVIDER_NAME_MAX_LENGTH
        )));
    }
    Ok(name.to_string())
}

pub fn validate_portal_url(portal_url: &str) -> ServiceResult<String> {
    let portal_url = portal_url.trim();
    match Url::parse(portal_url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some() => {
            Ok(portal_url.to_string())
        }
        _ => Err(ServiceError::validation("Please enter a valid URL")),
    }
}

/// Blank notes clear the field
pub fn validate_notes(notes: &str) -> ServiceResult<Option<String>> {
    if notes.chars().count() > NOTES_MAX_LENGTH {
        return Err(ServiceError::validation(format!(
            "Notes must be less than {} characters",
            NOTES_MAX_LENGTH
        )));
    }
    Ok(non_blank(notes))
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthUser;
    use crate::config::AppConfig;
    use crate::database::models::{CreateFamilyMemberInput, Relationship, Specialty};
    use crate::services::family_service::FamilyService;
    use crate::services::identity::require_auth_with_family;
    use crate::services::member_service::MemberService;
    use crate::testing::MemoryStore;
    use rstest::rstest;

    async fn family_of(store: &Arc<MemoryStore>, user_id: &str) -> FamilyContext {
        let user = AuthUser { id: user_id.into(), name: Some("Ann".into()), email: None };
        FamilyService::new(store.clone(), AppConfig::development().family)
            .create_family(&user, "The Smiths")
            .await
            .unwrap();
        require_auth_with_family(store.as_ref(), &user).await.unwrap()
    }

    async fn add_child(store: &Arc<MemoryStore>, ctx: &FamilyContext, name: &str) -> String {
        MemberService::new(store.clone())
            .create(
                ctx,
                CreateFamilyMemberInput {
                    name: name.into(),
                    relationship: Some(Relationship::Child),
                    color: None,
                    is_default: false,
                    preferences: None,
                    metadata: None,
                    module_permissions: None,
                },
            )
            .await
            .unwrap()
            .id
    }

    fn input(name: &str, member_ids: Vec<String>) -> CreateProviderInput {
        CreateProviderInput {
            provider_name: name.into(),
            portal_url: "https://mychart.example.org/login".into(),
            specialty: Some(Specialty::Pediatrics),
            family_member_ids: member_ids,
            login_username: Some("  ".into()),
            notes: None,
            auto_detected: false,
            quick_add_data: None,
        }
    }

    #[rstest]
    #[case("https://mychart.example.org", true)]
    #[case("http://portal.clinic.test/path?q=1", true)]
    #[case("ftp://files.example.org", false)]
    #[case("not a url", false)]
    #[case("", false)]
    fn portal_url_validation(#[case] url: &str, #[case] ok: bool) {
        assert_eq!(validate_portal_url(url).is_ok(), ok);
    }

    #[rstest]
    #[case("", false)]
    #[case("City Pediatrics", true)]
    #[case(&"p".repeat(201), false)]
    fn provider_name_validation(#[case] name: &str, #[case] ok: bool) {
        assert_eq!(validate_provider_name(name).is_ok(), ok);
    }

    #[test]
    fn long_notes_are_rejected() {
        assert!(validate_notes(&"n".repeat(501)).is_err());
        assert_eq!(validate_notes("   ").unwrap(), None);
    }

    #[tokio::test]
    async fn providers_need_members_from_the_same_family() {
        let store = Arc::new(MemoryStore::new());
        let ours = family_of(&store, "u1").await;
        let theirs = family_of(&store, "u2").await;
        let outsider = add_child(&store, &theirs, "Zed").await;
        let providers = ProviderService::new(store.clone(), 5);

        let err = providers.create(&ours, input("Clinic", vec![])).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref msg) if msg == "At least one family member is required"));

        let err = providers.create(&ours, input("Clinic", vec![outsider])).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref msg) if msg == MEMBER_REFERENCES_INVALID));
    }

    #[tokio::test]
    async fn duplicate_member_references_collapse() {
        let store = Arc::new(MemoryStore::new());
        let ctx = family_of(&store, "u1").await;
        let emma = add_child(&store, &ctx, "Emma").await;
        let providers = ProviderService::new(store.clone(), 5);

        let created = providers
            .create(&ctx, input("Clinic", vec![emma.clone(), emma.to_uppercase()]))
            .await
            .unwrap();
        assert_eq!(created.family_member_ids, vec![emma]);
        assert_eq!(created.login_username, None);
        assert_eq!(created.created_by, "u1");
    }

    #[tokio::test]
    async fn grouped_view_lists_every_member() {
        let store = Arc::new(MemoryStore::new());
        let ctx = family_of(&store, "u1").await;
        let emma = add_child(&store, &ctx, "Emma").await;
        let noah = add_child(&store, &ctx, "Noah").await;
        let providers = ProviderService::new(store.clone(), 5);
        providers.create(&ctx, input("Dental", vec![emma.clone(), noah.clone()])).await.unwrap();
        providers.create(&ctx, input("Allergy", vec![emma.clone()])).await.unwrap();

        let groups = providers.grouped(&ctx).await.unwrap();
        assert_eq!(groups.len(), 3);
        let names = |member_id: &str| -> Vec<String> {
            groups
                .iter()
                .find(|g| g.family_member.id == member_id)
                .unwrap()
                .providers
                .iter()
                .map(|p| p.name.clone())
                .collect()
        };
        assert_eq!(names(&emma), vec!["Allergy", "Dental"]);
        assert_eq!(names(&noah), vec!["Dental"]);
        assert!(groups[0].providers.is_empty());
    }

    #[tokio::test]
    async fn recent_only_lists_used_providers() {
        let store = Arc::new(MemoryStore::new());
        let ctx = family_of(&store, "u1").await;
        let emma = add_child(&store, &ctx, "Emma").await;
        let providers = ProviderService::new(store.clone(), 5);
        let first = providers.create(&ctx, input("First", vec![emma.clone()])).await.unwrap();
        providers.create(&ctx, input("Second", vec![emma.clone()])).await.unwrap();

        assert!(providers.recent(&ctx, None).await.unwrap().is_empty());
        let used = providers.mark_used(&ctx, &first.id).await.unwrap();
        assert!(used.last_used.is_some());

        let recent = providers.recent(&ctx, Some(500)).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, first.id);
    }

    #[tokio::test]
    async fn update_clears_blank_notes_and_rejects_empty_members() {
        let store = Arc::new(MemoryStore::new());
        let ctx = family_of(&store, "u1").await;
        let emma = add_child(&store, &ctx, "Emma").await;
        let providers = ProviderService::new(store.clone(), 5);
        let created = providers
            .create(&ctx, CreateProviderInput { notes: Some("Parking at rear".into()), ..input("Clinic", vec![emma]) })
            .await
            .unwrap();
        assert_eq!(created.notes.as_deref(), Some("Parking at rear"));

        let updated = providers
            .update(&ctx, &created.id, ProviderUpdateInput { notes: Some(String::new()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.notes, None);

        let err = providers
            .update(&ctx, &created.id, ProviderUpdateInput { family_member_ids: Some(vec![]), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn other_families_providers_are_not_found() {
        let store = Arc::new(MemoryStore::new());
        let ours = family_of(&store, "u1").await;
        let theirs = family_of(&store, "u2").await;
        let zed = add_child(&store, &theirs, "Zed").await;
        let providers = ProviderService::new(store.clone(), 5);
        let foreign = providers.create(&theirs, input("Clinic", vec![zed])).await.unwrap();

        assert!(matches!(providers.delete(&ours, &foreign.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(providers.mark_used(&ours, &foreign.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(providers.delete(&ours, "not-an-id").await, Err(ServiceError::NotFound(_))));
    }
}
