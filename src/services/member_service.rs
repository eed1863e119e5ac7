use std::sync::Arc;

use tracing::info;

use super::error::{ServiceError, ServiceResult};
use super::identity::FamilyContext;
use crate::database::models::{
    CreateFamilyMemberInput, FamilyMember, FamilyMemberUpdate, NewFamilyMember, FAMILY_COLORS,
};
use crate::database::{FamilyStore, StoreError};

pub const MEMBER_NAME_MAX_LENGTH: usize = 50;
const MEMBER_NOT_FOUND: &str = "Family member not found";

pub struct MemberService {
    store: Arc<dyn FamilyStore>,
}

impl MemberService {
    pub fn new(store: Arc<dyn FamilyStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, ctx: &FamilyContext) -> ServiceResult<Vec<FamilyMember>> {
        Ok(self.store.list_members(ctx.family_id()).await?)
    }

    /// The member linked to the caller's account, preferring the one flagged default
    pub async fn my_member(&self, ctx: &FamilyContext) -> ServiceResult<Option<FamilyMember>> {
        Ok(self.store.member_by_user(ctx.family_id(), ctx.user_id()).await?)
    }

    /// Same lookup as `my_member`: the store already prefers the default
    /// among the caller's linked members
    pub async fn default_member(&self, ctx: &FamilyContext) -> ServiceResult<Option<FamilyMember>> {
        self.my_member(ctx).await
    }

    pub async fn available_color(&self, ctx: &FamilyContext) -> ServiceResult<String> {
        let members = self.store.list_members(ctx.family_id()).await?;
        Ok(pick_available_color(&members).to_string())
    }

    pub async fn create(&self, ctx: &FamilyContext, input: CreateFamilyMemberInput) -> ServiceResult<FamilyMember> {
        let name = validate_member_name(&input.name)?;
        let relationship = input
            .relationship
            .ok_or_else(|| ServiceError::validation("Relationship is required"))?;
        let color = match input.color {
            Some(color) => validate_color(&color)?,
            None => self.available_color(ctx).await?,
        };

        let member = self
            .store
            .insert_member(
                ctx.family_id(),
                NewFamilyMember {
                    user_id: None,
                    name,
                    relationship,
                    color,
                    is_default: input.is_default,
                    preferences: input.preferences,
                    metadata: input.metadata,
                    module_permissions: input.module_permissions,
                    created_by: ctx.user_id().to_string(),
                },
            )
            .await?;
        info!("Created member {} in family {}", member.id, ctx.family_id());
        Ok(member)
    }

    pub async fn update(
        &self,
        ctx: &FamilyContext,
        member_id: &str,
        update: FamilyMemberUpdate,
    ) -> ServiceResult<FamilyMember> {
        let update = FamilyMemberUpdate {
            name: match update.name.as_deref() {
                Some(name) if name.trim().is_empty() => {
                    return Err(ServiceError::validation("Name cannot be empty"))
                }
                Some(name) => Some(validate_member_name(name)?),
                None => None,
            },
            color: update.color.as_deref().map(validate_color).transpose()?,
            ..update
        };

        self.store
            .update_member(ctx.family_id(), member_id, &update)
            .await?
            .ok_or_else(|| ServiceError::not_found(MEMBER_NOT_FOUND))
    }

    /// Hard delete. Members backed by an account must leave instead, and a
    /// member cannot be removed while a provider would be left without anyone.
    pub async fn delete(&self, ctx: &FamilyContext, member_id: &str) -> ServiceResult<()> {
        let member = self
            .store
            .member_by_id(ctx.family_id(), member_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(MEMBER_NOT_FOUND))?;

        if member.has_account() {
            return Err(ServiceError::MemberLinkedToAccount);
        }

        match self.store.delete_member(ctx.family_id(), &member.id).await {
            Ok(true) => {}
            Ok(false) => return Err(ServiceError::not_found(MEMBER_NOT_FOUND)),
            Err(StoreError::SoleProviderMember(provider_name)) => {
                return Err(ServiceError::conflict(format!(
                    "{} is the only family member for {}. Reassign or delete the provider first.",
                    member.name, provider_name
                )));
            }
            Err(err) => return Err(err.into()),
        }
        info!("Deleted member {} from family {}", member.id, ctx.family_id());
        Ok(())
    }

    /// Make `member_id` the caller's default. Only members linked to the
    /// caller qualify.
    pub async fn set_default(&self, ctx: &FamilyContext, member_id: &str) -> ServiceResult<FamilyMember> {
        let member = self
            .store
            .member_by_id(ctx.family_id(), member_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(MEMBER_NOT_FOUND))?;

        if member.user_id.as_deref() != Some(ctx.user_id()) {
            return Err(ServiceError::forbidden(
                "You can only set your own family members as default",
            ));
        }

        if !self
            .store
            .set_default_member(ctx.family_id(), &member.id, ctx.user_id())
            .await?
        {
            return Err(ServiceError::not_found(MEMBER_NOT_FOUND));
        }

        self.store
            .member_by_id(ctx.family_id(), &member.id)
            .await?
            .ok_or_else(|| ServiceError::not_found(MEMBER_NOT_FOUND))
    }
}

/// First palette colour no member uses yet, else the first palette colour
pub fn pick_available_color(members: &[FamilyMember]) -> &'static str {
    FAMILY_COLORS
        .iter()
        .find(|color| !members.iter().any(|m| m.color.eq_ignore_ascii_case(color)))
        .copied()
        .unwrap_or(FAMILY_COLORS[0])
}

pub fn validate_member_name(name: &str) -> ServiceResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::validation("Name is required"));
    }
    if name.chars().count() > MEMBER_NAME_MAX_LENGTH {
        return Err(ServiceError::validation(format!(
            "Name must be less than {} characters",
            MEMBER_NAME_MAX_LENGTH
        )));
    }
    Ok(name.to_string())
}

/// Colours are `#rrggbb`, stored lowercase
pub fn validate_color(color: &str) -> ServiceResult<String> {
    let color = color.trim();
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(ServiceError::validation("Please select a valid color"));
    }
    Ok(color.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthUser;
    use crate::config::AppConfig;
    use crate::database::models::{NewProvider, Relationship, Specialty};
    use crate::services::family_service::FamilyService;
    use crate::services::identity::require_auth_with_family;
    use crate::testing::MemoryStore;
    use rstest::rstest;

    fn user(id: &str) -> AuthUser {
        AuthUser { id: id.into(), name: None, email: None }
    }

    fn input(name: &str) -> CreateFamilyMemberInput {
        CreateFamilyMemberInput {
            name: name.into(),
            relationship: Some(Relationship::Child),
            color: None,
            is_default: false,
            preferences: None,
            metadata: None,
            module_permissions: None,
        }
    }

    async fn family_of(store: &Arc<MemoryStore>, user_id: &str) -> FamilyContext {
        FamilyService::new(store.clone(), AppConfig::development().family)
            .create_family(&user(user_id), "The Smiths")
            .await
            .unwrap();
        require_auth_with_family(store.as_ref(), &user(user_id)).await.unwrap()
    }

    #[rstest]
    #[case("#3B82F6", Some("#3b82f6"))]
    #[case("#abc", None)]
    #[case("3b82f6", None)]
    #[case("#zzzzzz", None)]
    fn color_validation(#[case] color: &str, #[case] expected: Option<&str>) {
        assert_eq!(validate_color(color).ok().as_deref(), expected);
    }

    #[rstest]
    #[case("", false)]
    #[case("   ", false)]
    #[case("Emma", true)]
    #[case(&"x".repeat(51), false)]
    fn name_validation(#[case] name: &str, #[case] ok: bool) {
        assert_eq!(validate_member_name(name).is_ok(), ok);
    }

    #[tokio::test]
    async fn new_members_take_the_next_free_color() {
        let store = Arc::new(MemoryStore::new());
        let ctx = family_of(&store, "u1").await;
        let members = MemberService::new(store.clone());

        let emma = members.create(&ctx, input("Emma")).await.unwrap();
        assert_eq!(emma.color, FAMILY_COLORS[1]);
        assert!(emma.user_id.is_none());
        assert_eq!(members.available_color(&ctx).await.unwrap(), FAMILY_COLORS[2]);
    }

    #[tokio::test]
    async fn relationship_is_required() {
        let store = Arc::new(MemoryStore::new());
        let ctx = family_of(&store, "u1").await;
        let members = MemberService::new(store.clone());
        let err = members
            .create(&ctx, CreateFamilyMemberInput { relationship: None, ..input("Emma") })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref msg) if msg == "Relationship is required"));
    }

    #[tokio::test]
    async fn linked_members_cannot_be_deleted() {
        let store = Arc::new(MemoryStore::new());
        let ctx = family_of(&store, "u1").await;
        let members = MemberService::new(store.clone());

        let me = members.my_member(&ctx).await.unwrap().unwrap();
        let err = members.delete(&ctx, &me.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::MemberLinkedToAccount));

        let emma = members.create(&ctx, input("Emma")).await.unwrap();
        members.delete(&ctx, &emma.id).await.unwrap();
        assert!(store.member_by_id(ctx.family_id(), &emma.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn members_of_other_families_are_not_found() {
        let store = Arc::new(MemoryStore::new());
        let ours = family_of(&store, "u1").await;
        let theirs = family_of(&store, "u9").await;
        let members = MemberService::new(store.clone());
        let emma = members.create(&theirs, input("Emma")).await.unwrap();

        let err = members.delete(&ours, &emma.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        let err = members.update(&ours, &emma.id, FamilyMemberUpdate::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn sole_provider_member_is_protected_and_references_are_cleaned() {
        let store = Arc::new(MemoryStore::new());
        let ctx = family_of(&store, "u1").await;
        let members = MemberService::new(store.clone());
        let emma = members.create(&ctx, input("Emma")).await.unwrap();
        let noah = members.create(&ctx, input("Noah")).await.unwrap();

        let provider = |name: &str, ids: Vec<String>| NewProvider {
            provider_name: name.into(),
            portal_url: "https://mychart.example.org".into(),
            specialty: Specialty::Pediatrics,
            family_member_ids: ids,
            login_username: None,
            notes: None,
            auto_detected: false,
            quick_add_data: None,
            created_by: "u1".into(),
        };
        store
            .insert_provider(ctx.family_id(), provider("Solo", vec![emma.id.clone()]))
            .await
            .unwrap();
        let shared = store
            .insert_provider(ctx.family_id(), provider("Shared", vec![emma.id.clone(), noah.id.clone()]))
            .await
            .unwrap();

        let err = members.delete(&ctx, &emma.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(ref msg)
            if msg == "Emma is the only family member for Solo. Reassign or delete the provider first."));

        let err = store.delete_member(ctx.family_id(), &emma.id).await.unwrap_err();
        assert!(matches!(err, StoreError::SoleProviderMember(ref name) if name == "Solo"));
        assert!(store.member_by_id(ctx.family_id(), &emma.id).await.unwrap().is_some());

        members.delete(&ctx, &noah.id).await.unwrap();
        let shared = store.provider_by_id(ctx.family_id(), &shared.id).await.unwrap().unwrap();
        assert_eq!(shared.family_member_ids, vec![emma.id.clone()]);
    }

    #[tokio::test]
    async fn default_member_is_exclusive_per_user() {
        let store = Arc::new(MemoryStore::new());
        let ctx = family_of(&store, "u1").await;
        let members = MemberService::new(store.clone());
        let me = members.my_member(&ctx).await.unwrap().unwrap();

        let defaulted = members.set_default(&ctx, &me.id).await.unwrap();
        assert!(defaulted.is_default);

        let linked: Vec<_> = members
            .list(&ctx)
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.user_id.as_deref() == Some("u1"))
            .collect();
        assert_eq!(linked.iter().filter(|m| m.is_default).count(), 1);
        assert_eq!(members.default_member(&ctx).await.unwrap().unwrap().id, me.id);
    }

    #[tokio::test]
    async fn default_lookup_prefers_the_flagged_member() {
        let store = Arc::new(MemoryStore::new());
        let ctx = family_of(&store, "u1").await;
        let members = MemberService::new(store.clone());
        assert_eq!(
            members.default_member(&ctx).await.unwrap().map(|m| m.id),
            members.my_member(&ctx).await.unwrap().map(|m| m.id)
        );

        let stranger = FamilyContext { user: user("u5"), family: ctx.family.clone() };
        assert!(members.default_member(&stranger).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn someone_elses_member_cannot_become_my_default() {
        let store = Arc::new(MemoryStore::new());
        let ctx = family_of(&store, "u1").await;
        let members = MemberService::new(store.clone());
        let emma = members.create(&ctx, input("Emma")).await.unwrap();

        let err = members.set_default(&ctx, &emma.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn renaming_to_blank_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let ctx = family_of(&store, "u1").await;
        let members = MemberService::new(store.clone());
        let emma = members.create(&ctx, input("Emma")).await.unwrap();

        let update = FamilyMemberUpdate { name: Some("  ".into()), ..Default::default() };
        let err = members.update(&ctx, &emma.id, update).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref msg) if msg == "Name cannot be empty"));

        let update = FamilyMemberUpdate { name: Some(" Emily ".into()), ..Default::default() };
        assert_eq!(members.update(&ctx, &emma.id, update).await.unwrap().name, "Emily");
    }
}
