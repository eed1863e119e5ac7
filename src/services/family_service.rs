use std::sync::Arc;

use tracing::{info, warn};

use super::error::{ServiceError, ServiceResult, ALREADY_IN_FAMILY, ALREADY_IN_FAMILY_JOIN};
use super::identity::{resolve_family, FamilyContext};
use super::invite_code::{generate_invite_code, normalize_invite_code};
use super::member_service::pick_available_color;
use crate::auth::AuthUser;
use crate::config::FamilyConfig;
use crate::database::models::{
    Family, FamilyMember, FamilyUpdate, NewFamily, NewFamilyMember, Relationship, FAMILY_COLORS,
};
use crate::database::{Constraint, FamilyStore, StoreError};

pub const FAMILY_NAME_MAX_LENGTH: usize = 100;

pub struct FamilyService {
    store: Arc<dyn FamilyStore>,
    settings: FamilyConfig,
}

impl FamilyService {
    pub fn new(store: Arc<dyn FamilyStore>, settings: FamilyConfig) -> Self {
        Self { store, settings }
    }

    /// Create a family owned by `user`, link them to it and add their own
    /// "Self" member, as one unit
    pub async fn create_family(&self, user: &AuthUser, name: &str) -> ServiceResult<Family> {
        if resolve_family(self.store.as_ref(), user).await?.is_some() {
            return Err(ServiceError::conflict(ALREADY_IN_FAMILY));
        }
        let name = validate_family_name(name)?;

        let self_member = self_member_for(user, FAMILY_COLORS[0]);
        let (family, _) = self.create_family_with(user, name, Some(self_member)).await?;
        Ok(family)
    }

    /// Insert a family with a fresh invite code, retrying a bounded number of
    /// times when the code collides with an existing one
    pub(crate) async fn create_family_with(
        &self,
        user: &AuthUser,
        name: String,
        owner_member: Option<NewFamilyMember>,
    ) -> ServiceResult<(Family, Option<FamilyMember>)> {
        let attempts = self.settings.invite_code_max_attempts.max(1);
        for attempt in 1..=attempts {
            let family = NewFamily {
                name: name.clone(),
                invite_code: generate_invite_code(),
                owner_id: user.id.clone(),
            };
            match self.store.create_family(family, user, owner_member.clone()).await {
                Err(StoreError::UniqueViolation(Constraint::InviteCode)) => {
                    warn!("Invite code collision creating family (attempt {}/{})", attempt, attempts);
                }
                Ok((family, member)) => {
                    info!("Created family {} for user {}", family.id, user.id);
                    return Ok((family, member));
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(ServiceError::Store(StoreError::UniqueViolation(Constraint::InviteCode)))
    }

    /// Case-insensitive invite code lookup
    pub async fn find_family_by_invite_code(&self, code: &str) -> ServiceResult<Option<Family>> {
        let Some(code) = normalize_invite_code(code) else {
            return Ok(None);
        };
        Ok(self.store.family_by_invite_code(&code).await?)
    }

    pub async fn validate_invite_code(&self, code: &str) -> ServiceResult<bool> {
        if normalize_invite_code(code).is_none() {
            return Err(ServiceError::validation("Invite code is required"));
        }
        Ok(self.find_family_by_invite_code(code).await?.is_some())
    }

    pub fn invite_code(&self, ctx: &FamilyContext) -> String {
        ctx.family.invite_code.clone()
    }

    /// Owner only. The previous code stops resolving immediately.
    pub async fn regenerate_invite_code(&self, ctx: &FamilyContext) -> ServiceResult<String> {
        if !ctx.is_owner() {
            return Err(ServiceError::forbidden(
                "Only the family owner can regenerate the invite code",
            ));
        }

        let attempts = self.settings.invite_code_max_attempts.max(1);
        for attempt in 1..=attempts {
            let code = generate_invite_code();
            match self.store.replace_invite_code(ctx.family_id(), &code).await {
                Err(StoreError::UniqueViolation(Constraint::InviteCode)) => {
                    warn!("Invite code collision regenerating (attempt {}/{})", attempt, attempts);
                }
                Ok(Some(family)) => {
                    info!("Regenerated invite code for family {}", family.id);
                    return Ok(family.invite_code);
                }
                Ok(None) => return Err(ServiceError::OnboardingRequired),
                Err(err) => return Err(err.into()),
            }
        }
        Err(ServiceError::Store(StoreError::UniqueViolation(Constraint::InviteCode)))
    }

    /// Join the family behind `code`. The principal gets a default member
    /// linked to their account.
    pub async fn join_family(&self, user: &AuthUser, code: &str) -> ServiceResult<Family> {
        if resolve_family(self.store.as_ref(), user).await?.is_some() {
            return Err(ServiceError::conflict(ALREADY_IN_FAMILY_JOIN));
        }
        if normalize_invite_code(code).is_none() {
            return Err(ServiceError::validation("Invite code is required"));
        }
        let family = self
            .find_family_by_invite_code(code)
            .await?
            .ok_or_else(|| ServiceError::not_found("Invalid invite code"))?;

        let existing = self.store.list_members(&family.id).await?;
        let member = NewFamilyMember {
            user_id: Some(user.id.clone()),
            name: user.display_name().unwrap_or("New Member").to_string(),
            relationship: Relationship::Other,
            color: pick_available_color(&existing).to_string(),
            is_default: true,
            preferences: None,
            metadata: None,
            module_permissions: None,
            created_by: user.id.clone(),
        };

        self.store
            .join_family(&family.id, user, member)
            .await
            .map_err(|err| match ServiceError::from(err) {
                ServiceError::Conflict(_) => ServiceError::conflict(ALREADY_IN_FAMILY_JOIN),
                other => other,
            })?;
        info!("User {} joined family {}", user.id, family.id);
        Ok(family)
    }

    /// Owner only: rename or change settings
    pub async fn update_family(&self, ctx: &FamilyContext, update: FamilyUpdate) -> ServiceResult<Family> {
        if !ctx.is_owner() {
            return Err(ServiceError::forbidden(
                "Only the family owner can update family settings",
            ));
        }
        let update = FamilyUpdate {
            name: update.name.as_deref().map(validate_family_name).transpose()?,
            settings: update.settings,
        };
        if update.is_empty() {
            return Ok(ctx.family.clone());
        }

        self.store
            .update_family(ctx.family_id(), &update)
            .await?
            .ok_or(ServiceError::OnboardingRequired)
    }
}

pub fn validate_family_name(name: &str) -> ServiceResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::validation("Family name is required"));
    }
    if name.chars().count() > FAMILY_NAME_MAX_LENGTH {
        return Err(ServiceError::validation(format!(
            "Family name must be at most {} characters",
            FAMILY_NAME_MAX_LENGTH
        )));
    }
    Ok(name.to_string())
}

/// Default name for a family created on someone's behalf
pub fn default_family_name(user: &AuthUser) -> String {
    match user.display_name() {
        Some(name) => format!("{}'s Family", name),
        None => "My Family".to_string(),
    }
}

/// The principal's own member record in a family they create
pub fn self_member_for(user: &AuthUser, color: &str) -> NewFamilyMember {
    NewFamilyMember {
        user_id: Some(user.id.clone()),
        name: user.display_name().unwrap_or("Me").to_string(),
        relationship: Relationship::Myself,
        color: color.to_string(),
        is_default: true,
        preferences: None,
        metadata: None,
        module_permissions: None,
        created_by: user.id.clone(),
    }
}
