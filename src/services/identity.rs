use serde::Serialize;
use tracing::warn;

use super::error::{ServiceError, ServiceResult};
use crate::auth::AuthUser;
use crate::database::models::Family;
use crate::database::FamilyStore;

/// The authenticated principal together with the family they act in
#[derive(Debug, Clone, Serialize)]
pub struct FamilyContext {
    pub user: AuthUser,
    pub family: Family,
}

impl FamilyContext {
    pub fn family_id(&self) -> &str {
        &self.family.id
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    pub fn is_owner(&self) -> bool {
        is_family_owner(&self.family, &self.user.id)
    }
}

pub fn is_family_owner(family: &Family, user_id: &str) -> bool {
    family.owner_id == user_id
}

/// The principal's family, if their pointer is set and still resolves.
/// A dangling pointer is reported as no family so re-creation can repair it.
pub async fn resolve_family(store: &dyn FamilyStore, user: &AuthUser) -> ServiceResult<Option<Family>> {
    let Some(family_id) = store.user_family_id(&user.id).await? else {
        return Ok(None);
    };

    let family = store.family_by_id(&family_id).await?;
    if family.is_none() {
        warn!("User {} points at missing family {}", user.id, family_id);
    }
    Ok(family)
}

/// Gate for every family-scoped operation. Resolves afresh on each call.
pub async fn require_auth_with_family(store: &dyn FamilyStore, user: &AuthUser) -> ServiceResult<FamilyContext> {
    match resolve_family(store, user).await? {
        Some(family) => Ok(FamilyContext {
            user: user.clone(),
            family,
        }),
        None => Err(ServiceError::OnboardingRequired),
    }
}
