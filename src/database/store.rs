use async_trait::async_trait;

use super::error::StoreError;
use super::models::{
    Family, FamilyMember, FamilyMemberUpdate, FamilyUpdate, HealthcareProvider, NewFamily,
    NewFamilyMember, NewProvider, NewTodo, ProviderChanges, Todo, TodoUpdate,
};
use crate::auth::AuthUser;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence seam for every family-scoped collection.
///
/// Ids cross this boundary as strings. Lookups that receive an id which does
/// not parse, or which belongs to another family, return `None`. Child
/// collection calls are always scoped by `family_id`.
#[async_trait]
pub trait FamilyStore: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    /// The principal's stored family pointer, left as-is even when it dangles
    async fn user_family_id(&self, user_id: &str) -> StoreResult<Option<String>>;

    /// Insert the family, point the owner at it and optionally insert the
    /// owner's own member, all or nothing. The pointer write only succeeds
    /// while the owner has no family (or an orphaned one), otherwise
    /// [`StoreError::AlreadyLinked`].
    async fn create_family(
        &self,
        family: NewFamily,
        owner: &AuthUser,
        owner_member: Option<NewFamilyMember>,
    ) -> StoreResult<(Family, Option<FamilyMember>)>;

    /// Point the user at an existing family and insert their member, all or nothing
    async fn join_family(
        &self,
        family_id: &str,
        user: &AuthUser,
        member: NewFamilyMember,
    ) -> StoreResult<FamilyMember>;

    async fn family_by_id(&self, family_id: &str) -> StoreResult<Option<Family>>;

    /// `code` must already be normalized to uppercase
    async fn family_by_invite_code(&self, code: &str) -> StoreResult<Option<Family>>;

    async fn update_family(&self, family_id: &str, update: &FamilyUpdate) -> StoreResult<Option<Family>>;

    async fn replace_invite_code(&self, family_id: &str, code: &str) -> StoreResult<Option<Family>>;

    /// Ordered by creation time, oldest first
    async fn list_members(&self, family_id: &str) -> StoreResult<Vec<FamilyMember>>;

    async fn member_by_id(&self, family_id: &str, member_id: &str) -> StoreResult<Option<FamilyMember>>;

    /// The user's linked member, preferring the one flagged default
    async fn member_by_user(&self, family_id: &str, user_id: &str) -> StoreResult<Option<FamilyMember>>;

    async fn insert_member(&self, family_id: &str, member: NewFamilyMember) -> StoreResult<FamilyMember>;

    async fn update_member(
        &self,
        family_id: &str,
        member_id: &str,
        update: &FamilyMemberUpdate,
    ) -> StoreResult<Option<FamilyMember>>;

    /// Delete the member and strip its id from provider and todo references.
    /// Fails with `SoleProviderMember` when a provider serves only this member.
    async fn delete_member(&self, family_id: &str, member_id: &str) -> StoreResult<bool>;

    /// Flag `member_id` default and clear the flag on the user's other members
    /// in a single write
    async fn set_default_member(&self, family_id: &str, member_id: &str, user_id: &str) -> StoreResult<bool>;

    /// Ordered by provider name
    async fn list_providers(&self, family_id: &str) -> StoreResult<Vec<HealthcareProvider>>;

    async fn providers_for_member(&self, family_id: &str, member_id: &str) -> StoreResult<Vec<HealthcareProvider>>;

    /// Providers with a `last_used` stamp, most recent first
    async fn recent_providers(&self, family_id: &str, limit: i64) -> StoreResult<Vec<HealthcareProvider>>;

    async fn provider_by_id(&self, family_id: &str, provider_id: &str) -> StoreResult<Option<HealthcareProvider>>;

    async fn insert_provider(&self, family_id: &str, provider: NewProvider) -> StoreResult<HealthcareProvider>;

    async fn update_provider(
        &self,
        family_id: &str,
        provider_id: &str,
        changes: ProviderChanges,
    ) -> StoreResult<Option<HealthcareProvider>>;

    async fn delete_provider(&self, family_id: &str, provider_id: &str) -> StoreResult<bool>;

    async fn mark_provider_used(&self, family_id: &str, provider_id: &str) -> StoreResult<Option<HealthcareProvider>>;

    /// Newest first
    async fn list_todos(&self, family_id: &str) -> StoreResult<Vec<Todo>>;

    async fn active_todo_count(&self, family_id: &str) -> StoreResult<i64>;

    async fn todo_by_id(&self, family_id: &str, todo_id: &str) -> StoreResult<Option<Todo>>;

    async fn insert_todo(&self, family_id: &str, todo: NewTodo) -> StoreResult<Todo>;

    async fn update_todo(&self, family_id: &str, todo_id: &str, update: &TodoUpdate) -> StoreResult<Option<Todo>>;

    /// Stamp completion. An already completed todo is returned unchanged.
    async fn complete_todo(&self, family_id: &str, todo_id: &str) -> StoreResult<Option<Todo>>;

    async fn delete_todo(&self, family_id: &str, todo_id: &str) -> StoreResult<bool>;
}
