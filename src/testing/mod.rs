//! In-memory [`FamilyStore`] for tests.
//!
//! Enforces the same uniqueness and conditional-link rules as the PostgreSQL
//! store, and can be told to fail specific writes.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::auth::AuthUser;
use crate::database::ids::{id_to_string, new_id, parse_id, to_iso};
use crate::database::models::{
    Family, FamilyMember, FamilyMemberUpdate, FamilyUpdate, HealthcareProvider, NewFamily,
    NewFamilyMember, NewProvider, NewTodo, ProviderChanges, Todo, TodoUpdate,
};
use crate::database::{Constraint, FamilyStore, StoreError, StoreResult};

#[derive(Default)]
struct State {
    users: HashMap<String, Option<String>>,
    families: Vec<Family>,
    members: Vec<FamilyMember>,
    providers: Vec<HealthcareProvider>,
    todos: Vec<Todo>,
    failing_member_names: HashSet<String>,
    failing_provider_names: HashSet<String>,
    invite_code_rejections: u32,
    unavailable: bool,
}

impl State {
    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable {
            return Err(StoreError::Timeout(Duration::from_millis(0)));
        }
        Ok(())
    }

    fn family_exists(&self, family_id: &str) -> bool {
        self.families.iter().any(|f| f.id == family_id)
    }

    fn check_link(&self, user_id: &str) -> StoreResult<()> {
        match self.users.get(user_id) {
            Some(Some(current)) if self.family_exists(current) => Err(StoreError::AlreadyLinked),
            _ => Ok(()),
        }
    }

    fn check_invite_code(&mut self, code: &str) -> StoreResult<()> {
        if self.invite_code_rejections > 0 {
            self.invite_code_rejections -= 1;
            return Err(StoreError::UniqueViolation(Constraint::InviteCode));
        }
        if self.families.iter().any(|f| f.invite_code == code) {
            return Err(StoreError::UniqueViolation(Constraint::InviteCode));
        }
        Ok(())
    }

    fn check_member(&self, family_id: &str, member: &NewFamilyMember) -> StoreResult<()> {
        if self.failing_member_names.contains(&member.name) {
            return Err(StoreError::Simulated(format!("member insert failed: {}", member.name)));
        }
        if let Some(user_id) = &member.user_id {
            let taken = self
                .members
                .iter()
                .any(|m| m.family_id == family_id && m.user_id.as_deref() == Some(user_id.as_str()));
            if taken {
                return Err(StoreError::UniqueViolation(Constraint::MemberUser));
            }
        }
        Ok(())
    }
}

fn check_references(ids: &[String]) -> StoreResult<Vec<String>> {
    ids.iter()
        .map(|id| normalize(id).ok_or_else(|| StoreError::InvalidReference(id.clone())))
        .collect()
}

/// Canonical form of an incoming id, `None` when it can never resolve
fn normalize(id: &str) -> Option<String> {
    parse_id(id).map(id_to_string)
}

fn now() -> String {
    to_iso(Utc::now())
}

fn build_member(family_id: &str, member: NewFamilyMember) -> FamilyMember {
    let ts = now();
    FamilyMember {
        id: id_to_string(new_id()),
        family_id: family_id.to_string(),
        user_id: member.user_id,
        name: member.name,
        relationship: member.relationship,
        color: member.color,
        is_default: member.is_default,
        preferences: member.preferences,
        metadata: member.metadata,
        module_permissions: member.module_permissions,
        created_at: ts.clone(),
        updated_at: ts,
        created_by: member.created_by,
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Member inserts with this name fail
    pub fn fail_member_inserts_named(&self, name: &str) {
        self.state().failing_member_names.insert(name.to_string());
    }

    /// Provider inserts with this name fail
    pub fn fail_provider_inserts_named(&self, name: &str) {
        self.state().failing_provider_names.insert(name.to_string());
    }

    /// The next `count` invite code writes collide
    pub fn reject_next_invite_codes(&self, count: u32) {
        self.state().invite_code_rejections = count;
    }

    /// Every call times out while set
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    /// Point a user at a family id directly, bypassing the link checks
    pub fn set_user_family(&self, user_id: &str, family_id: Option<&str>) {
        self.state()
            .users
            .insert(user_id.to_string(), family_id.map(str::to_string));
    }

    pub fn family_count(&self) -> usize {
        self.state().families.len()
    }

    pub fn member_count(&self) -> usize {
        self.state().members.len()
    }

    pub fn invite_codes(&self) -> Vec<String> {
        self.state().families.iter().map(|f| f.invite_code.clone()).collect()
    }
}

#[async_trait]
impl FamilyStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.state().check_available()
    }

    async fn user_family_id(&self, user_id: &str) -> StoreResult<Option<String>> {
        let state = self.state();
        state.check_available()?;
        Ok(state.users.get(user_id).cloned().flatten())
    }

    async fn create_family(
        &self,
        family: NewFamily,
        owner: &AuthUser,
        owner_member: Option<NewFamilyMember>,
    ) -> StoreResult<(Family, Option<FamilyMember>)> {
        let mut state = self.state();
        state.check_available()?;
        state.check_invite_code(&family.invite_code)?;
        state.check_link(&owner.id)?;

        let ts = now();
        let created = Family {
            id: id_to_string(new_id()),
            name: family.name,
            invite_code: family.invite_code,
            owner_id: family.owner_id,
            created_at: ts.clone(),
            updated_at: ts,
            settings: None,
        };

        // Validate every step before applying any of them
        if let Some(member) = &owner_member {
            state.check_member(&created.id, member)?;
        }
        let member = owner_member.map(|m| build_member(&created.id, m));

        state.users.insert(owner.id.clone(), Some(created.id.clone()));
        state.families.push(created.clone());
        if let Some(member) = &member {
            state.members.push(member.clone());
        }
        Ok((created, member))
    }

    async fn join_family(
        &self,
        family_id: &str,
        user: &AuthUser,
        member: NewFamilyMember,
    ) -> StoreResult<FamilyMember> {
        let mut state = self.state();
        state.check_available()?;
        let family_id = normalize(family_id)
            .filter(|id| state.family_exists(id))
            .ok_or_else(|| StoreError::InvalidReference(family_id.to_string()))?;
        state.check_link(&user.id)?;
        state.check_member(&family_id, &member)?;

        let member = build_member(&family_id, member);
        state.users.insert(user.id.clone(), Some(family_id));
        state.members.push(member.clone());
        Ok(member)
    }

    async fn family_by_id(&self, family_id: &str) -> StoreResult<Option<Family>> {
        let state = self.state();
        state.check_available()?;
        let Some(family_id) = normalize(family_id) else {
            return Ok(None);
        };
        Ok(state.families.iter().find(|f| f.id == family_id).cloned())
    }

    async fn family_by_invite_code(&self, code: &str) -> StoreResult<Option<Family>> {
        let state = self.state();
        state.check_available()?;
        Ok(state.families.iter().find(|f| f.invite_code == code).cloned())
    }

    async fn update_family(&self, family_id: &str, update: &FamilyUpdate) -> StoreResult<Option<Family>> {
        let mut state = self.state();
        state.check_available()?;
        let Some(family_id) = normalize(family_id) else {
            return Ok(None);
        };
        let Some(family) = state.families.iter_mut().find(|f| f.id == family_id) else {
            return Ok(None);
        };
        if let Some(name) = &update.name {
            family.name = name.clone();
        }
        if let Some(settings) = &update.settings {
            family.settings = Some(settings.clone());
        }
        family.updated_at = now();
        Ok(Some(family.clone()))
    }

    async fn replace_invite_code(&self, family_id: &str, code: &str) -> StoreResult<Option<Family>> {
        let mut state = self.state();
        state.check_available()?;
        let Some(family_id) = normalize(family_id) else {
            return Ok(None);
        };
        if !state.family_exists(&family_id) {
            return Ok(None);
        }
        state.check_invite_code(code)?;
        let Some(family) = state.families.iter_mut().find(|f| f.id == family_id) else {
            return Ok(None);
        };
        family.invite_code = code.to_string();
        family.updated_at = now();
        Ok(Some(family.clone()))
    }

    async fn list_members(&self, family_id: &str) -> StoreResult<Vec<FamilyMember>> {
        let state = self.state();
        state.check_available()?;
        Ok(state
            .members
            .iter()
            .filter(|m| m.family_id == family_id)
            .cloned()
            .collect())
    }

    async fn member_by_id(&self, family_id: &str, member_id: &str) -> StoreResult<Option<FamilyMember>> {
        let state = self.state();
        state.check_available()?;
        let Some(member_id) = normalize(member_id) else {
            return Ok(None);
        };
        Ok(state
            .members
            .iter()
            .find(|m| m.id == member_id && m.family_id == family_id)
            .cloned())
    }

    async fn member_by_user(&self, family_id: &str, user_id: &str) -> StoreResult<Option<FamilyMember>> {
        let state = self.state();
        state.check_available()?;
        let linked: Vec<&FamilyMember> = state
            .members
            .iter()
            .filter(|m| m.family_id == family_id && m.user_id.as_deref() == Some(user_id))
            .collect();
        let preferred = linked.iter().find(|m| m.is_default).or_else(|| linked.first());
        Ok(preferred.map(|m| (*m).clone()))
    }

    async fn insert_member(&self, family_id: &str, member: NewFamilyMember) -> StoreResult<FamilyMember> {
        let mut state = self.state();
        state.check_available()?;
        let family_id = normalize(family_id).ok_or_else(|| StoreError::InvalidReference(family_id.to_string()))?;
        state.check_member(&family_id, &member)?;
        let member = build_member(&family_id, member);
        state.members.push(member.clone());
        Ok(member)
    }

    async fn update_member(
        &self,
        family_id: &str,
        member_id: &str,
        update: &FamilyMemberUpdate,
    ) -> StoreResult<Option<FamilyMember>> {
        let mut state = self.state();
        state.check_available()?;
        let Some(member_id) = normalize(member_id) else {
            return Ok(None);
        };
        let Some(member) = state
            .members
            .iter_mut()
            .find(|m| m.id == member_id && m.family_id == family_id)
        else {
            return Ok(None);
        };
        if let Some(name) = &update.name {
            member.name = name.clone();
        }
        if let Some(relationship) = update.relationship {
            member.relationship = relationship;
        }
        if let Some(color) = &update.color {
            member.color = color.clone();
        }
        if let Some(preferences) = &update.preferences {
            member.preferences = Some(preferences.clone());
        }
        if let Some(metadata) = &update.metadata {
            member.metadata = Some(metadata.clone());
        }
        if let Some(permissions) = &update.module_permissions {
            member.module_permissions = Some(permissions.clone());
        }
        member.updated_at = now();
        Ok(Some(member.clone()))
    }

    async fn delete_member(&self, family_id: &str, member_id: &str) -> StoreResult<bool> {
        let mut state = self.state();
        state.check_available()?;
        let Some(member_id) = normalize(member_id) else {
            return Ok(false);
        };
        let exists = state.members.iter().any(|m| m.id == member_id && m.family_id == family_id);
        if exists {
            let mut sole = state
                .providers
                .iter()
                .filter(|p| p.family_id == family_id && p.serves(&member_id) && p.family_member_ids.len() == 1)
                .map(|p| p.provider_name.clone())
                .collect::<Vec<_>>();
            sole.sort();
            if let Some(provider_name) = sole.into_iter().next() {
                return Err(StoreError::SoleProviderMember(provider_name));
            }
        }
        let before = state.members.len();
        state
            .members
            .retain(|m| !(m.id == member_id && m.family_id == family_id));
        if state.members.len() == before {
            return Ok(false);
        }

        let ts = now();
        for provider in state.providers.iter_mut().filter(|p| p.family_id == family_id) {
            if provider.serves(&member_id) {
                provider.family_member_ids.retain(|id| *id != member_id);
                provider.updated_at = ts.clone();
            }
        }
        for todo in state.todos.iter_mut().filter(|t| t.family_id == family_id) {
            if todo.assigned_member_ids.contains(&member_id) {
                todo.assigned_member_ids.retain(|id| *id != member_id);
                todo.updated_at = ts.clone();
            }
        }
        Ok(true)
    }

    async fn set_default_member(&self, family_id: &str, member_id: &str, user_id: &str) -> StoreResult<bool> {
        let mut state = self.state();
        state.check_available()?;
        let Some(member_id) = normalize(member_id) else {
            return Ok(false);
        };
        if !state.members.iter().any(|m| m.id == member_id && m.family_id == family_id) {
            return Ok(false);
        }
        let ts = now();
        for member in state.members.iter_mut().filter(|m| m.family_id == family_id) {
            if member.id == member_id || member.user_id.as_deref() == Some(user_id) {
                member.is_default = member.id == member_id;
                member.updated_at = ts.clone();
            }
        }
        Ok(true)
    }

    async fn list_providers(&self, family_id: &str) -> StoreResult<Vec<HealthcareProvider>> {
        let state = self.state();
        state.check_available()?;
        let mut providers: Vec<_> = state
            .providers
            .iter()
            .filter(|p| p.family_id == family_id)
            .cloned()
            .collect();
        providers.sort_by(|a, b| a.provider_name.cmp(&b.provider_name));
        Ok(providers)
    }

    async fn providers_for_member(&self, family_id: &str, member_id: &str) -> StoreResult<Vec<HealthcareProvider>> {
        let Some(member_id) = normalize(member_id) else {
            return Ok(Vec::new());
        };
        let providers = self.list_providers(family_id).await?;
        Ok(providers.into_iter().filter(|p| p.serves(&member_id)).collect())
    }

    async fn recent_providers(&self, family_id: &str, limit: i64) -> StoreResult<Vec<HealthcareProvider>> {
        let state = self.state();
        state.check_available()?;
        let mut used: Vec<_> = state
            .providers
            .iter()
            .filter(|p| p.family_id == family_id && p.last_used.is_some())
            .cloned()
            .collect();
        used.sort_by(|a, b| b.last_used.cmp(&a.last_used));
        used.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(used)
    }

    async fn provider_by_id(&self, family_id: &str, provider_id: &str) -> StoreResult<Option<HealthcareProvider>> {
        let state = self.state();
        state.check_available()?;
        let Some(provider_id) = normalize(provider_id) else {
            return Ok(None);
        };
        Ok(state
            .providers
            .iter()
            .find(|p| p.id == provider_id && p.family_id == family_id)
            .cloned())
    }

    async fn insert_provider(&self, family_id: &str, provider: NewProvider) -> StoreResult<HealthcareProvider> {
        let mut state = self.state();
        state.check_available()?;
        if state.failing_provider_names.contains(&provider.provider_name) {
            return Err(StoreError::Simulated(format!(
                "provider insert failed: {}",
                provider.provider_name
            )));
        }
        let member_ids = check_references(&provider.family_member_ids)?;
        let ts = now();
        let created = HealthcareProvider {
            id: id_to_string(new_id()),
            family_id: family_id.to_string(),
            provider_name: provider.provider_name,
            portal_url: provider.portal_url,
            specialty: provider.specialty,
            family_member_ids: member_ids,
            login_username: provider.login_username,
            notes: provider.notes,
            last_used: None,
            auto_detected: provider.auto_detected,
            quick_add_data: provider.quick_add_data,
            created_at: ts.clone(),
            updated_at: ts,
            created_by: provider.created_by,
        };
        state.providers.push(created.clone());
        Ok(created)
    }

    async fn update_provider(
        &self,
        family_id: &str,
        provider_id: &str,
        changes: ProviderChanges,
    ) -> StoreResult<Option<HealthcareProvider>> {
        let mut state = self.state();
        state.check_available()?;
        let Some(provider_id) = normalize(provider_id) else {
            return Ok(None);
        };
        let member_ids = changes
            .family_member_ids
            .as_deref()
            .map(check_references)
            .transpose()?;
        let Some(provider) = state
            .providers
            .iter_mut()
            .find(|p| p.id == provider_id && p.family_id == family_id)
        else {
            return Ok(None);
        };
        if let Some(name) = changes.provider_name {
            provider.provider_name = name;
        }
        if let Some(url) = changes.portal_url {
            provider.portal_url = url;
        }
        if let Some(specialty) = changes.specialty {
            provider.specialty = specialty;
        }
        if let Some(ids) = member_ids {
            provider.family_member_ids = ids;
        }
        if let Some(username) = changes.login_username {
            provider.login_username = username;
        }
        if let Some(notes) = changes.notes {
            provider.notes = notes;
        }
        if let Some(auto_detected) = changes.auto_detected {
            provider.auto_detected = auto_detected;
        }
        if let Some(quick_add) = changes.quick_add_data {
            provider.quick_add_data = Some(quick_add);
        }
        provider.updated_at = now();
        Ok(Some(provider.clone()))
    }

    async fn delete_provider(&self, family_id: &str, provider_id: &str) -> StoreResult<bool> {
        let mut state = self.state();
        state.check_available()?;
        let Some(provider_id) = normalize(provider_id) else {
            return Ok(false);
        };
        let before = state.providers.len();
        state
            .providers
            .retain(|p| !(p.id == provider_id && p.family_id == family_id));
        Ok(state.providers.len() != before)
    }

    async fn mark_provider_used(&self, family_id: &str, provider_id: &str) -> StoreResult<Option<HealthcareProvider>> {
        let mut state = self.state();
        state.check_available()?;
        let Some(provider_id) = normalize(provider_id) else {
            return Ok(None);
        };
        let Some(provider) = state
            .providers
            .iter_mut()
            .find(|p| p.id == provider_id && p.family_id == family_id)
        else {
            return Ok(None);
        };
        let ts = now();
        provider.last_used = Some(ts.clone());
        provider.updated_at = ts;
        Ok(Some(provider.clone()))
    }

    async fn list_todos(&self, family_id: &str) -> StoreResult<Vec<Todo>> {
        let state = self.state();
        state.check_available()?;
        Ok(state
            .todos
            .iter()
            .rev()
            .filter(|t| t.family_id == family_id)
            .cloned()
            .collect())
    }

    async fn active_todo_count(&self, family_id: &str) -> StoreResult<i64> {
        let state = self.state();
        state.check_available()?;
        let count = state
            .todos
            .iter()
            .filter(|t| t.family_id == family_id && !t.completed)
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn todo_by_id(&self, family_id: &str, todo_id: &str) -> StoreResult<Option<Todo>> {
        let state = self.state();
        state.check_available()?;
        let Some(todo_id) = normalize(todo_id) else {
            return Ok(None);
        };
        Ok(state
            .todos
            .iter()
            .find(|t| t.id == todo_id && t.family_id == family_id)
            .cloned())
    }

    async fn insert_todo(&self, family_id: &str, todo: NewTodo) -> StoreResult<Todo> {
        let mut state = self.state();
        state.check_available()?;
        let assigned = check_references(&todo.assigned_member_ids)?;
        let ts = now();
        let created = Todo {
            id: id_to_string(new_id()),
            family_id: family_id.to_string(),
            description: todo.description,
            assigned_member_ids: assigned,
            completed: false,
            created_at: ts.clone(),
            updated_at: ts,
            completed_at: None,
        };
        state.todos.push(created.clone());
        Ok(created)
    }

    async fn update_todo(&self, family_id: &str, todo_id: &str, update: &TodoUpdate) -> StoreResult<Option<Todo>> {
        let mut state = self.state();
        state.check_available()?;
        let Some(todo_id) = normalize(todo_id) else {
            return Ok(None);
        };
        let assigned = update
            .assigned_member_ids
            .as_deref()
            .map(check_references)
            .transpose()?;
        let Some(todo) = state
            .todos
            .iter_mut()
            .find(|t| t.id == todo_id && t.family_id == family_id)
        else {
            return Ok(None);
        };
        if let Some(description) = &update.description {
            todo.description = description.clone();
        }
        if let Some(ids) = assigned {
            todo.assigned_member_ids = ids;
        }
        todo.updated_at = now();
        Ok(Some(todo.clone()))
    }

    async fn complete_todo(&self, family_id: &str, todo_id: &str) -> StoreResult<Option<Todo>> {
        let mut state = self.state();
        state.check_available()?;
        let Some(todo_id) = normalize(todo_id) else {
            return Ok(None);
        };
        let Some(todo) = state
            .todos
            .iter_mut()
            .find(|t| t.id == todo_id && t.family_id == family_id)
        else {
            return Ok(None);
        };
        if !todo.completed {
            let ts = now();
            todo.completed = true;
            todo.completed_at = Some(ts.clone());
            todo.updated_at = ts;
        }
        Ok(Some(todo.clone()))
    }

    async fn delete_todo(&self, family_id: &str, todo_id: &str) -> StoreResult<bool> {
        let mut state = self.state();
        state.check_available()?;
        let Some(todo_id) = normalize(todo_id) else {
            return Ok(false);
        };
        let before = state.todos.len();
        state
            .todos
            .retain(|t| !(t.id == todo_id && t.family_id == family_id));
        Ok(state.todos.len() != before)
    }
}
