use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use super::error::{ServiceError, ServiceResult};
use super::identity::FamilyContext;
use super::provider_service::resolve_member_refs;
use crate::database::models::{CreateTodoInput, DeletedTodo, NewTodo, Todo, TodoUpdate};
use crate::database::FamilyStore;

pub const DESCRIPTION_MAX_LENGTH: usize = 500;
const TODO_NOT_FOUND: &str = "Todo not found";
const ASSIGNEES_INVALID: &str = "One or more assigned members not found";

pub struct TodoService {
    store: Arc<dyn FamilyStore>,
}

impl TodoService {
    pub fn new(store: Arc<dyn FamilyStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, ctx: &FamilyContext) -> ServiceResult<Vec<Todo>> {
        Ok(self.store.list_todos(ctx.family_id()).await?)
    }

    pub async fn active_count(&self, ctx: &FamilyContext) -> ServiceResult<i64> {
        Ok(self.store.active_todo_count(ctx.family_id()).await?)
    }

    pub async fn create(&self, ctx: &FamilyContext, input: CreateTodoInput) -> ServiceResult<Todo> {
        let description = validate_description(&input.description)?;
        let assigned_member_ids = self.check_assignees(ctx, &input.assigned_member_ids).await?;

        let todo = self
            .store
            .insert_todo(ctx.family_id(), NewTodo { description, assigned_member_ids })
            .await?;
        info!("Created todo {} in family {}", todo.id, ctx.family_id());
        Ok(todo)
    }

    pub async fn update(&self, ctx: &FamilyContext, todo_id: &str, update: TodoUpdate) -> ServiceResult<Todo> {
        let description = update.description.as_deref().map(validate_description).transpose()?;
        let assigned_member_ids = match update.assigned_member_ids {
            Some(ids) => Some(self.check_assignees(ctx, &ids).await?),
            None => None,
        };

        self.store
            .update_todo(ctx.family_id(), todo_id, &TodoUpdate { description, assigned_member_ids })
            .await?
            .ok_or_else(|| ServiceError::not_found(TODO_NOT_FOUND))
    }

    /// Completion is terminal; completing twice returns the todo unchanged
    pub async fn complete(&self, ctx: &FamilyContext, todo_id: &str) -> ServiceResult<Todo> {
        self.store
            .complete_todo(ctx.family_id(), todo_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(TODO_NOT_FOUND))
    }

    pub async fn delete(&self, ctx: &FamilyContext, todo_id: &str) -> ServiceResult<DeletedTodo> {
        let todo = self
            .store
            .todo_by_id(ctx.family_id(), todo_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(TODO_NOT_FOUND))?;
        if !self.store.delete_todo(ctx.family_id(), &todo.id).await? {
            return Err(ServiceError::not_found(TODO_NOT_FOUND));
        }
        Ok(DeletedTodo { id: todo.id })
    }

    async fn check_assignees(&self, ctx: &FamilyContext, ids: &[String]) -> ServiceResult<Vec<String>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let members = self.store.list_members(ctx.family_id()).await?;
        let known: HashSet<&str> = members.iter().map(|m| m.id.as_str()).collect();
        resolve_member_refs(ids, &known, ASSIGNEES_INVALID)
    }
}

pub fn validate_description(description: &str) -> ServiceResult<String> {
    let description = description.trim();
    if description.is_empty() {
        return Err(ServiceError::validation("Description is required"));
    }
    if description.chars().count() > DESCRIPTION_MAX_LENGTH {
        return Err(ServiceError::validation(format!(
            "Description must be less than {} characters",
            DESCRIPTION_MAX_LENGTH
        )));
    }
    Ok(description.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthUser;
    use crate::config::AppConfig;
    use crate::services::family_service::FamilyService;
    use crate::services::identity::require_auth_with_family;
    use crate::services::member_service::MemberService;
    use crate::testing::MemoryStore;

    async fn family_of(store: &Arc<MemoryStore>, user_id: &str) -> FamilyContext {
        let user = AuthUser { id: user_id.into(), name: None, email: None };
        FamilyService::new(store.clone(), AppConfig::development().family)
            .create_family(&user, "The Smiths")
            .await
            .unwrap();
        require_auth_with_family(store.as_ref(), &user).await.unwrap()
    }

    fn todo(description: &str, assigned: Vec<String>) -> CreateTodoInput {
        CreateTodoInput { description: description.into(), assigned_member_ids: assigned }
    }

    #[test]
    fn description_is_trimmed_and_bounded() {
        assert_eq!(validate_description("  Buy milk ").unwrap(), "Buy milk");
        assert!(validate_description("   ").is_err());
        assert!(validate_description(&"d".repeat(501)).is_err());
    }

    #[tokio::test]
    async fn completing_twice_keeps_the_first_stamp() {
        let store = Arc::new(MemoryStore::new());
        let ctx = family_of(&store, "u1").await;
        let todos = TodoService::new(store.clone());
        let created = todos.create(&ctx, todo("Book checkup", vec![])).await.unwrap();
        assert_eq!(todos.active_count(&ctx).await.unwrap(), 1);

        let done = todos.complete(&ctx, &created.id).await.unwrap();
        assert!(done.completed);
        let again = todos.complete(&ctx, &created.id).await.unwrap();
        assert_eq!(again.completed_at, done.completed_at);
        assert_eq!(todos.active_count(&ctx).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn assignees_must_belong_to_the_family() {
        let store = Arc::new(MemoryStore::new());
        let ours = family_of(&store, "u1").await;
        let theirs = family_of(&store, "u2").await;
        let outsider = MemberService::new(store.clone()).my_member(&theirs).await.unwrap().unwrap();
        let me = MemberService::new(store.clone()).my_member(&ours).await.unwrap().unwrap();
        let todos = TodoService::new(store.clone());

        let err = todos.create(&ours, todo("Refill", vec![outsider.id])).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref msg) if msg == ASSIGNEES_INVALID));

        let created = todos.create(&ours, todo("Refill", vec![me.id.clone()])).await.unwrap();
        assert_eq!(created.assigned_member_ids, vec![me.id]);
    }

    #[tokio::test]
    async fn list_is_newest_first_and_delete_returns_the_id() {
        let store = Arc::new(MemoryStore::new());
        let ctx = family_of(&store, "u1").await;
        let todos = TodoService::new(store.clone());
        todos.create(&ctx, todo("First", vec![])).await.unwrap();
        let second = todos.create(&ctx, todo("Second", vec![])).await.unwrap();

        let listed = todos.list(&ctx).await.unwrap();
        assert_eq!(listed[0].description, "Second");

        let deleted = todos.delete(&ctx, &second.id).await.unwrap();
        assert_eq!(deleted.id, second.id);
        assert!(matches!(todos.delete(&ctx, &second.id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_rejects_blank_description() {
        let store = Arc::new(MemoryStore::new());
        let ctx = family_of(&store, "u1").await;
        let todos = TodoService::new(store.clone());
        let created = todos.create(&ctx, todo("First", vec![])).await.unwrap();

        let update = TodoUpdate { description: Some(" ".into()), assigned_member_ids: None };
        assert!(matches!(todos.update(&ctx, &created.id, update).await, Err(ServiceError::Validation(_))));

        let update = TodoUpdate { description: Some("Renamed".into()), assigned_member_ids: None };
        assert_eq!(todos.update(&ctx, &created.id, update).await.unwrap().description, "Renamed");
    }
}
