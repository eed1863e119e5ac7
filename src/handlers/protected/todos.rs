// handlers/protected/todos.rs - /api/todos handlers

use axum::extract::{Extension, Path, State};
use serde::Serialize;

use crate::api::ApiJson;
use crate::database::models::{CreateTodoInput, DeletedTodo, Todo, TodoUpdate};
use crate::error::OrFail;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::FamilyContext;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

/// GET /api/todos - Newest first
pub async fn list(State(state): State<AppState>, Extension(ctx): Extension<FamilyContext>) -> ApiResult<Vec<Todo>> {
    let todos = state.todos().list(&ctx).await.or_fail("Failed to load todos")?;
    Ok(ApiResponse::success(todos))
}

/// GET /api/todos/active-count
pub async fn active_count(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
) -> ApiResult<CountResponse> {
    let count = state.todos().active_count(&ctx).await.or_fail("Failed to count todos")?;
    Ok(ApiResponse::success(CountResponse { count }))
}

/// POST /api/todos
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
    ApiJson(input): ApiJson<CreateTodoInput>,
) -> ApiResult<Todo> {
    let todo = state.todos().create(&ctx, input).await.or_fail("Failed to create todo")?;
    Ok(ApiResponse::created(todo))
}

/// PATCH /api/todos/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<TodoUpdate>,
) -> ApiResult<Todo> {
    let todo = state.todos().update(&ctx, &id, update).await.or_fail("Failed to update todo")?;
    Ok(ApiResponse::success(todo))
}

/// POST /api/todos/:id/complete - Idempotent
pub async fn complete(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
    Path(id): Path<String>,
) -> ApiResult<Todo> {
    let todo = state.todos().complete(&ctx, &id).await.or_fail("Failed to complete todo")?;
    Ok(ApiResponse::success(todo))
}

/// DELETE /api/todos/:id - Returns `{ id }`
pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
    Path(id): Path<String>,
) -> ApiResult<DeletedTodo> {
    let deleted = state.todos().delete(&ctx, &id).await.or_fail("Failed to delete todo")?;
    Ok(ApiResponse::success(deleted))
}
