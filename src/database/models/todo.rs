use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::ids::{id_to_string, references_to_strings, to_iso, to_iso_opt};

pub const COLLECTION: &str = "todos";

#[derive(Debug, Clone, FromRow)]
pub struct TodoRow {
    pub id: Uuid,
    pub family_id: Uuid,
    pub description: String,
    pub assigned_member_ids: Vec<Uuid>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub family_id: String,
    pub description: String,
    pub assigned_member_ids: Vec<String>,
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl From<TodoRow> for Todo {
    fn from(row: TodoRow) -> Self {
        Self {
            id: id_to_string(row.id),
            family_id: id_to_string(row.family_id),
            description: row.description,
            assigned_member_ids: references_to_strings(&row.assigned_member_ids),
            completed: row.completed,
            created_at: to_iso(row.created_at),
            updated_at: to_iso(row.updated_at),
            completed_at: to_iso_opt(row.completed_at),
        }
    }
}

/// Validated todo ready for insertion
#[derive(Debug, Clone)]
pub struct NewTodo {
    pub description: String,
    pub assigned_member_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoInput {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assigned_member_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoUpdate {
    pub description: Option<String>,
    pub assigned_member_ids: Option<Vec<String>>,
}

/// `{ id }` returned by delete
#[derive(Debug, Clone, Serialize)]
pub struct DeletedTodo {
    pub id: String,
}
