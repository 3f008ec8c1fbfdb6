use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::todos::repo_types::{Priority, Todo};

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub todo_name: String,
    pub todo_description: String,
    /// Defaults to low when not supplied.
    pub priority: Option<Priority>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTodoRequest {
    pub todo_name: Option<String>,
    pub todo_description: Option<String>,
    pub priority: Option<Priority>,
    pub completed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct TodoResponse {
    pub id: Uuid,
    pub todo_name: String,
    pub todo_description: String,
    pub priority: Priority,
    pub completed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Todo> for TodoResponse {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id,
            todo_name: todo.todo_name,
            todo_description: todo.todo_description,
            priority: todo.priority,
            completed: todo.completed,
            created_at: todo.created_at,
            updated_at: todo.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    100
}
