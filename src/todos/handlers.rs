use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::todos::dto::{CreateTodoRequest, Pagination, TodoResponse, UpdateTodoRequest};
use crate::todos::repo_types::{NewTodo, Priority, TodoPatch};

pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/:id",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().chars().count() < 3 {
        warn!("todo name shorter than 3 characters");
        return Err(ApiError::Validation(
            "todo_name must be at least 3 characters".into(),
        ));
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn list_todos(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<TodoResponse>>, ApiError> {
    let todos = state
        .todos
        .list(user.id, page.limit.clamp(1, 100), page.offset.max(0))
        .await?;
    Ok(Json(todos.into_iter().map(TodoResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TodoResponse>, ApiError> {
    let todo = state
        .todos
        .get(user.id, id)
        .await?
        .ok_or(ApiError::NotFound("todo not found"))?;
    Ok(Json(todo.into()))
}

#[instrument(skip(state, payload))]
pub async fn create_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateTodoRequest>,
) -> Result<(StatusCode, HeaderMap, Json<TodoResponse>), ApiError> {
    validate_name(&payload.todo_name)?;

    let todo = state
        .todos
        .create(NewTodo {
            user_id: user.id,
            todo_name: payload.todo_name,
            todo_description: payload.todo_description,
            priority: payload.priority.unwrap_or(Priority::Low),
        })
        .await?;

    info!(user_id = %user.id, todo_id = %todo.id, "todo created");

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::LOCATION,
        format!("/api/v1/todos/{}", todo.id)
            .parse()
            .map_err(|e: axum::http::header::InvalidHeaderValue| {
                ApiError::Internal(anyhow::anyhow!(e))
            })?,
    );

    Ok((StatusCode::CREATED, headers, Json(todo.into())))
}

#[instrument(skip(state, payload))]
pub async fn update_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTodoRequest>,
) -> Result<Json<TodoResponse>, ApiError> {
    if let Some(name) = &payload.todo_name {
        validate_name(name)?;
    }

    let todo = state
        .todos
        .update(
            user.id,
            id,
            TodoPatch {
                todo_name: payload.todo_name,
                todo_description: payload.todo_description,
                priority: payload.priority,
                completed: payload.completed,
            },
        )
        .await?
        .ok_or(ApiError::NotFound("todo not found"))?;

    info!(user_id = %user.id, todo_id = %todo.id, "todo updated");
    Ok(Json(todo.into()))
}

#[instrument(skip(state))]
pub async fn delete_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TodoResponse>, ApiError> {
    let todo = state
        .todos
        .delete(user.id, id)
        .await?
        .ok_or(ApiError::NotFound("todo not found"))?;

    info!(user_id = %user.id, todo_id = %todo.id, "todo deleted");
    Ok(Json(todo.into()))
}
