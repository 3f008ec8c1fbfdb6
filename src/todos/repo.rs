use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;
use crate::todos::repo_types::{NewTodo, Todo, TodoPatch};

/// Store interface for todos. Every operation is scoped to the owning user;
/// a todo belonging to someone else is indistinguishable from one that does
/// not exist.
#[async_trait]
pub trait TodoStore: Send + Sync {
    async fn create(&self, todo: NewTodo) -> Result<Todo, StoreError>;
    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Todo>, StoreError>;
    async fn list(&self, user_id: Uuid, limit: i64, offset: i64)
        -> Result<Vec<Todo>, StoreError>;
    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: TodoPatch,
    ) -> Result<Option<Todo>, StoreError>;
    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<Option<Todo>, StoreError>;
}

const TODO_COLUMNS: &str =
    "id, user_id, todo_name, todo_description, priority, completed, created_at, updated_at";

pub struct PgTodoStore {
    db: PgPool,
}

impl PgTodoStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TodoStore for PgTodoStore {
    async fn create(&self, todo: NewTodo) -> Result<Todo, StoreError> {
        let created = sqlx::query_as::<_, Todo>(&format!(
            r#"
            INSERT INTO todos (user_id, todo_name, todo_description, priority)
            VALUES ($1, $2, $3, $4)
            RETURNING {TODO_COLUMNS}
            "#,
        ))
        .bind(todo.user_id)
        .bind(&todo.todo_name)
        .bind(&todo.todo_description)
        .bind(todo.priority)
        .fetch_one(&self.db)
        .await?;
        Ok(created)
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Todo>, StoreError> {
        let todo = sqlx::query_as::<_, Todo>(&format!(
            "SELECT {TODO_COLUMNS} FROM todos WHERE id = $1 AND user_id = $2",
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(todo)
    }

    async fn list(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Todo>, StoreError> {
        let todos = sqlx::query_as::<_, Todo>(&format!(
            r#"
            SELECT {TODO_COLUMNS}
            FROM todos
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        Ok(todos)
    }

    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: TodoPatch,
    ) -> Result<Option<Todo>, StoreError> {
        let todo = sqlx::query_as::<_, Todo>(&format!(
            r#"
            UPDATE todos SET
                todo_name = COALESCE($3, todo_name),
                todo_description = COALESCE($4, todo_description),
                priority = COALESCE($5, priority),
                completed = COALESCE($6, completed),
                updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING {TODO_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(user_id)
        .bind(&patch.todo_name)
        .bind(&patch.todo_description)
        .bind(patch.priority)
        .bind(patch.completed)
        .fetch_optional(&self.db)
        .await?;
        Ok(todo)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<Option<Todo>, StoreError> {
        let todo = sqlx::query_as::<_, Todo>(&format!(
            "DELETE FROM todos WHERE id = $1 AND user_id = $2 RETURNING {TODO_COLUMNS}",
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(todo)
    }
}

/// In-memory store backing `AppState::fake()`.
pub struct InMemoryTodoStore {
    todos: std::sync::Mutex<Vec<Todo>>,
}

impl InMemoryTodoStore {
    pub fn new() -> Self {
        Self {
            todos: std::sync::Mutex::new(Vec::new()),
        }
    }
}

impl Default for InMemoryTodoStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TodoStore for InMemoryTodoStore {
    async fn create(&self, todo: NewTodo) -> Result<Todo, StoreError> {
        let now = time::OffsetDateTime::now_utc();
        let created = Todo {
            id: Uuid::new_v4(),
            user_id: todo.user_id,
            todo_name: todo.todo_name,
            todo_description: todo.todo_description,
            priority: todo.priority,
            completed: false,
            created_at: now,
            updated_at: now,
        };
        self.todos.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Todo>, StoreError> {
        Ok(self
            .todos
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id && t.user_id == user_id)
            .cloned())
    }

    async fn list(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Todo>, StoreError> {
        let todos = self.todos.lock().unwrap();
        let mut mine: Vec<Todo> = todos
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: TodoPatch,
    ) -> Result<Option<Todo>, StoreError> {
        let mut todos = self.todos.lock().unwrap();
        let Some(todo) = todos
            .iter_mut()
            .find(|t| t.id == id && t.user_id == user_id)
        else {
            return Ok(None);
        };
        if let Some(name) = patch.todo_name {
            todo.todo_name = name;
        }
        if let Some(description) = patch.todo_description {
            todo.todo_description = description;
        }
        if let Some(priority) = patch.priority {
            todo.priority = priority;
        }
        if let Some(completed) = patch.completed {
            todo.completed = completed;
        }
        todo.updated_at = time::OffsetDateTime::now_utc();
        Ok(Some(todo.clone()))
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<Option<Todo>, StoreError> {
        let mut todos = self.todos.lock().unwrap();
        let index = todos
            .iter()
            .position(|t| t.id == id && t.user_id == user_id);
        Ok(index.map(|i| todos.remove(i)))
    }
}
