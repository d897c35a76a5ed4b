use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{CategoryRow, TaskRow};
use crate::services::xp;
use shared::{CategoryTaskStats, CreateTaskRequest, Task, TaskStats, UpdateTaskRequest};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task not found")]
    NotFound,
    #[error("Completed tasks cannot be changed")]
    Completed,
    #[error("Category not found")]
    CategoryNotFound,
    #[error("Task title cannot be empty")]
    EmptyTitle,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Optional filters for listing tasks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilter {
    pub completed: Option<bool>,
    pub category_id: Option<Uuid>,
}

fn validate_title(title: &str) -> Result<String, TaskError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(TaskError::EmptyTitle);
    }
    Ok(title.to_string())
}

async fn owned_category(
    pool: &SqlitePool,
    user_id: &Uuid,
    category_id: &Uuid,
) -> Result<CategoryRow, TaskError> {
    let category: Option<CategoryRow> =
        sqlx::query_as("SELECT * FROM categories WHERE id = ? AND user_id = ?")
            .bind(category_id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(pool)
            .await?;

    category.ok_or(TaskError::CategoryNotFound)
}

async fn fetch_task(
    pool: &SqlitePool,
    user_id: &Uuid,
    task_id: &Uuid,
) -> Result<Option<TaskRow>, TaskError> {
    let task: Option<TaskRow> = sqlx::query_as("SELECT * FROM tasks WHERE id = ? AND user_id = ?")
        .bind(task_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?;

    Ok(task)
}

/// Creates a pending task. `xp_value` holds a preview of the award; the
/// final value is fixed at completion.
pub async fn create_task(
    pool: &SqlitePool,
    user_id: &Uuid,
    request: &CreateTaskRequest,
) -> Result<Task, TaskError> {
    let title = validate_title(&request.title)?;
    let category = owned_category(pool, user_id, &request.category_id).await?;

    let id = Uuid::new_v4();
    let now = Utc::now();
    let difficulty = request.difficulty.unwrap_or_default();
    let priority = request.priority.unwrap_or_default();
    let xp_value = xp::task_xp(difficulty, category.xp_multiplier);

    sqlx::query(
        r#"
        INSERT INTO tasks (id, user_id, category_id, title, description, difficulty, priority, due_date, is_completed, completed_at, xp_value, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, NULL, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(user_id.to_string())
    .bind(request.category_id.to_string())
    .bind(&title)
    .bind(request.description.as_deref().unwrap_or(""))
    .bind(difficulty.as_str())
    .bind(priority.as_str())
    .bind(request.due_date)
    .bind(xp_value)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    log::debug!("Created task {} for user {}", id, user_id);

    Ok(Task {
        id,
        user_id: *user_id,
        category_id: request.category_id,
        title,
        description: request.description.clone().unwrap_or_default(),
        difficulty,
        priority,
        due_date: request.due_date,
        is_completed: false,
        completed_at: None,
        xp_value,
        created_at: now,
        updated_at: now,
    })
}

pub async fn get_task(
    pool: &SqlitePool,
    user_id: &Uuid,
    task_id: &Uuid,
) -> Result<Option<Task>, TaskError> {
    Ok(fetch_task(pool, user_id, task_id)
        .await?
        .map(|t| t.to_shared()))
}

/// Lists the user's tasks, newest first.
pub async fn list_tasks(
    pool: &SqlitePool,
    user_id: &Uuid,
    filter: &TaskFilter,
) -> Result<Vec<Task>, TaskError> {
    let category_id = filter.category_id.map(|c| c.to_string());

    let tasks: Vec<TaskRow> = sqlx::query_as(
        r#"
        SELECT * FROM tasks
        WHERE user_id = ?
          AND (? IS NULL OR is_completed = ?)
          AND (? IS NULL OR category_id = ?)
        ORDER BY created_at DESC, rowid DESC
        "#,
    )
    .bind(user_id.to_string())
    .bind(filter.completed)
    .bind(filter.completed)
    .bind(&category_id)
    .bind(&category_id)
    .fetch_all(pool)
    .await?;

    Ok(tasks.into_iter().map(|t| t.to_shared()).collect())
}

pub async fn update_task(
    pool: &SqlitePool,
    user_id: &Uuid,
    task_id: &Uuid,
    request: &UpdateTaskRequest,
) -> Result<Task, TaskError> {
    let mut task = fetch_task(pool, user_id, task_id)
        .await?
        .ok_or(TaskError::NotFound)?;

    if task.is_completed {
        return Err(TaskError::Completed);
    }

    if let Some(title) = &request.title {
        task.title = validate_title(title)?;
    }
    if let Some(description) = &request.description {
        task.description = description.clone();
    }
    if let Some(category_id) = request.category_id {
        task.category_id = category_id.to_string();
    }
    if let Some(difficulty) = request.difficulty {
        task.difficulty = difficulty.as_str().to_string();
    }
    if let Some(priority) = request.priority {
        task.priority = priority.as_str().to_string();
    }
    if request.due_date.is_some() {
        task.due_date = request.due_date;
    }

    // Refresh the preview against the (possibly new) category and difficulty
    let category_id = Uuid::parse_str(&task.category_id).unwrap_or_default();
    let category = owned_category(pool, user_id, &category_id).await?;
    task.xp_value = xp::task_xp(task.difficulty.parse().unwrap_or_default(), category.xp_multiplier);
    task.updated_at = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE tasks
        SET title = ?, description = ?, category_id = ?, difficulty = ?, priority = ?, due_date = ?, xp_value = ?, updated_at = ?
        WHERE id = ? AND user_id = ? AND is_completed = 0
        "#,
    )
    .bind(&task.title)
    .bind(&task.description)
    .bind(&task.category_id)
    .bind(&task.difficulty)
    .bind(&task.priority)
    .bind(task.due_date)
    .bind(task.xp_value)
    .bind(task.updated_at)
    .bind(task_id.to_string())
    .bind(user_id.to_string())
    .execute(pool)
    .await?;

    // Completed between the read and the write
    if result.rows_affected() == 0 {
        return Err(TaskError::Completed);
    }

    Ok(task.to_shared())
}

pub async fn delete_task(pool: &SqlitePool, user_id: &Uuid, task_id: &Uuid) -> Result<(), TaskError> {
    let task = fetch_task(pool, user_id, task_id)
        .await?
        .ok_or(TaskError::NotFound)?;

    if task.is_completed {
        return Err(TaskError::Completed);
    }

    let result = sqlx::query("DELETE FROM tasks WHERE id = ? AND user_id = ? AND is_completed = 0")
        .bind(task_id.to_string())
        .bind(user_id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(TaskError::Completed);
    }

    Ok(())
}

fn rate(completed: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (completed as f64 / total as f64 * 10000.0).round() / 100.0
}

/// Totals over all of the user's tasks plus one row per category.
pub async fn task_stats(
    pool: &SqlitePool,
    user_id: &Uuid,
    now: DateTime<Utc>,
) -> Result<TaskStats, TaskError> {
    let tasks: Vec<TaskRow> = sqlx::query_as("SELECT * FROM tasks WHERE user_id = ?")
        .bind(user_id.to_string())
        .fetch_all(pool)
        .await?;

    let categories: Vec<CategoryRow> =
        sqlx::query_as("SELECT * FROM categories WHERE user_id = ? ORDER BY name")
            .bind(user_id.to_string())
            .fetch_all(pool)
            .await?;

    let total_tasks = tasks.len() as i64;
    let completed_tasks = tasks.iter().filter(|t| t.is_completed).count() as i64;
    let week_ago = now - Duration::days(7);
    let recent_completed = tasks
        .iter()
        .filter(|t| t.is_completed && t.completed_at.is_some_and(|c| c >= week_ago))
        .count() as i64;

    let category_breakdown = categories
        .iter()
        .map(|category| {
            let in_category = tasks.iter().filter(|t| t.category_id == category.id);
            let total = in_category.clone().count() as i64;
            let completed = in_category.filter(|t| t.is_completed).count() as i64;
            CategoryTaskStats {
                category_id: Uuid::parse_str(&category.id).unwrap_or_default(),
                name: category.name.clone(),
                total,
                completed,
                completion_rate: rate(completed, total),
            }
        })
        .collect();

    Ok(TaskStats {
        total_tasks,
        completed_tasks,
        pending_tasks: total_tasks - completed_tasks,
        completion_rate: rate(completed_tasks, total_tasks),
        recent_completed,
        category_breakdown,
    })
}
