use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for tasks
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: String,
    pub user_id: String,
    pub category_id: String,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub priority: String,
    pub due_date: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub xp_value: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRow {
    pub fn to_shared(&self) -> shared::Task {
        shared::Task {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            user_id: Uuid::parse_str(&self.user_id).unwrap_or_default(),
            category_id: Uuid::parse_str(&self.category_id).unwrap_or_default(),
            title: self.title.clone(),
            description: self.description.clone(),
            difficulty: self.difficulty.parse().unwrap_or_default(),
            priority: self.priority.parse().unwrap_or_default(),
            due_date: self.due_date,
            is_completed: self.is_completed,
            completed_at: self.completed_at,
            xp_value: self.xp_value,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
