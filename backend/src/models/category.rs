use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for task categories
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CategoryRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub color: String,
    pub xp_multiplier: f64,
    pub created_at: DateTime<Utc>,
}

impl CategoryRow {
    pub fn to_shared(&self) -> shared::Category {
        shared::Category {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            user_id: Uuid::parse_str(&self.user_id).unwrap_or_default(),
            name: self.name.clone(),
            description: self.description.clone(),
            color: self.color.clone(),
            xp_multiplier: self.xp_multiplier,
            created_at: self.created_at,
        }
    }
}
