use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for XP ledger entries
#[derive(Debug, Clone, FromRow)]
pub struct XpLogRow {
    pub id: String,
    pub user_id: String,
    pub action: String,
    pub amount: i64,
    pub task_id: Option<String>,
    pub achievement_id: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Per-action aggregate over a user's ledger
#[derive(Debug, Clone, FromRow)]
pub struct XpActionTotalRow {
    pub action: String,
    pub total_xp: i64,
    pub count: i64,
}

impl XpLogRow {
    /// Returns `None` for entries whose action is no longer known.
    pub fn to_shared(&self) -> Option<shared::XpLogEntry> {
        Some(shared::XpLogEntry {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            user_id: Uuid::parse_str(&self.user_id).unwrap_or_default(),
            action: self.action.parse().ok()?,
            amount: self.amount,
            task_id: self.task_id.as_ref().and_then(|id| Uuid::parse_str(id).ok()),
            achievement_id: self
                .achievement_id
                .as_ref()
                .and_then(|id| Uuid::parse_str(id).ok()),
            description: self.description.clone(),
            created_at: self.created_at,
        })
    }
}

impl XpActionTotalRow {
    pub fn to_shared(&self) -> Option<shared::XpActionTotal> {
        Some(shared::XpActionTotal {
            action: self.action.parse().ok()?,
            total_xp: self.total_xp,
            count: self.count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::XpAction;

    #[test]
    fn test_xp_log_row_to_shared() {
        let task_id = Uuid::new_v4();
        let row = XpLogRow {
            id: Uuid::new_v4().to_string(),
            user_id: Uuid::new_v4().to_string(),
            action: "task_complete".to_string(),
            amount: 30,
            task_id: Some(task_id.to_string()),
            achievement_id: None,
            description: "Completed task: Write report".to_string(),
            created_at: Utc::now(),
        };

        let shared = row.to_shared().unwrap();
        assert_eq!(shared.action, XpAction::TaskComplete);
        assert_eq!(shared.amount, 30);
        assert_eq!(shared.task_id, Some(task_id));
        assert!(shared.achievement_id.is_none());
    }

    #[test]
    fn test_xp_log_row_with_unknown_action() {
        let row = XpLogRow {
            id: Uuid::new_v4().to_string(),
            user_id: Uuid::new_v4().to_string(),
            action: "daily_login".to_string(),
            amount: 5,
            task_id: None,
            achievement_id: None,
            description: String::new(),
            created_at: Utc::now(),
        };

        assert!(row.to_shared().is_none());
    }
}
