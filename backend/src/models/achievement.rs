use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for achievement definitions
#[derive(Debug, Clone, FromRow)]
pub struct AchievementRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub achievement_type: String,
    pub icon: String,
    pub threshold: i64,
    pub xp_reward: i64,
    pub is_hidden: bool,
    pub category_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Database model for a user's unlock of an achievement
#[derive(Debug, Clone, FromRow)]
pub struct UserAchievementRow {
    pub achievement_id: String,
    pub progress: i64,
    pub unlocked_at: DateTime<Utc>,
}

impl AchievementRow {
    /// Returns `None` when the stored type is not one the evaluator knows.
    pub fn to_shared(&self) -> Option<shared::Achievement> {
        let achievement_type = match self.achievement_type.parse() {
            Ok(t) => t,
            Err(e) => {
                log::warn!("Skipping achievement {} ({}): {}", self.id, self.name, e);
                return None;
            }
        };

        Some(shared::Achievement {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            name: self.name.clone(),
            description: self.description.clone(),
            achievement_type,
            icon: self.icon.clone(),
            threshold: self.threshold,
            xp_reward: self.xp_reward,
            is_hidden: self.is_hidden,
            category_id: self.category_id.as_ref().and_then(|id| Uuid::parse_str(id).ok()),
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::AchievementType;

    fn row(achievement_type: &str) -> AchievementRow {
        AchievementRow {
            id: Uuid::new_v4().to_string(),
            name: "Consistency".to_string(),
            description: "Maintain a 3-day streak".to_string(),
            achievement_type: achievement_type.to_string(),
            icon: "🔥".to_string(),
            threshold: 3,
            xp_reward: 50,
            is_hidden: false,
            category_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_achievement_row_to_shared() {
        let shared = row("streak").to_shared().unwrap();
        assert_eq!(shared.achievement_type, AchievementType::Streak);
        assert_eq!(shared.threshold, 3);
        assert_eq!(shared.xp_reward, 50);
        assert!(shared.category_id.is_none());
    }

    #[test]
    fn test_achievement_row_with_unknown_type_is_skipped() {
        assert!(row("special").to_shared().is_none());
    }
}
