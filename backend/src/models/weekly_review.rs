use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Weekly review database row; `suggestions` and `category_breakdown` are
/// stored as JSON text.
#[derive(Debug, Clone, FromRow)]
pub struct WeeklyReviewRow {
    pub id: String,
    pub user_id: String,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub total_tasks: i64,
    pub total_xp: i64,
    pub early_completions: i64,
    pub on_time_completions: i64,
    pub late_completions: i64,
    pub performance_score: i32,
    pub suggestions: String,
    pub category_breakdown: String,
    pub created_at: DateTime<Utc>,
}

impl WeeklyReviewRow {
    pub fn to_shared(&self) -> shared::WeeklyReview {
        shared::WeeklyReview {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            user_id: Uuid::parse_str(&self.user_id).unwrap_or_default(),
            week_start: self.week_start,
            week_end: self.week_end,
            total_tasks: self.total_tasks,
            total_xp: self.total_xp,
            early_completions: self.early_completions,
            on_time_completions: self.on_time_completions,
            late_completions: self.late_completions,
            performance_score: self.performance_score,
            performance_grade: shared::performance_grade(self.performance_score).to_string(),
            completion_rate: shared::completion_rate(
                self.early_completions,
                self.on_time_completions,
                self.late_completions,
            ),
            punctuality_score: shared::punctuality_score(
                self.early_completions,
                self.on_time_completions,
                self.late_completions,
            ),
            suggestions: serde_json::from_str(&self.suggestions).unwrap_or_default(),
            category_breakdown: serde_json::from_str(&self.category_breakdown)
                .unwrap_or_default(),
            created_at: self.created_at,
        }
    }
}
