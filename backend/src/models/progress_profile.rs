use chrono::NaiveDate;
use sqlx::FromRow;

/// Database model for the per-user streak row
#[derive(Debug, Clone, FromRow)]
pub struct ProgressProfileRow {
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_completion_date: Option<NaiveDate>,
}
